//! The pdfium binding shared by every PDF-reading stage.
//!
//! pdfium is bound exactly once per process, at startup, from the configured
//! library path (or the system library). A missing library is a startup
//! error. Every document operation is blocking and must run inside
//! `tokio::task::spawn_blocking`.

use crate::error::{ConvertError, StageError};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// A bound pdfium library.
///
/// Shared across blocking workers as `Arc<PdfEngine>`: the `thread_safe`
/// feature serialises every FFI call and `sync` makes `Pdfium` `Send + Sync`.
pub struct PdfEngine {
    pdfium: Pdfium,
}

impl std::fmt::Debug for PdfEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfEngine").finish_non_exhaustive()
    }
}

impl PdfEngine {
    /// Bind to libpdfium.
    ///
    /// `library` may point at the library file itself or at the directory
    /// containing it; `None` asks the dynamic loader for the system copy.
    pub fn bind(library: Option<&Path>) -> Result<Self, ConvertError> {
        let bindings = match library {
            Some(path) => {
                let lib = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(path)
                } else {
                    path.to_path_buf()
                };
                if !lib.exists() {
                    return Err(ConvertError::PdfiumBindingFailed(format!(
                        "no pdfium library at '{}'",
                        lib.display()
                    )));
                }
                debug!(library = %lib.display(), "Binding pdfium");
                Pdfium::bind_to_library(&lib)
            }
            None => {
                debug!("Binding system pdfium");
                Pdfium::bind_to_system_library()
            }
        }
        .map_err(|e| ConvertError::PdfiumBindingFailed(format!("{e:?}")))?;

        info!("pdfium bound");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Open a document, classifying password failures.
    pub fn open<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<PdfDocument<'a>, StageError> {
        self.pdfium.load_pdf_from_file(path, password).map_err(|e| {
            let detail = format!("{e:?}");
            if detail.contains("Password") || detail.contains("password") {
                if password.is_some() {
                    StageError::Pdf("wrong password".into())
                } else {
                    StageError::Pdf("document is encrypted and requires a password".into())
                }
            } else {
                StageError::Pdf(detail)
            }
        })
    }

    /// Number of pages in the document.
    pub fn page_count(&self, path: &Path, password: Option<&str>) -> Result<usize, StageError> {
        Ok(self.open(path, password)?.pages().len() as usize)
    }

    /// Visit every page in order with `(page, page_num, total_pages)`.
    ///
    /// Stops at the first error returned by `visit`. Returns the page count.
    pub fn for_each_page<F>(
        &self,
        path: &Path,
        password: Option<&str>,
        mut visit: F,
    ) -> Result<usize, StageError>
    where
        F: FnMut(PdfPage<'_>, usize, usize) -> Result<(), StageError>,
    {
        let document = self.open(path, password)?;
        let pages = document.pages();
        let total = pages.len() as usize;
        debug!(pages = total, "PDF loaded");

        for (idx, page) in pages.iter().enumerate() {
            visit(page, idx + 1, total)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_can_be_shared_across_workers() {
        fn shared<T: Send + Sync + 'static>() {}
        shared::<PdfEngine>();
        shared::<std::sync::Arc<PdfEngine>>();
    }

    #[test]
    fn bind_reports_missing_library_path() {
        let err = PdfEngine::bind(Some(Path::new("/definitely/not/libpdfium.so"))).unwrap_err();
        match err {
            ConvertError::PdfiumBindingFailed(msg) => {
                assert!(msg.contains("/definitely/not/libpdfium.so"), "got: {msg}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bind_reports_directory_without_library() {
        let dir = tempfile::tempdir().unwrap();
        let err = PdfEngine::bind(Some(dir.path())).unwrap_err();
        assert!(matches!(err, ConvertError::PdfiumBindingFailed(_)));
    }
}
