//! Source resolution: a validated PDF on local disk.
//!
//! pdfium needs a file-system path, so every conversion starts from a
//! [`SourceDocument`]: either an upload the handler has already persisted,
//! or a local path given on the command line. Local paths are checked for
//! existence, readability, the `.pdf` extension and the `%PDF` magic bytes
//! before any conversion work is attempted.

use crate::error::{ConvertError, ValidationError};
use crate::naming::{extension_of, safe_base_name};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Allowed source extensions (lower-case, without the dot).
pub const ALLOWED_SOURCE_EXTENSIONS: &[&str] = &["pdf"];

/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF ready for conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    path: PathBuf,
    base_name: String,
}

impl SourceDocument {
    /// Wrap a file that is already known to be a valid PDF.
    pub fn new(path: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base_name: base_name.into(),
        }
    }

    /// Validate a local file and derive its base name from the file name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(ConvertError::FileNotFound { path });
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !has_allowed_extension(&file_name) {
            return Err(ValidationError::UnsupportedExtension {
                filename: file_name,
            }
            .into());
        }

        match std::fs::File::open(&path) {
            Ok(mut f) => {
                let mut magic = [0u8; 4];
                let read = read_prefix(&mut f, &mut magic).map_err(|source| {
                    ConvertError::Storage {
                        path: path.clone(),
                        source,
                    }
                })?;
                if &magic[..read] != PDF_MAGIC {
                    return Err(ValidationError::NotAPdf {
                        magic: magic[..read].to_vec(),
                    }
                    .into());
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(ConvertError::PermissionDenied { path });
            }
            Err(_) => return Err(ConvertError::FileNotFound { path }),
        }

        debug!("Resolved local PDF: {}", path.display());
        Ok(Self {
            base_name: safe_base_name(&file_name),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sanitised stem used in produced file names and document titles.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }
}

/// `true` when `filename` ends in one of [`ALLOWED_SOURCE_EXTENSIONS`].
pub fn has_allowed_extension(filename: &str) -> bool {
    extension_of(filename)
        .map(|ext| ALLOWED_SOURCE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// `true` when `bytes` starts with the PDF header.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

fn read_prefix(f: &mut std::fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match f.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
