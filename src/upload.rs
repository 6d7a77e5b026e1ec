//! Upload intake: validate an uploaded file and persist it under a unique name.
//!
//! All checks run before anything touches the disk, in this order: a file
//! is present, it fits the size cap, its name ends in `.pdf`, and its bytes
//! start with `%PDF`.

use crate::error::{ConvertError, ValidationError};
use crate::naming::{safe_base_name, sanitize_filename, JobToken};
use crate::pipeline::input::{has_allowed_extension, has_pdf_magic, SourceDocument};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// A file as received from the client.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    /// Client-supplied file name; untrusted.
    pub filename: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: Some(filename.into()),
            bytes: bytes.into(),
        }
    }
}

/// Validates and stores uploads in one directory.
#[derive(Debug, Clone)]
pub struct UploadHandler {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadHandler {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Check an upload without side effects.
    pub fn validate(&self, upload: &UploadedFile) -> Result<(), ValidationError> {
        let filename = match upload.filename.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ValidationError::NoFileSelected),
        };

        if upload.bytes.len() > self.max_bytes {
            return Err(ValidationError::PayloadTooLarge {
                size: upload.bytes.len(),
                limit: self.max_bytes,
            });
        }

        if !has_allowed_extension(filename) {
            return Err(ValidationError::UnsupportedExtension {
                filename: filename.to_string(),
            });
        }

        if !has_pdf_magic(&upload.bytes) {
            return Err(ValidationError::NotAPdf {
                magic: upload.bytes.iter().take(4).copied().collect(),
            });
        }
        Ok(())
    }

    /// Validate, then write the upload to `upload_{token}_{base}.pdf`.
    pub async fn accept(&self, upload: &UploadedFile) -> Result<SourceDocument, ConvertError> {
        self.validate(upload)?;

        let original = upload.filename.as_deref().unwrap_or_default();
        let base = safe_base_name(&sanitize_filename(original));
        let token = JobToken::new();
        let path = self.dir.join(format!("upload_{token}_{base}.pdf"));

        self.persist(&path, &upload.bytes).await?;
        info!(
            token = %token,
            bytes = upload.bytes.len(),
            "Upload stored: {}",
            path.display()
        );
        Ok(SourceDocument::new(path, base))
    }

    async fn persist(&self, path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
        let storage = |source| ConvertError::Storage {
            path: path.to_path_buf(),
            source,
        };
        tokio::fs::create_dir_all(&self.dir).await.map_err(storage)?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(storage)?;
        file.write_all(bytes).await.map_err(storage)?;
        file.flush().await.map_err(storage)?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}
