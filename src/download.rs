//! Download lookup: map a requested file name to a produced output.

use crate::error::ConvertError;
use crate::naming::sanitize_filename;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolves download requests against the output directory only.
#[derive(Debug, Clone)]
pub struct DownloadResolver {
    dir: PathBuf,
}

impl DownloadResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of an existing output file named `requested`.
    ///
    /// The name is sanitised to a single path component first, so traversal
    /// sequences can never leave the output directory. Empty names and
    /// anything that is not a regular file yield [`ConvertError::NotFound`].
    pub async fn resolve(&self, requested: &str) -> Result<PathBuf, ConvertError> {
        let not_found = || ConvertError::NotFound {
            name: requested.to_string(),
        };

        let name = sanitize_filename(requested);
        if name.is_empty() || name != requested {
            debug!(requested, sanitized = %name, "Rejected download name");
            return Err(not_found());
        }

        let path = self.dir.join(&name);
        match tokio::fs::symlink_metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(not_found()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn existing_output_resolves() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("converted_1_report.txt"), b"hi").unwrap();
        let r = DownloadResolver::new(dir.path());
        let path = r.resolve("converted_1_report.txt").await.unwrap();
        assert_eq!(path, dir.path().join("converted_1_report.txt"));
    }

    #[tokio::test]
    async fn traversal_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("converted");
        std::fs::create_dir(&out).unwrap();
        std::fs::write(root.path().join("secret.txt"), b"s").unwrap();
        // a file that the sanitised form of the traversal would hit
        std::fs::write(out.join("etc_passwd"), b"decoy").unwrap();

        let r = DownloadResolver::new(&out);
        for name in ["../../etc/passwd", "../secret.txt", "..", "/etc/passwd", ""] {
            let err = r.resolve(name).await.unwrap_err();
            assert!(matches!(err, ConvertError::NotFound { .. }), "{name}");
        }
    }

    #[tokio::test]
    async fn missing_file_and_directories_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        let r = DownloadResolver::new(dir.path());
        assert!(matches!(
            r.resolve("nope.zip").await,
            Err(ConvertError::NotFound { .. })
        ));
        assert!(matches!(
            r.resolve("subdir").await,
            Err(ConvertError::NotFound { .. })
        ));
    }
}
