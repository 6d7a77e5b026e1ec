//! Per-job staging areas.
//!
//! Conversions that produce several files (one per page, one per table)
//! write them into a [`StagingArea`] before they are archived. A staging
//! area is a uniquely-named directory owned by a [`tempfile::TempDir`], so it
//! is removed on every exit path: after packaging, on an early `?` return, on
//! task cancellation and on panic unwinding.

use crate::error::StageError;
use crate::naming::JobToken;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Creates staging areas for one job under a common root.
#[derive(Debug, Clone)]
pub struct StagingFactory {
    root: PathBuf,
    token: JobToken,
}

impl StagingFactory {
    pub fn new(root: impl Into<PathBuf>, token: JobToken) -> Self {
        Self {
            root: root.into(),
            token,
        }
    }

    /// Create a fresh, empty staging directory named `temp_{token}_*`.
    pub fn create(&self) -> Result<StagingArea, StageError> {
        std::fs::create_dir_all(&self.root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("temp_{}_", self.token))
            .tempdir_in(&self.root)?;
        debug!(staging = %dir.path().display(), "Created staging area");
        Ok(StagingArea { dir })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// A temporary directory holding one job's intermediate files.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `bytes` to a file named `name` directly inside the area.
    ///
    /// `name` must be a bare file name; anything with a directory component
    /// is rejected.
    pub async fn stage(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, StageError> {
        let path = self.entry_path(name)?;
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Blocking variant of [`stage`](Self::stage) for use inside
    /// `spawn_blocking` render loops.
    pub fn stage_blocking(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, StageError> {
        let path = self.entry_path(name)?;
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Path for a staged file that a writer will create itself.
    pub fn entry_path(&self, name: &str) -> Result<PathBuf, StageError> {
        let file_name = Path::new(name).file_name();
        if file_name.map(|f| f.to_str() != Some(name)).unwrap_or(true) {
            return Err(StageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("staged entry name must be a bare file name: {name:?}"),
            )));
        }
        Ok(self.dir.path().join(name))
    }

    /// Delete the directory and everything in it, reporting failures.
    pub fn close(self) -> Result<(), StageError> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!(staging = %path.display(), "Removed staging area");
        Ok(())
    }
}
