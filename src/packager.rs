//! Multi-output packaging: staging area → zip archive.
//!
//! Entries are written under their base names only, in natural order
//! (`page_2` before `page_10`). The staging area is consumed, so a given
//! area can only be packaged once, and it is deleted whether or not the
//! archive could be written.
//!
//! The archive is built under a temporary name next to the destination and
//! renamed into place only once the blocking worker has returned to the
//! awaiting task. If that task is dropped first, the temporary file is
//! dropped with the worker's result and the destination never appears.

use crate::error::StageError;
use crate::staging::StagingArea;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive every file directly inside `staging` to `archive_path`, then
/// remove the staging area.
pub async fn package(staging: StagingArea, archive_path: &Path) -> Result<PathBuf, StageError> {
    let dir = archive_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let (partial, entries) =
        tokio::task::spawn_blocking(move || package_blocking(staging, &dir)).await??;

    // No await between here and the rename.
    partial
        .persist(archive_path)
        .map_err(|e| StageError::Io(e.error))?;
    info!(entries, archive = %archive_path.display(), "Packaged staging area");
    Ok(archive_path.to_path_buf())
}

/// Write the archive to a temporary file in `dir`; returns it with the entry count.
fn package_blocking(staging: StagingArea, dir: &Path) -> Result<(NamedTempFile, usize), StageError> {
    let entries = staged_entries(staging.path())?;

    let partial = tempfile::Builder::new()
        .prefix(".partial_")
        .suffix(".zip")
        .tempfile_in(dir)?;
    let mut zip = ZipWriter::new(BufWriter::new(partial.reopen()?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in &entries {
        zip.start_file(name.as_str(), options)?;
        let mut src = File::open(path)?;
        std::io::copy(&mut src, &mut zip)?;
        debug!(entry = %name, "Archived staged file");
    }

    let mut out = zip.finish()?;
    out.flush()?;
    staging.close()?;
    Ok((partial, entries.len()))
}

/// Regular files directly inside `dir` as `(base name, path)`, naturally sorted.
fn staged_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>, StageError> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((name, entry.path()));
    }
    entries.sort_by(|(a, _), (b, _)| natural_key(a).cmp(&natural_key(b)));
    Ok(entries)
}

/// Sort key splitting a trailing run of digits off the stem, so
/// `page_2.png` < `page_10.png`.
fn natural_key(name: &str) -> (String, u64, String) {
    let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
    let digits_at = stem
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)
        .unwrap_or(stem.len());
    let number = stem[digits_at..].parse().unwrap_or(0);
    (format!("{}.{}", &stem[..digits_at], ext), number, name.to_string())
}
