//! Filename sanitising and collision-resistant job tokens.
//!
//! Every stored or produced file is named `{prefix}_{token}_{base}.{ext}`.
//! The token is a microsecond timestamp plus a process-wide sequence number,
//! so two uploads with the same name in the same microsecond still get
//! distinct paths.

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Longest base name kept from the user's filename.
pub const MAX_BASE_LEN: usize = 50;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

static RE_UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").unwrap());

/// A unique identifier for one upload or conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobToken(String);

impl JobToken {
    /// Mint a new token: `YYYYmmddHHMMSSffffff-NNNN`.
    pub fn new() -> Self {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let stamp = Local::now().format("%Y%m%d%H%M%S%6f");
        JobToken(format!("{stamp}-{seq:04}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reduce a user-supplied filename to a safe single path component.
///
/// Path separators become word breaks, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped and leading/trailing `.`/`_` are
/// trimmed. The result may be empty.
///
/// ```rust
/// use pdfconvert::naming::sanitize_filename;
///
/// assert_eq!(sanitize_filename("My Report.pdf"), "My_Report.pdf");
/// assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let spaced = name.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let stripped = RE_UNSAFE_FILENAME_CHARS.replace_all(&joined, "");
    stripped.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Derive a short base name (no extension) for naming produced files.
///
/// Characters other than ASCII alphanumerics, `_` and `-` become `_`; the
/// result is truncated to [`MAX_BASE_LEN`] characters and falls back to
/// `file` when nothing usable remains.
pub fn safe_base_name(filename: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => filename,
    };

    let cleaned: String = stem
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_BASE_LEN)
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Lower-cased extension after the last `.`, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}
