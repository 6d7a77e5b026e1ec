//! Error types for the pdfconvert library.
//!
//! Three error types map to three layers of the request:
//!
//! * [`ConvertError`]: **Fatal** for the request. Returned from the public
//!   operations (upload, convert, download) and from startup. Each request
//!   fails independently; nothing here is fatal to the process.
//!
//! * [`ValidationError`]: the request was rejected before any work began
//!   (no file, wrong extension, unknown or disabled format, oversize). No
//!   file is ever created when one of these is returned.
//!
//! * [`StageError`]: a single step inside a conversion strategy failed
//!   (pdfium, image encoding, zip, an Office writer, an external tool).
//!   The dispatcher logs it with full detail and surfaces it as
//!   [`ConvertError::ConversionFailed`]. Its `Display` output never contains
//!   filesystem paths, so it is safe to show to the user. External tools'
//!   stderr goes to the log only.

use crate::registry::Dependency;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfconvert library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The request was rejected before any work began.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A conversion strategy failed; `message` is safe to show to the user.
    #[error("Conversion to '{format}' failed: {message}")]
    ConversionFailed { format: String, message: String },

    /// A download was requested for a file that does not exist (or whose
    /// name sanitised to nothing).
    #[error("File not found: '{name}'")]
    NotFound { name: String },

    // ── Local input errors ────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Storage errors ────────────────────────────────────────────────────
    /// Could not create or write a file in the upload/output storage area.
    #[error("Storage error at '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Startup errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is required for every conversion. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or the directory containing it).\n\
  • Install libpdfium system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// `true` when the error was raised before any side effect happened.
    pub fn is_validation(&self) -> bool {
        matches!(self, ConvertError::Validation(_))
    }
}

/// Reasons a request is rejected up front.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No file part was present, or its filename was empty.
    #[error("No file selected")]
    NoFileSelected,

    /// The request body could not be read as a multipart form.
    #[error("Malformed upload request")]
    MalformedRequest,

    /// The filename does not carry an allowed source extension.
    #[error("Only PDF files are allowed (got '{filename}')")]
    UnsupportedExtension { filename: String },

    /// The payload is named `.pdf` but does not start with the PDF header.
    #[error("File is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// The requested output format is not in the registry.
    #[error("Invalid output format '{key}'")]
    UnknownFormat { key: String },

    /// The requested output format needs an optional dependency that was
    /// not found at startup.
    #[error("Output format '{key}' is unavailable: requires {dependency}")]
    FormatUnavailable { key: String, dependency: Dependency },

    /// The upload exceeds the configured size cap.
    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
}

/// A failure inside one conversion step.
///
/// Never carries a filesystem path in its message: the dispatcher attaches
/// paths to the log record instead.
#[derive(Debug, Error)]
pub enum StageError {
    /// pdfium could not open or read the document.
    #[error("PDF could not be read: {0}")]
    Pdf(String),

    /// pdfium returned an error for a specific page.
    #[error("Rendering failed for page {page}: {detail}")]
    Render { page: usize, detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("XML generation failed: {0}")]
    Xml(String),

    #[error("Document generation failed: {0}")]
    Document(String),

    #[error("Spreadsheet generation failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv_async::Error),

    /// An external tool (pandoc, java) exited unsuccessfully or produced
    /// unreadable output.
    #[error("{tool} failed: {detail}")]
    Tool { tool: &'static str, detail: String },

    /// The table extractor ran but found nothing to write.
    #[error("No tables were found in the document")]
    NoTables,

    /// A blocking worker panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    Task(String),
}

impl StageError {
    /// Wrap any XML writer error (quick-xml or formatting) as [`StageError::Xml`].
    pub(crate) fn xml(e: impl std::fmt::Display) -> Self {
        StageError::Xml(e.to_string())
    }

    /// Wrap an Office writer error as [`StageError::Document`].
    pub(crate) fn document(e: impl std::fmt::Display) -> Self {
        StageError::Document(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StageError {
    fn from(e: tokio::task::JoinError) -> Self {
        StageError::Task(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_converts_into_convert_error() {
        let e: ConvertError = ValidationError::NoFileSelected.into();
        assert!(e.is_validation());
        assert_eq!(e.to_string(), "No file selected");
    }

    #[test]
    fn format_unavailable_names_dependency() {
        let e = ValidationError::FormatUnavailable {
            key: "epub".into(),
            dependency: Dependency::DocumentConverter,
        };
        let msg = e.to_string();
        assert!(msg.contains("epub"), "got: {msg}");
        assert!(msg.contains("pandoc"), "got: {msg}");
    }

    #[test]
    fn conversion_failed_display() {
        let e = ConvertError::ConversionFailed {
            format: "png".into(),
            message: "Rendering failed for page 3: bad object".into(),
        };
        assert!(!e.is_validation());
        assert!(e.to_string().contains("'png'"));
        assert!(e.to_string().contains("page 3"));
    }

    #[test]
    fn tool_error_display() {
        let e = StageError::Tool {
            tool: "pandoc",
            detail: "Unknown output format".into(),
        };
        assert_eq!(e.to_string(), "pandoc failed: Unknown output format");
    }

    #[test]
    fn payload_too_large_display() {
        let e = ValidationError::PayloadTooLarge {
            size: 60,
            limit: 50,
        };
        assert!(e.to_string().contains("60"));
        assert!(e.to_string().contains("50"));
    }
}
