//! # pdfconvert
//!
//! Convert uploaded PDF documents to one of eighteen output formats: plain
//! text, HTML, XML, Word, PowerPoint, Excel, CSV, per-page PNG/JPEG/TIFF/SVG
//! archives, and (with pandoc installed) RTF, EPUB, ODT, Markdown and friends.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Intake    size cap, .pdf extension, %PDF magic, unique name
//!  ├─ 2. Resolve   format key → registry entry (unknown / disabled → 400)
//!  ├─ 3. Dispatch  format key → strategy (pdfium, zip, pandoc, tabula)
//!  ├─ 4. Package   per-page / per-table files → one zip
//!  └─ 5. Output    converted_{token}_{base}.{ext} in the output directory
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfconvert::{Converter, ConverterConfig, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConverterConfig::builder()
//!         .output_dir("converted")
//!         .build()?;
//!     let converter = Converter::start(config).await?;
//!
//!     let upload = UploadedFile::new("report.pdf", std::fs::read("report.pdf")?);
//!     let output = converter.convert_upload(&upload, "docx").await?;
//!     println!("{} ({} bytes)", output.file_name, output.bytes);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdfconvert` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | HTTP surface on axum: `/formats`, `/convert`, `/download/{name}` |
//!
//! ## Optional toolchains
//!
//! pdfium is required and bound once at startup. pandoc enables doc, rtf,
//! epub, mobi, odt, markdown and pages; a Java runtime plus a tabula-java
//! jar enable csv and xlsx. Missing optional toolchains disable their
//! formats in the registry instead of failing at request time.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod capabilities;
pub mod config;
pub mod convert;
pub mod download;
pub mod error;
pub mod naming;
pub mod packager;
pub mod pipeline;
pub mod progress;
pub mod registry;
#[cfg(feature = "server")]
pub mod server;
pub mod staging;
pub mod strategy;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use capabilities::Capabilities;
pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use convert::{ConversionOutput, Converter};
pub use download::DownloadResolver;
pub use error::{ConvertError, StageError, ValidationError};
pub use naming::JobToken;
pub use pipeline::engine::PdfEngine;
pub use pipeline::input::SourceDocument;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use registry::{Dependency, FormatRegistry, FormatStatus, SupportedFormat};
pub use staging::{StagingArea, StagingFactory};
pub use strategy::{ConversionStrategy, JobContext, StrategyTable};
pub use upload::{UploadHandler, UploadedFile};
