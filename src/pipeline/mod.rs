//! Per-stage conversion primitives.
//!
//! Strategies in [`crate::strategy`] are thin compositions of these stages.
//! Each submodule does one thing and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ engine ──┬─▶ render ──▶ (png/jpeg/tiff, svg, pptx)
//! (path)   (pdfium)  └─▶ extract ─▶ markup / ooxml / pandoc
//!                    tabula (tools) ─▶ tables ─▶ csv / xlsx
//! ```
//!
//! 1. [`input`]  : validate a local PDF and derive its base name
//! 2. [`engine`] : the shared pdfium binding; blocking, so callers run it
//!    inside `spawn_blocking`
//! 3. [`render`] : rasterise pages and encode them as PNG/JPEG/TIFF
//! 4. [`extract`]: per-page text and positioned text segments
//! 5. [`markup`] : HTML, XML and SVG built from extracted layouts
//! 6. [`ooxml`]  : DOCX, PPTX and XLSX packages
//! 7. [`pandoc`], [`tables`]: external converters, run through [`tools`]

pub mod engine;
pub mod extract;
pub mod input;
pub mod markup;
pub mod ooxml;
pub mod pandoc;
pub mod render;
pub mod tables;
pub mod tools;
