//! Text and layout extraction from pdfium pages.

use crate::error::StageError;
use pdfium_render::prelude::*;

/// One run of text with its bounding box in PDF points.
///
/// PDF coordinates: origin at the bottom-left, `top > bottom`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// The text content of one page plus its geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    /// 1-indexed page number.
    pub number: usize,
    pub width: f32,
    pub height: f32,
    /// All page text in reading order, as pdfium reports it.
    pub text: String,
    pub segments: Vec<TextSegment>,
}

impl PageLayout {
    /// Distance from the top edge of the page to the top of `segment`,
    /// i.e. the CSS/SVG `top` coordinate.
    pub fn top_offset(&self, segment: &TextSegment) -> f32 {
        (self.height - segment.top).max(0.0)
    }
}

/// Plain text of one page.
pub fn page_text(page: &PdfPage<'_>, page_num: usize) -> Result<String, StageError> {
    let text = page.text().map_err(|e| StageError::Render {
        page: page_num,
        detail: format!("text extraction: {e:?}"),
    })?;
    Ok(text.all())
}

/// Text plus positioned segments for one page.
pub fn page_layout(page: &PdfPage<'_>, page_num: usize) -> Result<PageLayout, StageError> {
    let text = page.text().map_err(|e| StageError::Render {
        page: page_num,
        detail: format!("text extraction: {e:?}"),
    })?;

    let segments = text
        .segments()
        .iter()
        .filter_map(|segment| {
            let content = segment.text();
            if content.trim().is_empty() {
                return None;
            }
            let bounds = segment.bounds();
            Some(TextSegment {
                text: content,
                left: bounds.left().value,
                top: bounds.top().value,
                right: bounds.right().value,
                bottom: bounds.bottom().value,
            })
        })
        .collect();

    Ok(PageLayout {
        number: page_num,
        width: page.width().value,
        height: page.height().value,
        text: text.all(),
        segments,
    })
}

/// Join page texts with a blank line between pages.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| p.as_ref().trim_end())
        .collect::<Vec<_>>()
        .join("\n\n")
}
