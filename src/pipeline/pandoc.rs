//! Document-converter family: extracted text piped through pandoc.

use crate::error::StageError;
use crate::pipeline::markup::xml_safe;
use crate::pipeline::tools::run_tool;
use quick_xml::escape::escape;
use std::ffi::OsStr;
use std::path::Path;
use tracing::debug;

/// pandoc writer for each format key this family serves.
///
/// `mobi` and `pages` have no pandoc writer; they map to EPUB 2 and RTF.
pub fn pandoc_writer(key: &str) -> Option<&'static str> {
    match key {
        "doc" | "rtf" | "pages" => Some("rtf"),
        "epub" => Some("epub3"),
        "mobi" => Some("epub2"),
        "odt" => Some("odt"),
        "markdown" => Some("gfm"),
        _ => None,
    }
}

/// Format keys served by pandoc.
pub const PANDOC_KEYS: &[&str] = &["doc", "rtf", "epub", "mobi", "odt", "markdown", "pages"];

/// Wrap plain text as a minimal HTML body: one `<p>` per blank-line
/// separated block, line breaks preserved.
pub fn text_to_html(title: &str, text: &str) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>{}</title>\n</head>\n<body>\n",
        escape(&*xml_safe(title))
    );
    for block in text.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let lines: Vec<String> = block
            .lines()
            .map(|l| escape(&*xml_safe(l.trim_end())).into_owned())
            .collect();
        html.push_str("<p>");
        html.push_str(&lines.join("<br/>\n"));
        html.push_str("</p>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}

/// Convert `text` to `writer` with pandoc, writing `destination`.
pub async fn convert_text(
    program: &Path,
    title: &str,
    text: &str,
    writer: &str,
    destination: &Path,
) -> Result<(), StageError> {
    let input = text_to_html(title, text).into_bytes();
    debug!(writer, bytes = input.len(), "Running pandoc");

    let title_meta = format!("title={title}");
    let args: [&OsStr; 8] = [
        OsStr::new("--from"),
        OsStr::new("html"),
        OsStr::new("--to"),
        OsStr::new(writer),
        OsStr::new("--metadata"),
        OsStr::new(&title_meta),
        OsStr::new("--output"),
        destination.as_os_str(),
    ];
    run_tool("pandoc", program, args, Some(input)).await?;
    Ok(())
}
