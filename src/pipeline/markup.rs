//! Text-markup outputs built from extracted page layouts: HTML, XML, SVG.
//!
//! These are pure functions over [`PageLayout`] so they can be tested
//! without pdfium.

use crate::error::StageError;
use crate::pipeline::extract::PageLayout;
use base64::Engine;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::Cursor;

const PAGE_STYLE: &str = "body{background:#f4f4f4;margin:0;padding:16px}\
.page{position:relative;background:#fff;margin:0 auto 16px;box-shadow:0 0 4px #999}\
.page p{position:absolute;margin:0;white-space:pre;line-height:1}";

/// Drop characters that are not allowed in XML 1.0 documents.
///
/// pdfium text can carry NULs, form feeds and other C0 controls.
pub fn xml_safe(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

// ── HTML ─────────────────────────────────────────────────────────────────

/// One HTML fragment per page: a sized `div` with absolutely-positioned
/// paragraphs for each text segment.
pub fn html_fragment(layout: &PageLayout) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<div class="page" id="page{}" style="width:{:.1}pt;height:{:.1}pt">"#,
        layout.number, layout.width, layout.height
    );
    for seg in &layout.segments {
        let _ = writeln!(
            out,
            r#"<p style="left:{:.1}pt;top:{:.1}pt;font-size:{:.1}pt">{}</p>"#,
            seg.left,
            layout.top_offset(seg),
            (seg.top - seg.bottom).max(1.0),
            escape(&*xml_safe(&seg.text))
        );
    }
    out.push_str("</div>\n");
    out
}

/// Wrap every page fragment in a minimal HTML document titled `title`.
pub fn html_document(title: &str, pages: &[PageLayout]) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("<meta charset=\"UTF-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape(&*xml_safe(title)));
    let _ = writeln!(out, "<style>{PAGE_STYLE}</style>");
    out.push_str("</head>\n<body>\n");
    for page in pages {
        out.push_str(&html_fragment(page));
    }
    out.push_str("</body>\n</html>\n");
    out
}

// ── XML ──────────────────────────────────────────────────────────────────

/// Structured XML: `<document>` → `<page>` → `<segment>`.
pub fn xml_document(name: &str, pages: &[PageLayout]) -> Result<String, StageError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(StageError::xml)?;

    let mut root = BytesStart::new("document");
    root.push_attribute(("name", name));
    root.push_attribute(("pages", pages.len().to_string().as_str()));
    writer.write_event(Event::Start(root)).map_err(StageError::xml)?;

    for page in pages {
        let mut el = BytesStart::new("page");
        el.push_attribute(("number", page.number.to_string().as_str()));
        el.push_attribute(("width", format!("{:.2}", page.width).as_str()));
        el.push_attribute(("height", format!("{:.2}", page.height).as_str()));
        writer.write_event(Event::Start(el)).map_err(StageError::xml)?;

        for seg in &page.segments {
            let mut s = BytesStart::new("segment");
            s.push_attribute(("left", format!("{:.2}", seg.left).as_str()));
            s.push_attribute(("top", format!("{:.2}", seg.top).as_str()));
            s.push_attribute(("right", format!("{:.2}", seg.right).as_str()));
            s.push_attribute(("bottom", format!("{:.2}", seg.bottom).as_str()));
            writer.write_event(Event::Start(s)).map_err(StageError::xml)?;
            writer
                .write_event(Event::Text(BytesText::new(&xml_safe(&seg.text))))
                .map_err(StageError::xml)?;
            writer
                .write_event(Event::End(BytesEnd::new("segment")))
                .map_err(StageError::xml)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("page")))
            .map_err(StageError::xml)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("document")))
        .map_err(StageError::xml)?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(StageError::xml)
}

// ── SVG ──────────────────────────────────────────────────────────────────

/// One SVG per page: the rendered page as an embedded PNG with an invisible,
/// selectable text layer on top.
pub fn svg_page(layout: &PageLayout, png: &[u8]) -> String {
    let (w, h) = (layout.width, layout.height);
    let data = base64::engine::general_purpose::STANDARD.encode(png);

    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w:.1}pt" height="{h:.1}pt" viewBox="0 0 {w:.2} {h:.2}">"#
    );
    let _ = writeln!(
        out,
        r#"  <image x="0" y="0" width="{w:.2}" height="{h:.2}" preserveAspectRatio="none" xlink:href="data:image/png;base64,{data}"/>"#
    );
    out.push_str("  <g fill-opacity=\"0\" font-family=\"sans-serif\">\n");
    for seg in &layout.segments {
        let _ = writeln!(
            out,
            r#"    <text x="{:.2}" y="{:.2}" font-size="{:.2}">{}</text>"#,
            seg.left,
            (h - seg.bottom).max(0.0),
            (seg.top - seg.bottom).max(1.0),
            escape(&*xml_safe(&seg.text))
        );
    }
    out.push_str("  </g>\n</svg>\n");
    out
}
