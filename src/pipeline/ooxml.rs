//! Office Open XML outputs.
//!
//! Word documents are built with `docx-rs` and workbooks with
//! `rust_xlsxwriter`. Neither crate writes PresentationML, so the slide deck
//! is assembled part by part with `zip`, using the smallest part set that
//! PowerPoint and LibreOffice open without repair prompts.

use crate::error::StageError;
use crate::pipeline::markup::xml_safe;
use crate::pipeline::tables::Table;
use docx_rs::{BreakType, Docx, Paragraph, Run};
use rust_xlsxwriter::Workbook;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CT: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const REL_OFFICE_DOC: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// Slide size for 4:3 presentations, in EMU.
pub const SLIDE_WIDTH_EMU: u64 = 9_144_000;
pub const SLIDE_HEIGHT_EMU: u64 = 6_858_000;

/// Longest digit run Excel stores without losing precision.
const MAX_NUMERIC_DIGITS: usize = 15;

// ── DOCX ─────────────────────────────────────────────────────────────────

/// A Word document: one paragraph per text line, a page break between
/// source pages.
pub fn docx_package(pages: &[String]) -> Result<Vec<u8>, StageError> {
    let mut docx = Docx::new();
    for (idx, page) in pages.iter().enumerate() {
        if idx > 0 {
            docx = docx
                .add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)));
        }
        for line in page.lines() {
            let line = line.trim_end();
            let paragraph = if line.is_empty() {
                Paragraph::new()
            } else {
                Paragraph::new().add_run(Run::new().add_text(xml_safe(line)))
            };
            docx = docx.add_paragraph(paragraph);
        }
    }

    let mut out = Cursor::new(Vec::new());
    docx.build().pack(&mut out).map_err(StageError::document)?;
    Ok(out.into_inner())
}

// ── Package plumbing ─────────────────────────────────────────────────────

struct Package {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl Package {
    fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    fn part(&mut self, name: &str, content: &[u8]) -> Result<(), StageError> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(content)?;
        Ok(())
    }

    fn xml(&mut self, name: &str, body: &str) -> Result<(), StageError> {
        let mut doc = String::with_capacity(XML_DECL.len() + body.len());
        doc.push_str(XML_DECL);
        doc.push_str(body);
        self.part(name, doc.as_bytes())
    }

    fn finish(self) -> Result<Vec<u8>, StageError> {
        Ok(self.zip.finish()?.into_inner())
    }
}

/// `<Relationships>` body from `(id, type, target)` triples.
fn relationships(rels: &[(String, &str, String)]) -> String {
    let mut out = format!("<Relationships xmlns=\"{NS_PKG_REL}\">");
    for (id, ty, target) in rels {
        let _ = write!(
            out,
            "<Relationship Id=\"{id}\" Type=\"{ty}\" Target=\"{target}\"/>"
        );
    }
    out.push_str("</Relationships>");
    out
}

fn content_types(defaults: &[(&str, &str)], overrides: &[(String, &str)]) -> String {
    let mut out = format!("<Types xmlns=\"{NS_CT}\">");
    out.push_str("<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>");
    out.push_str("<Default Extension=\"xml\" ContentType=\"application/xml\"/>");
    for (ext, ty) in defaults {
        let _ = write!(out, "<Default Extension=\"{ext}\" ContentType=\"{ty}\"/>");
    }
    for (part, ty) in overrides {
        let _ = write!(out, "<Override PartName=\"{part}\" ContentType=\"{ty}\"/>");
    }
    out.push_str("</Types>");
    out
}

// ── PPTX ─────────────────────────────────────────────────────────────────

const PML_NS: &str = "xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\"";

const EMPTY_SP_TREE: &str = "<p:spTree><p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/>\
<p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree>";

const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// A PresentationML deck: 4:3 slides on a blank layout, each holding one
/// full-bleed PNG of the corresponding page.
pub fn pptx_package(slides: &[Vec<u8>]) -> Result<Vec<u8>, StageError> {
    let n = slides.len();

    let mut overrides: Vec<(String, &str)> = vec![
        (
            "/ppt/presentation.xml".into(),
            "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml",
        ),
        (
            "/ppt/slideMasters/slideMaster1.xml".into(),
            "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml",
        ),
        (
            "/ppt/slideLayouts/slideLayout1.xml".into(),
            "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml",
        ),
        (
            "/ppt/theme/theme1.xml".into(),
            "application/vnd.openxmlformats-officedocument.theme+xml",
        ),
    ];
    for i in 1..=n {
        overrides.push((
            format!("/ppt/slides/slide{i}.xml"),
            "application/vnd.openxmlformats-officedocument.presentationml.slide+xml",
        ));
    }

    let mut pkg = Package::new();
    pkg.xml(
        "[Content_Types].xml",
        &content_types(&[("png", "image/png")], &overrides),
    )?;
    pkg.xml(
        "_rels/.rels",
        &relationships(&[("rId1".into(), REL_OFFICE_DOC, "ppt/presentation.xml".into())]),
    )?;

    // presentation.xml: rId1 = master, rId2..=rId{n+1} = slides, last = theme.
    let mut sld_ids = String::new();
    let mut pres_rels = vec![(
        "rId1".to_string(),
        REL_SLIDE_MASTER,
        "slideMasters/slideMaster1.xml".to_string(),
    )];
    for i in 1..=n {
        let _ = write!(sld_ids, "<p:sldId id=\"{}\" r:id=\"rId{}\"/>", 255 + i, i + 1);
        pres_rels.push((format!("rId{}", i + 1), REL_SLIDE, format!("slides/slide{i}.xml")));
    }
    pres_rels.push((format!("rId{}", n + 2), REL_THEME, "theme/theme1.xml".into()));

    let sld_id_lst = if n == 0 {
        String::new()
    } else {
        format!("<p:sldIdLst>{sld_ids}</p:sldIdLst>")
    };
    pkg.xml(
        "ppt/presentation.xml",
        &format!(
            "<p:presentation {PML_NS}><p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/>\
</p:sldMasterIdLst>{sld_id_lst}<p:sldSz cx=\"{SLIDE_WIDTH_EMU}\" cy=\"{SLIDE_HEIGHT_EMU}\" type=\"screen4x3\"/>\
<p:notesSz cx=\"{SLIDE_HEIGHT_EMU}\" cy=\"{SLIDE_WIDTH_EMU}\"/></p:presentation>"
        ),
    )?;
    pkg.xml("ppt/_rels/presentation.xml.rels", &relationships(&pres_rels))?;

    pkg.xml(
        "ppt/slideMasters/slideMaster1.xml",
        &format!(
            "<p:sldMaster {PML_NS}><p:cSld>{EMPTY_SP_TREE}</p:cSld>\
<p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" \
accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/>\
<p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst></p:sldMaster>"
        ),
    )?;
    pkg.xml(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        &relationships(&[
            ("rId1".into(), REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml".into()),
            ("rId2".into(), REL_THEME, "../theme/theme1.xml".into()),
        ]),
    )?;

    pkg.xml(
        "ppt/slideLayouts/slideLayout1.xml",
        &format!(
            "<p:sldLayout {PML_NS} type=\"blank\" preserve=\"1\"><p:cSld name=\"Blank\">{EMPTY_SP_TREE}</p:cSld>\
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"
        ),
    )?;
    pkg.xml(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        &relationships(&[(
            "rId1".into(),
            REL_SLIDE_MASTER,
            "../slideMasters/slideMaster1.xml".into(),
        )]),
    )?;

    pkg.xml("ppt/theme/theme1.xml", THEME)?;

    for (idx, png) in slides.iter().enumerate() {
        let i = idx + 1;
        pkg.xml(&format!("ppt/slides/slide{i}.xml"), &slide_xml(i))?;
        pkg.xml(
            &format!("ppt/slides/_rels/slide{i}.xml.rels"),
            &relationships(&[
                ("rId1".into(), REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml".into()),
                ("rId2".into(), REL_IMAGE, format!("../media/image{i}.png")),
            ]),
        )?;
        pkg.part(&format!("ppt/media/image{i}.png"), png)?;
    }

    pkg.finish()
}

fn slide_xml(i: usize) -> String {
    format!(
        "<p:sld {PML_NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/>\
</p:nvGrpSpPr><p:grpSpPr/><p:pic><p:nvPicPr><p:cNvPr id=\"2\" name=\"Page {i}\"/><p:cNvPicPr>\
<a:picLocks noChangeAspect=\"1\"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed=\"rId2\"/>\
<a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/>\
<a:ext cx=\"{SLIDE_WIDTH_EMU}\" cy=\"{SLIDE_HEIGHT_EMU}\"/></a:xfrm><a:prstGeom prst=\"rect\"><a:avLst/>\
</a:prstGeom></p:spPr></p:pic></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
    )
}

const THEME: &str = "<a:theme xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" name=\"Office\">\
<a:themeElements><a:clrScheme name=\"Office\">\
<a:dk1><a:sysClr val=\"windowText\" lastClr=\"000000\"/></a:dk1><a:lt1><a:sysClr val=\"window\" lastClr=\"FFFFFF\"/></a:lt1>\
<a:dk2><a:srgbClr val=\"44546A\"/></a:dk2><a:lt2><a:srgbClr val=\"E7E6E6\"/></a:lt2>\
<a:accent1><a:srgbClr val=\"4472C4\"/></a:accent1><a:accent2><a:srgbClr val=\"ED7D31\"/></a:accent2>\
<a:accent3><a:srgbClr val=\"A5A5A5\"/></a:accent3><a:accent4><a:srgbClr val=\"FFC000\"/></a:accent4>\
<a:accent5><a:srgbClr val=\"5B9BD5\"/></a:accent5><a:accent6><a:srgbClr val=\"70AD47\"/></a:accent6>\
<a:hlink><a:srgbClr val=\"0563C1\"/></a:hlink><a:folHlink><a:srgbClr val=\"954F72\"/></a:folHlink>\
</a:clrScheme><a:fontScheme name=\"Office\">\
<a:majorFont><a:latin typeface=\"Calibri Light\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:majorFont>\
<a:minorFont><a:latin typeface=\"Calibri\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:minorFont>\
</a:fontScheme><a:fmtScheme name=\"Office\"><a:fillStyleLst>\
<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:fillStyleLst><a:lnStyleLst>\
<a:ln w=\"6350\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln>\
<a:ln w=\"12700\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln>\
<a:ln w=\"19050\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln></a:lnStyleLst>\
<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle>\
<a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst>\
<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>";

// ── XLSX ─────────────────────────────────────────────────────────────────

/// A workbook with one sheet per table, named `Table_1..n`.
pub fn xlsx_package(tables: &[Table]) -> Result<Vec<u8>, StageError> {
    let mut workbook = Workbook::new();
    for (idx, table) in tables.iter().enumerate() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(idx + 1))?;
        for (r, row) in table.rows.iter().enumerate() {
            let r = u32::try_from(r).map_err(|_| StageError::document("too many rows"))?;
            for (c, cell) in row.iter().enumerate() {
                let c = u16::try_from(c).map_err(|_| StageError::document("too many columns"))?;
                match numeric(cell) {
                    Some(n) => {
                        sheet.write_number(r, c, n)?;
                    }
                    None if cell.is_empty() => {}
                    None => {
                        sheet.write_string(r, c, cell.as_str())?;
                    }
                }
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

/// Worksheet name for the `n`th table (1-indexed).
pub fn sheet_name(n: usize) -> String {
    format!("Table_{n}")
}

/// Cell text that should be stored as a number.
///
/// Leading zeros, explicit plus signs and digit runs longer than Excel's
/// precision stay text, so identifiers survive the round trip.
fn numeric(cell: &str) -> Option<f64> {
    let t = cell.trim();
    if t.is_empty() || t.starts_with('+') || (t.len() > 1 && t.starts_with('0') && !t.starts_with("0.")) {
        return None;
    }
    if t.bytes().filter(u8::is_ascii_digit).count() > MAX_NUMERIC_DIGITS {
        return None;
    }
    t.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entries(bytes: &[u8]) -> Vec<String> {
        let zip = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        zip.file_names().map(str::to_string).collect()
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut s = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn numeric_detection() {
        assert_eq!(numeric("42"), Some(42.0));
        assert_eq!(numeric(" -3.5 "), Some(-3.5));
        assert_eq!(numeric("0.25"), Some(0.25));
        assert_eq!(numeric("007"), None);
        assert_eq!(numeric("+1"), None);
        assert_eq!(numeric("NaN"), None);
        assert_eq!(numeric("1,000"), None);
        assert_eq!(numeric(""), None);
        assert_eq!(numeric("123456789012345"), Some(123456789012345.0));
        assert_eq!(numeric("12345678901234567890"), None);
        assert_eq!(numeric("-1234567890.1234567"), None);
    }

    #[test]
    fn docx_has_paragraphs_and_page_breaks() {
        let bytes =
            docx_package(&["Hello <world>\nsecond".into(), "page two".into()]).unwrap();
        let names = entries(&bytes);
        assert!(names.contains(&"[Content_Types].xml".to_string()));
        assert!(names.contains(&"_rels/.rels".to_string()));
        assert!(names.contains(&"word/document.xml".to_string()));

        let doc = read_entry(&bytes, "word/document.xml");
        assert!(doc.contains("Hello &lt;world"), "{doc}");
        assert!(!doc.contains("<world>"));
        assert!(doc.contains("second"));
        assert!(doc.contains("page two"));
        assert_eq!(doc.matches("w:type=\"page\"").count(), 1);
    }

    #[test]
    fn pptx_has_one_slide_per_image() {
        let bytes = pptx_package(&[b"png1".to_vec(), b"png2".to_vec(), b"png3".to_vec()]).unwrap();
        let names = entries(&bytes);
        for i in 1..=3 {
            assert!(names.contains(&format!("ppt/slides/slide{i}.xml")));
            assert!(names.contains(&format!("ppt/media/image{i}.png")));
        }
        assert!(!names.contains(&"ppt/slides/slide4.xml".to_string()));

        let pres = read_entry(&bytes, "ppt/presentation.xml");
        assert_eq!(pres.matches("<p:sldId ").count(), 3);
        assert!(pres.contains("cx=\"9144000\" cy=\"6858000\""));

        let rels = read_entry(&bytes, "ppt/_rels/presentation.xml.rels");
        assert!(rels.contains("Id=\"rId5\""));
        assert!(rels.contains("theme/theme1.xml"));

        let slide = read_entry(&bytes, "ppt/slides/slide2.xml");
        assert!(slide.contains("<a:off x=\"0\" y=\"0\"/>"));
        assert!(slide.contains("r:embed=\"rId2\""));
        assert_eq!(read_entry(&bytes, "ppt/media/image2.png"), "png2");
    }

    #[test]
    fn xlsx_names_sheets_sequentially() {
        let tables = vec![
            Table::new(vec![vec!["Name".into(), "Qty".into()], vec!["A&B".into(), "3".into()]]),
            Table::new(vec![vec!["x".into()]]),
            Table::new(vec![vec!["".into(), "2.5".into()]]),
        ];
        let bytes = xlsx_package(&tables).unwrap();
        let wb = read_entry(&bytes, "xl/workbook.xml");
        assert!(wb.contains("name=\"Table_1\""));
        assert!(wb.contains("name=\"Table_2\""));
        assert!(wb.contains("name=\"Table_3\""));
        assert_eq!(wb.matches("<sheet ").count(), 3);

        let strings = read_entry(&bytes, "xl/sharedStrings.xml");
        assert!(strings.contains("A&amp;B"), "{strings}");
        let s1 = read_entry(&bytes, "xl/worksheets/sheet1.xml");
        assert!(s1.contains("r=\"B2\""));
        assert!(s1.contains("<v>3</v>"));

        let s3 = read_entry(&bytes, "xl/worksheets/sheet3.xml");
        assert!(!s3.contains("<c r=\"A1\""));
        assert!(s3.contains("<v>2.5</v>"));
    }

    #[test]
    fn xlsx_keeps_long_digit_runs_as_text() {
        let tables = vec![Table::new(vec![vec!["12345678901234567890".into(), "42".into()]])];
        let bytes = xlsx_package(&tables).unwrap();

        let strings = read_entry(&bytes, "xl/sharedStrings.xml");
        assert!(strings.contains("12345678901234567890"), "{strings}");
        let sheet = read_entry(&bytes, "xl/worksheets/sheet1.xml");
        assert!(!sheet.contains("1234567890123456"), "{sheet}");
        assert!(sheet.contains("<v>42</v>"));
    }
}
