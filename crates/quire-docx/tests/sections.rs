//! Sections, page geometry, headers and footers

mod common;

use common::{docx, roundtrip};
use quire_docx::{
    Block, Document, HeaderFooter, HeaderFooterKind, Orientation, PageMargins, PageSize, Paragraph,
    SectionBreakType,
};

fn two_section_document() -> Document {
    let mut doc = Document::new();

    let first = doc.current_section_mut();
    first.page_size = PageSize::A4;
    first.set_orientation(Orientation::Landscape);
    first.set_columns(2).unwrap();
    doc.add_header(HeaderFooterKind::Default, HeaderFooter::with_text("Wide pages")).unwrap();
    doc.add_paragraph(Paragraph::with_text("In landscape"));

    let second = doc.add_section_break(SectionBreakType::EvenPage);
    second.page_size = PageSize::LETTER;
    second.set_orientation(Orientation::Portrait);
    second.set_columns(3).unwrap();
    doc.add_footer(HeaderFooterKind::Default, HeaderFooter::with_text("Tall pages")).unwrap();
    doc.add_paragraph(Paragraph::with_text("In portrait"));

    doc
}

#[test]
fn test_two_sections_roundtrip() {
    let loaded = roundtrip(&two_section_document());

    let sections = loaded.sections();
    assert_eq!(sections.len(), 2);

    let first = sections[0];
    assert_eq!(first.orientation, Orientation::Landscape);
    assert_eq!(first.page_size, PageSize::A4.swapped());
    assert_eq!(first.columns, 2);
    assert_eq!(first.header(HeaderFooterKind::Default).unwrap().text(), "Wide pages");
    assert!(first.footer(HeaderFooterKind::Default).is_none());

    let second = sections[1];
    assert_eq!(second.orientation, Orientation::Portrait);
    assert_eq!(second.page_size, PageSize::LETTER);
    assert_eq!(second.columns, 3);
    assert_eq!(second.footer(HeaderFooterKind::Default).unwrap().text(), "Tall pages");
    assert!(second.header(HeaderFooterKind::Default).is_none());

    let breaks: Vec<SectionBreakType> = loaded
        .blocks()
        .iter()
        .filter_map(|b| match b {
            Block::SectionBreak(br) => Some(br.break_type),
            _ => None,
        })
        .collect();
    assert_eq!(breaks, vec![SectionBreakType::EvenPage]);

    let texts: Vec<String> = loaded.paragraphs().map(Paragraph::text).collect();
    assert_eq!(texts, vec!["In landscape", "In portrait"]);
}

#[test]
fn test_margins_roundtrip() {
    let mut doc = Document::new();
    let margins = PageMargins {
        top: 720,
        right: 1080,
        bottom: 720,
        left: 1080,
        header: 360,
        footer: 360,
        gutter: 0,
    };
    doc.current_section_mut().set_margins(margins).unwrap();
    doc.add_paragraph(Paragraph::with_text("narrow"));

    let loaded = roundtrip(&doc);
    assert_eq!(loaded.current_section().margins, margins);
}

#[test]
fn test_header_hydration_is_idempotent() {
    let header = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:p><w:r><w:t>Shared</w:t></w:r></w:p></w:hdr>"#;
    let rels = r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/></Relationships>"#;
    let body = r#"<w:p><w:pPr><w:sectPr>
                    <w:headerReference w:type="default" r:id="rId5"/>
                    <w:headerReference w:type="default" r:id="rId5"/>
                  </w:sectPr></w:pPr><w:r><w:t>one</w:t></w:r></w:p>
                  <w:p><w:r><w:t>two</w:t></w:r></w:p>
                  <w:sectPr><w:headerReference w:type="default" r:id="rId5"/></w:sectPr>"#;
    let doc = Document::from_bytes(&docx(
        body,
        &[("word/header1.xml", header), ("word/_rels/document.xml.rels", rels)],
    ))
    .unwrap();

    let sections = doc.sections();
    assert_eq!(sections.len(), 2);
    for section in &sections {
        let header = section.header(HeaderFooterKind::Default).unwrap();
        assert_eq!(header.paragraphs.len(), 1);
        assert_eq!(header.text(), "Shared");
    }
    // header content never leaks into the body
    let texts: Vec<String> = doc.paragraphs().map(Paragraph::text).collect();
    assert_eq!(texts, vec!["one", "two"]);

    let again = roundtrip(&roundtrip(&doc));
    for section in again.sections() {
        let header = section.header(HeaderFooterKind::Default).unwrap();
        assert_eq!(header.paragraphs.len(), 1);
        assert_eq!(header.text(), "Shared");
    }
}

#[test]
fn test_first_page_header_sets_title_page() {
    let mut doc = Document::new();
    doc.add_header(HeaderFooterKind::First, HeaderFooter::with_text("Cover")).unwrap();
    doc.add_header(HeaderFooterKind::Default, HeaderFooter::with_text("Running")).unwrap();
    doc.add_paragraph(Paragraph::with_text("body"));

    let loaded = roundtrip(&doc);
    let section = loaded.current_section();
    assert!(section.has_title_page());
    assert_eq!(section.header(HeaderFooterKind::First).unwrap().text(), "Cover");
    assert_eq!(section.header(HeaderFooterKind::Default).unwrap().text(), "Running");
}

#[test]
fn test_invalid_geometry_is_rejected_without_change() {
    let mut doc = Document::new();
    let section = doc.current_section_mut();
    assert!(section.set_columns(0).unwrap_err().is_invalid_argument());
    assert!(section.set_page_size(0, 15840).unwrap_err().is_invalid_argument());
    assert_eq!(section.columns, 1);
    assert_eq!(section.page_size, PageSize::LETTER);
}
