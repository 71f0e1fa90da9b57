//! The editable document model
//!
//! A [`Document`] owns its blocks in body order. Sections are not stored as
//! a separate list: every [`Block::SectionBreak`] carries the section it
//! closes and the document keeps the last, still open section itself, so
//! [`Document::sections`] is always consistent with the block order.
//!
//! ```
//! use quire_docx::{Document, Paragraph};
//!
//! let mut doc = Document::new();
//! doc.add_paragraph(Paragraph::new())
//!     .add_text("Hello, reader!")
//!     .set_bold(true);
//!
//! let bytes = doc.to_bytes().unwrap();
//! let loaded = Document::from_bytes(&bytes).unwrap();
//! assert_eq!(loaded.plain_text(), "Hello, reader!");
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{DocxError, Result};
use crate::field::{Field, FieldContext, HyperlinkTarget};
use crate::hydrate;
use crate::ids::{IdGenerator, IdKind};
use crate::image::Image;
use crate::media::MediaManager;
use crate::package::Package;
use crate::paragraph::{heading_level_of, Bookmark, Paragraph};
use crate::properties::CoreProperties;
use crate::relationships::{Relationships, TargetMode};
use crate::run::Run;
use crate::section::{HeaderFooter, HeaderFooterKind, Section, SectionBreakType};
use crate::styles::{Style, StyleSheet};
use crate::table::{CellBlock, Table};
use crate::writer;

/// A top-level body element
#[derive(Debug, Clone)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    /// Closes a section
    SectionBreak(SectionBreak),
}

/// The end of a section
#[derive(Debug, Clone)]
pub struct SectionBreak {
    /// The section this break closes
    pub section: Section,
    pub break_type: SectionBreakType,
}

/// A part carried through from the source package unchanged
#[derive(Debug, Clone)]
pub struct RetainedPart {
    /// Part path with original casing
    pub path: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Which of the two header/footer maps a part belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PartFamily {
    Header,
    Footer,
}

impl PartFamily {
    pub(crate) fn prefix(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Footer => "footer",
        }
    }

    fn id_kind(&self) -> IdKind {
        match self {
            Self::Header => IdKind::Header,
            Self::Footer => IdKind::Footer,
        }
    }

    pub(crate) fn rel_type(&self) -> &'static str {
        match self {
            Self::Header => Relationships::TYPE_HEADER,
            Self::Footer => Relationships::TYPE_FOOTER,
        }
    }
}

/// A word-processing document
#[derive(Debug)]
pub struct Document {
    pub(crate) blocks: Vec<Block>,
    /// The open (last) section
    pub(crate) section: Section,
    pub(crate) relationships: Relationships,
    pub(crate) media: MediaManager,
    pub(crate) ids: IdGenerator,
    /// Numbering part (path, bytes), carried unchanged
    pub(crate) numbering: Option<RetainedPart>,
    pub(crate) retained: Vec<RetainedPart>,
    pub(crate) styles: StyleSheet,
    /// Ids of styles added through [`Document::add_style`]
    pub(crate) custom_styles: Vec<String>,
    /// `word/styles.xml` as loaded
    pub(crate) original_styles: Option<Vec<u8>>,
    pub(crate) config: Config,
    /// Core metadata written to `docProps/core.xml`
    pub properties: CoreProperties,
}

impl Default for Document {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl Document {
    /// Create an empty document with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document using `config` for page size, fonts and writer settings
    pub fn with_config(config: Config) -> Self {
        let properties = CoreProperties {
            creator: config.properties.creator.clone(),
            ..CoreProperties::default()
        };
        Self {
            blocks: Vec::new(),
            section: Section::with_page(config.defaults.page.size()),
            relationships: Relationships::new(),
            media: MediaManager::new(),
            ids: IdGenerator::new(),
            numbering: None,
            retained: Vec::new(),
            styles: StyleSheet::builtin(),
            custom_styles: Vec::new(),
            original_styles: None,
            config,
            properties,
        }
    }

    /// Open a DOCX file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load from DOCX bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Load from any `Read + Seek` source
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let package = Package::from_reader(reader)?;
        hydrate::hydrate(&package)
    }

    /// Write the document to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(file)
    }

    /// Serialize to DOCX bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.write_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Write the archive to any `Write + Seek` sink
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        writer::write(self, writer)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the configuration; affects later writes only
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Body blocks in document order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    /// Top-level paragraphs
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Top-level tables
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    /// All sections in order; never empty
    pub fn sections(&self) -> Vec<&Section> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::SectionBreak(br) => Some(&br.section),
                _ => None,
            })
            .chain(std::iter::once(&self.section))
            .collect()
    }

    /// The open section, which new blocks belong to
    pub fn current_section(&self) -> &Section {
        &self.section
    }

    pub fn current_section_mut(&mut self) -> &mut Section {
        &mut self.section
    }

    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    pub fn media(&self) -> &MediaManager {
        &self.media
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    /// Bytes of the numbering part, if the document has one
    pub fn numbering(&self) -> Option<&[u8]> {
        self.numbering.as_ref().map(|n| n.data.as_slice())
    }

    /// Parts carried through unchanged from the source package
    pub fn retained_parts(&self) -> &[RetainedPart] {
        &self.retained
    }

    /// Append a paragraph
    pub fn add_paragraph(&mut self, paragraph: Paragraph) -> &mut Paragraph {
        self.blocks.push(Block::Paragraph(paragraph));
        match self.blocks.last_mut() {
            Some(Block::Paragraph(p)) => p,
            _ => unreachable!("a paragraph was just pushed"),
        }
    }

    /// Append a heading paragraph (`HeadingN`) with a `_Toc` bookmark
    pub fn add_heading(&mut self, text: impl Into<String>, level: u8) -> Result<&mut Paragraph> {
        if !(1..=9).contains(&level) {
            return Err(DocxError::invalid_argument(
                "add heading",
                format!("heading level {} is outside 1..=9", level),
            ));
        }
        let id = self.ids.next(IdKind::Bookmark)?;
        let mut paragraph = Paragraph::with_text(text).with_style(format!("Heading{}", level));
        paragraph.bookmark = Some(Bookmark {
            id,
            name: format!("_Toc{:08}", id),
        });
        Ok(self.add_paragraph(paragraph))
    }

    /// Append a table
    pub fn add_table(&mut self, table: Table) -> &mut Table {
        self.blocks.push(Block::Table(table));
        match self.blocks.last_mut() {
            Some(Block::Table(t)) => t,
            _ => unreachable!("a table was just pushed"),
        }
    }

    /// Close the open section with a break and start a new one.
    ///
    /// Returns the new section, which starts on the configured page size.
    pub fn add_section_break(&mut self, break_type: SectionBreakType) -> &mut Section {
        let next = Section::with_page(self.config.defaults.page.size());
        let closed = std::mem::replace(&mut self.section, next);
        self.blocks.push(Block::SectionBreak(SectionBreak {
            section: closed,
            break_type,
        }));
        &mut self.section
    }

    /// Attach a header to the open section, replacing one of the same kind
    pub fn add_header(&mut self, kind: HeaderFooterKind, header: HeaderFooter) -> Result<&mut HeaderFooter> {
        let part = self.prepare_part(PartFamily::Header, header)?;
        let headers = &mut self.section.headers;
        headers.insert(kind, part);
        Ok(headers.entry(kind).or_default())
    }

    /// Attach a footer to the open section, replacing one of the same kind
    pub fn add_footer(&mut self, kind: HeaderFooterKind, footer: HeaderFooter) -> Result<&mut HeaderFooter> {
        let part = self.prepare_part(PartFamily::Footer, footer)?;
        let footers = &mut self.section.footers;
        footers.insert(kind, part);
        Ok(footers.entry(kind).or_default())
    }

    fn prepare_part(&mut self, family: PartFamily, mut part: HeaderFooter) -> Result<HeaderFooter> {
        let name = loop {
            let n = self.ids.next(family.id_kind())?;
            let candidate = format!("{}{}.xml", family.prefix(), n);
            if !self.part_name_taken(&format!("word/{}", candidate)) {
                break candidate;
            }
        };
        part.rel_id = Some(self.relationships.add(family.rel_type(), &name, TargetMode::Internal));
        part.target = format!("word/{}", name);
        log::debug!("added {} {}", family.prefix(), part.target);
        Ok(part)
    }

    fn part_name_taken(&self, path: &str) -> bool {
        let same = |p: &str| p.eq_ignore_ascii_case(path);
        self.sections().iter().any(|s| {
            s.headers
                .values()
                .chain(s.footers.values())
                .any(|hf| same(&hf.target))
        }) || self.retained.iter().any(|p| same(&p.path))
    }

    /// Register image bytes and build an inline image sized from its pixels.
    ///
    /// Identical bytes share one media part and relationship. The image is
    /// not placed; put it in a run with [`Run::with_image`].
    pub fn create_image(&mut self, data: impl Into<Arc<[u8]>>, content_type: &str) -> Result<Image> {
        let id = self.ids.next(IdKind::Image)?;
        let entry = self.media.register(data, content_type);
        let target = entry.target();
        let rel_id = match self.relationships.find(Relationships::TYPE_IMAGE, &target) {
            Some(rel) => rel.id.clone(),
            None => self
                .relationships
                .add(Relationships::TYPE_IMAGE, &target, TargetMode::Internal),
        };
        let mut image = Image::from_bytes(id, entry.data.clone(), entry.content_type.as_str())?;
        image.rel_id = Some(rel_id);
        image.target = target;
        Ok(image)
    }

    /// Append a paragraph holding a single inline image
    pub fn add_image(&mut self, data: impl Into<Arc<[u8]>>, content_type: &str) -> Result<&mut Image> {
        let image = self.create_image(data, content_type)?;
        let run = self.add_paragraph(Paragraph::new()).add_run(Run::default());
        Ok(run.image.insert(image))
    }

    /// Build a run linking to a URL or bookmark, styled `Hyperlink`.
    ///
    /// External URLs get a relationship in the main document part.
    pub fn hyperlink_run(&mut self, target: HyperlinkTarget, display: impl Into<String>) -> Run {
        let display = display.into();
        let target = match target {
            HyperlinkTarget::External { url, relationship_id } => {
                let rel_id = relationship_id.unwrap_or_else(|| {
                    self.relationships
                        .add(Relationships::TYPE_HYPERLINK, &url, TargetMode::External)
                });
                HyperlinkTarget::External {
                    url,
                    relationship_id: Some(rel_id),
                }
            }
            anchor => anchor,
        };
        let mut run = Run::new(display.as_str());
        run.set_style("Hyperlink");
        run.add_field(Arc::new(Field::hyperlink(target, display)));
        run
    }

    /// Append a paragraph holding a link to an external URL
    pub fn add_hyperlink(&mut self, url: impl Into<String>, display: impl Into<String>) -> &mut Paragraph {
        let run = self.hyperlink_run(
            HyperlinkTarget::External {
                url: url.into(),
                relationship_id: None,
            },
            display,
        );
        let paragraph = self.add_paragraph(Paragraph::new());
        paragraph.add_run(run);
        paragraph
    }

    /// Define a custom paragraph or character style
    pub fn add_style(&mut self, style: Style) -> Result<()> {
        let id = style.id.clone();
        self.styles.add(style)?;
        self.custom_styles.push(id);
        Ok(())
    }

    /// Whether a style id denotes a heading, by outline level or by name
    pub fn is_heading_style(&self, style_id: &str) -> bool {
        self.styles.is_heading(style_id) || heading_level_of(style_id).is_some()
    }

    /// Refresh every field in the body, tables, headers and footers.
    ///
    /// Page count is estimated from the page-starting section breaks.
    /// Returns the number of fields refreshed.
    pub fn update_fields(&self) -> usize {
        let ctx = self.field_context();

        let mut fields: Vec<Arc<Field>> = Vec::new();
        self.visit_paragraphs(&mut |p| {
            for field in p.fields() {
                if !fields.iter().any(|seen| Arc::ptr_eq(seen, &field)) {
                    fields.push(field);
                }
            }
        });
        for field in &fields {
            field.update(&ctx);
        }
        log::debug!("updated {} fields", fields.len());
        fields.len()
    }

    /// Values for field refresh; one page plus one per page-starting break
    pub(crate) fn field_context(&self) -> FieldContext {
        let breaks = self
            .blocks
            .iter()
            .filter(|b| matches!(b, Block::SectionBreak(br) if br.break_type.starts_page()))
            .count();
        FieldContext {
            page_count: 1 + breaks as u32,
            ..FieldContext::default()
        }
    }

    /// Every paragraph in the body, in tables and in headers and footers
    pub(crate) fn visit_paragraphs(&self, f: &mut dyn FnMut(&Paragraph)) {
        fn visit_table(table: &Table, f: &mut dyn FnMut(&Paragraph)) {
            for cell in table.rows.iter().flat_map(|r| r.cells.iter()) {
                for block in &cell.blocks {
                    match block {
                        CellBlock::Paragraph(p) => f(p),
                        CellBlock::Table(t) => visit_table(t, f),
                    }
                }
            }
        }

        for block in &self.blocks {
            match block {
                Block::Paragraph(p) => f(p),
                Block::Table(t) => visit_table(t, f),
                Block::SectionBreak(_) => {}
            }
        }
        for section in self.sections() {
            for part in section.headers.values().chain(section.footers.values()) {
                for paragraph in &part.paragraphs {
                    f(paragraph);
                }
            }
        }
    }

    /// Body text: one line per paragraph, tables flattened
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) => Some(p.text()),
                Block::Table(t) => Some(t.plain_text()),
                Block::SectionBreak(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Header and footer parts by target path, first occurrence wins
    pub(crate) fn header_footer_parts(&self) -> BTreeMap<String, (PartFamily, &HeaderFooter)> {
        let mut parts = BTreeMap::new();
        for section in self.sections() {
            for (family, map) in [(PartFamily::Header, &section.headers), (PartFamily::Footer, &section.footers)] {
                for part in map.values() {
                    parts
                        .entry(part.target.to_ascii_lowercase())
                        .or_insert((family, part));
                }
            }
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PagePreset;
    use crate::image::tests::png_bytes;
    use crate::section::PageSize;

    #[test]
    fn test_new_document_has_one_section() {
        let doc = Document::new();
        assert_eq!(doc.sections().len(), 1);
        assert_eq!(doc.current_section().page_size, PageSize::LETTER);
        assert!(doc.blocks().is_empty());
    }

    #[test]
    fn test_config_page_preset() {
        let mut config = Config::default();
        config.defaults.page = PagePreset::A4;
        config.properties.creator = Some("Ada".to_string());
        let doc = Document::with_config(config);
        assert_eq!(doc.current_section().page_size, PageSize::A4);
        assert_eq!(doc.properties.creator.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_section_breaks_close_sections() {
        let mut doc = Document::new();
        doc.current_section_mut().set_columns(2).unwrap();
        doc.add_paragraph(Paragraph::with_text("one"));
        doc.add_section_break(SectionBreakType::EvenPage).set_columns(3).unwrap();
        doc.add_paragraph(Paragraph::with_text("two"));

        let sections = doc.sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].columns, 2);
        assert_eq!(sections[1].columns, 3);
        assert!(matches!(
            doc.blocks()[1],
            Block::SectionBreak(SectionBreak { break_type: SectionBreakType::EvenPage, .. })
        ));
        assert_eq!(doc.plain_text(), "one\ntwo");
    }

    #[test]
    fn test_heading_bookmark_and_level() {
        let mut doc = Document::new();
        let heading = doc.add_heading("Intro", 2).unwrap();
        assert_eq!(heading.style.as_deref(), Some("Heading2"));
        assert_eq!(heading.bookmark.as_ref().unwrap().name, "_Toc00000001");
        assert!(doc.add_heading("Too deep", 10).unwrap_err().is_invalid_argument());
        assert!(doc.is_heading_style("Heading2"));
        assert!(!doc.is_heading_style("Normal"));
    }

    #[test]
    fn test_headers_get_distinct_parts() {
        let mut doc = Document::new();
        doc.add_header(HeaderFooterKind::Default, HeaderFooter::with_text("A")).unwrap();
        doc.add_section_break(SectionBreakType::NextPage);
        let footer = doc.add_footer(HeaderFooterKind::First, HeaderFooter::with_text("B")).unwrap();
        assert_eq!(footer.target, "word/footer1.xml");
        doc.add_header(HeaderFooterKind::Default, HeaderFooter::with_text("C")).unwrap();

        let targets: Vec<String> = doc.header_footer_parts().into_keys().collect();
        assert_eq!(targets, vec!["word/footer1.xml", "word/header1.xml", "word/header2.xml"]);
        assert_eq!(doc.relationships().len(), 3);
    }

    #[test]
    fn test_images_share_media_and_relationship() {
        let mut doc = Document::new();
        let png = png_bytes(100, 100);
        let first = doc.add_image(png.clone(), "image/png").unwrap().clone();
        let second = doc.create_image(png, "image/png").unwrap();

        assert_eq!(first.width_emu, 952500);
        assert_eq!(first.height_emu, 952500);
        assert_eq!(first.target, "media/image1.png");
        assert_eq!(first.rel_id, second.rel_id);
        assert_ne!(first.id, second.id);
        assert_eq!(doc.media().len(), 1);
        assert_eq!(doc.relationships().len(), 1);
    }

    #[test]
    fn test_exhausted_image_ids_leave_document_untouched() {
        let mut doc = Document::new();
        doc.ids.observe(IdKind::Image, u32::MAX);
        let err = doc.add_image(png_bytes(4, 4), "image/png").unwrap_err();
        assert!(err.is_invalid_state());
        assert!(doc.blocks().is_empty());
        assert!(doc.media().is_empty());
        assert!(doc.relationships().is_empty());
    }

    #[test]
    fn test_exhausted_header_ids_are_an_error() {
        let mut doc = Document::new();
        doc.ids.observe(PartFamily::Header.id_kind(), u32::MAX);
        let err = doc
            .add_header(HeaderFooterKind::Default, HeaderFooter::with_text("late"))
            .unwrap_err();
        assert!(err.is_invalid_state());
        assert!(doc.current_section().header(HeaderFooterKind::Default).is_none());
    }

    #[test]
    fn test_hyperlink_registers_external_relationship() {
        let mut doc = Document::new();
        let paragraph = doc.add_hyperlink("https://example.com", "Example");
        let field = paragraph.runs[0].hyperlink().unwrap().clone();
        assert_eq!(paragraph.text(), "Example");

        let rel_id = field.property(crate::field::PROP_RELATIONSHIP_ID).unwrap();
        let rel = doc.relationships().get(&rel_id).unwrap();
        assert_eq!(rel.target, "https://example.com");
        assert_eq!(rel.mode, TargetMode::External);
    }

    #[test]
    fn test_update_fields_counts_each_field_once() {
        let mut doc = Document::new();
        let field = Arc::new(Field::new("NUMPAGES"));
        let paragraph = doc.add_paragraph(Paragraph::new());
        paragraph.add_text("a").add_field(field.clone());
        paragraph.add_text("b").add_field(field.clone());
        doc.add_section_break(SectionBreakType::OddPage);
        doc.add_section_break(SectionBreakType::Continuous);
        let mut footer = HeaderFooter::new();
        footer
            .add_paragraph(Paragraph::new())
            .add_text("")
            .add_field(Arc::new(Field::new("PAGE")));
        doc.add_footer(HeaderFooterKind::Default, footer).unwrap();

        assert_eq!(doc.update_fields(), 2);
        assert!(!field.is_dirty());
        assert_eq!(field.result(), "2");
    }

    #[test]
    fn test_add_style_rejects_duplicates() {
        let mut doc = Document::new();
        doc.add_style(Style::paragraph("Quote", "Quote")).unwrap();
        assert!(doc.add_style(Style::paragraph("Quote", "Quote")).unwrap_err().is_invalid_state());
        assert_eq!(doc.custom_styles, vec!["Quote".to_string()]);
    }
}
