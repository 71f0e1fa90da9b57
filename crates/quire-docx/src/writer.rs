//! Archive writer
//!
//! Collects every part of a document, registers its content type and
//! relationships, and writes the ZIP container. Entries are written in path
//! order so the output is deterministic.

use std::collections::BTreeMap;
use std::io::{Seek, Write};

use chrono::Utc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::Compression;
use crate::content_types::{types, ContentTypes, CONTENT_TYPES_PATH};
use crate::document::{Document, PartFamily};
use crate::error::{DocxError, Result};
use crate::package::{
    normalize_path, rels_path_for, CUSTOM_PROPERTIES_PATH, DEFAULT_DOCUMENT_PATH, FONT_TABLE_PATH,
    ROOT_RELS_PATH, STYLES_PATH,
};
use crate::properties::app_properties_element;
use crate::relationships::{Relationships, TargetMode};
use crate::serialize::{self, document_relative, SerializeContext, W_NS};
use crate::xml::XmlElement;

const FONT_TABLE_PART: &str = "word/fontTable.xml";
const THEME_PART: &str = "word/theme/theme1.xml";
const CORE_PART: &str = "docProps/core.xml";
const APP_PART: &str = "docProps/app.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// Parts collected for one archive, keyed by normalized path
struct PartSet {
    entries: BTreeMap<String, (String, Vec<u8>)>,
    content_types: ContentTypes,
}

impl PartSet {
    fn new() -> Self {
        let mut content_types = ContentTypes::new();
        content_types.add_default("rels", types::RELATIONSHIPS);
        content_types.add_default("xml", types::XML);
        Self {
            entries: BTreeMap::new(),
            content_types,
        }
    }

    fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize_path(path))
    }

    /// Add a part; the first part written under a path wins
    fn add(&mut self, path: &str, data: Vec<u8>, content_type: Option<&str>) {
        let key = normalize_path(path);
        if self.entries.contains_key(&key) {
            log::debug!("{} is already written, skipping duplicate", path);
            return;
        }
        if let Some(ct) = content_type {
            if self.content_types.content_type_for(path) != Some(ct) {
                self.content_types.add_override(path, ct);
            }
        }
        self.entries
            .insert(key, (path.trim_start_matches('/').to_string(), data));
    }

    fn add_tree(&mut self, path: &str, tree: &XmlElement, content_type: Option<&str>) -> Result<()> {
        let bytes = tree.to_xml_bytes().map_err(DocxError::serialize(path))?;
        self.add(path, bytes, content_type);
        Ok(())
    }

    /// Register a media default, falling back to an override on a clash
    fn add_media(&mut self, path: &str, extension: &str, data: Vec<u8>, content_type: &str) {
        match self.content_types.default_for(extension) {
            None => self.content_types.add_default(extension, content_type),
            Some(existing) if existing == content_type => {}
            Some(_) => self.content_types.add_override(path, content_type),
        }
        self.add(path, data, None);
    }

    fn finish<W: Write + Seek>(mut self, writer: W, compression: Compression) -> Result<()> {
        let manifest = self.content_types.to_element();
        let bytes = manifest
            .to_xml_bytes()
            .map_err(DocxError::serialize(CONTENT_TYPES_PATH))?;
        self.add(CONTENT_TYPES_PATH, bytes, None);

        let method = match compression {
            Compression::Deflated => CompressionMethod::Deflated,
            Compression::Stored => CompressionMethod::Stored,
        };
        let options = SimpleFileOptions::default().compression_method(method);
        let mut zip = ZipWriter::new(writer);
        for (path, data) in self.entries.values() {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(data)?;
        }
        zip.finish()?;
        log::debug!("wrote {} parts", self.entries.len());
        Ok(())
    }
}

/// Find a relationship by type or add one pointing at `target`
fn ensure(rels: &mut Relationships, rel_type: &str, target: &str) {
    if rels.find_by_type(rel_type).is_none() {
        rels.add(rel_type, target, TargetMode::Internal);
    }
}

/// Write `doc` as a DOCX archive
pub(crate) fn write<W: Write + Seek>(doc: &Document, writer: W) -> Result<()> {
    let mut parts = PartSet::new();
    let mut ctx = SerializeContext::new(&doc.config, doc.field_context());
    let mut rels = doc.relationships.clone();

    let body = ctx.document(doc, &mut rels);
    parts.add_tree(DEFAULT_DOCUMENT_PATH, &body, Some(types::DOCUMENT))?;

    for (family, content) in doc.header_footer_parts().into_values() {
        if content.target.is_empty() {
            log::warn!("{} without a part name is not written", family.prefix());
            continue;
        }
        let mut part_rels = content.relationships.clone();
        let tree = ctx.header_footer(family, content, &doc.media, &mut part_rels);
        let content_type = match family {
            PartFamily::Header => types::HEADER,
            PartFamily::Footer => types::FOOTER,
        };
        parts.add_tree(&content.target, &tree, Some(content_type))?;
        if !part_rels.is_empty() {
            parts.add(&rels_path_for(&content.target), part_rels.to_xml()?, None);
        }
    }

    parts.add(STYLES_PATH, serialize::styles_part(doc)?, Some(types::STYLES));
    ensure(&mut rels, Relationships::TYPE_STYLES, "styles.xml");

    if let Some(numbering) = &doc.numbering {
        parts.add(&numbering.path, numbering.data.clone(), Some(types::NUMBERING));
        ensure(&mut rels, Relationships::TYPE_NUMBERING, &document_relative(&numbering.path));
    }

    for part in &doc.retained {
        parts.add(&part.path, part.data.clone(), part.content_type.as_deref());
    }

    if !parts.contains(FONT_TABLE_PATH) {
        parts.add_tree(FONT_TABLE_PART, &font_table(&doc.config.defaults.font), Some(types::FONT_TABLE))?;
    }
    ensure(&mut rels, Relationships::TYPE_FONT_TABLE, "fontTable.xml");

    if !parts.entries.keys().any(|k| k.starts_with("word/theme/")) {
        parts.add(THEME_PART, theme(&doc.config.defaults.font).into_bytes(), Some(types::THEME));
    }
    ensure(&mut rels, Relationships::TYPE_THEME, "theme/theme1.xml");

    for entry in doc.media.entries() {
        parts.add_media(&entry.path, entry.extension(), entry.data.to_vec(), &entry.content_type);
    }

    parts.add(DOCUMENT_RELS_PART, rels.to_xml()?, None);

    let core = doc.properties.to_element(Utc::now());
    parts.add_tree(CORE_PART, &core, Some(types::CORE_PROPERTIES))?;
    let app = app_properties_element(&doc.config.writer.application);
    parts.add_tree(APP_PART, &app, Some(types::APP_PROPERTIES))?;

    let mut root_rels = Relationships::new();
    root_rels.add(Relationships::TYPE_OFFICE_DOCUMENT, DEFAULT_DOCUMENT_PATH, TargetMode::Internal);
    root_rels.add(Relationships::TYPE_CORE_PROPERTIES, CORE_PART, TargetMode::Internal);
    root_rels.add(Relationships::TYPE_APP_PROPERTIES, APP_PART, TargetMode::Internal);
    if let Some(custom) = doc.retained.iter().find(|p| normalize_path(&p.path) == CUSTOM_PROPERTIES_PATH) {
        root_rels.add(Relationships::TYPE_CUSTOM_PROPERTIES, &custom.path, TargetMode::Internal);
    }
    parts.add(ROOT_RELS_PATH, root_rels.to_xml()?, None);

    parts.finish(writer, doc.config.writer.compression)
}

/// `word/fontTable.xml` naming the default font
fn font_table(font: &str) -> XmlElement {
    XmlElement::new("w:fonts")
        .with_attr("xmlns:w", W_NS)
        .with_child(
            XmlElement::new("w:font")
                .with_attr("w:name", font)
                .with_child(XmlElement::new("w:family").with_attr("w:val", "swiss"))
                .with_child(XmlElement::new("w:pitch").with_attr("w:val", "variable")),
        )
}

/// A minimal Office theme using `font` for body and headings
fn theme(font: &str) -> String {
    let font = font
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme">
  <a:themeElements>
    <a:clrScheme name="Office">
      <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
      <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
      <a:dk2><a:srgbClr val="44546A"/></a:dk2>
      <a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>
      <a:accent1><a:srgbClr val="4472C4"/></a:accent1>
      <a:accent2><a:srgbClr val="ED7D31"/></a:accent2>
      <a:accent3><a:srgbClr val="A5A5A5"/></a:accent3>
      <a:accent4><a:srgbClr val="FFC000"/></a:accent4>
      <a:accent5><a:srgbClr val="5B9BD5"/></a:accent5>
      <a:accent6><a:srgbClr val="70AD47"/></a:accent6>
      <a:hlink><a:srgbClr val="0563C1"/></a:hlink>
      <a:folHlink><a:srgbClr val="954F72"/></a:folHlink>
    </a:clrScheme>
    <a:fontScheme name="Office">
      <a:majorFont><a:latin typeface="{font}"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>
      <a:minorFont><a:latin typeface="{font}"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>
    </a:fontScheme>
    <a:fmtScheme name="Office">
      <a:fillStyleLst>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
      </a:fillStyleLst>
      <a:lnStyleLst>
        <a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
        <a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
        <a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>
      </a:lnStyleLst>
      <a:effectStyleLst>
        <a:effectStyle><a:effectLst/></a:effectStyle>
        <a:effectStyle><a:effectLst/></a:effectStyle>
        <a:effectStyle><a:effectLst/></a:effectStyle>
      </a:effectStyleLst>
      <a:bgFillStyleLst>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
        <a:solidFill><a:schemeClr val="phClr"/></a:solidFill>
      </a:bgFillStyleLst>
    </a:fmtScheme>
  </a:themeElements>
</a:theme>"#,
        font = font
    )
}
