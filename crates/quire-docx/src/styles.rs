//! Style definitions (`word/styles.xml`)
//!
//! Loaded documents keep their original style part; the parsed sheet is used
//! to recognise headings by outline level. Generated documents are written
//! with the built-in catalog plus any styles added by the caller.

use std::collections::{HashMap, HashSet};

use crate::error::{DocxError, Result};
use crate::paragraph::{Indentation, Spacing};
use crate::run::{RunFormat, UnderlineStyle};
use crate::xml;

/// Type of style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleType {
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleType {
    pub fn from_val(val: &str) -> Self {
        match val {
            "character" => Self::Character,
            "table" => Self::Table,
            "numbering" => Self::Numbering,
            _ => Self::Paragraph,
        }
    }

    pub fn as_val(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Character => "character",
            Self::Table => "table",
            Self::Numbering => "numbering",
        }
    }
}

/// A style definition
#[derive(Debug, Clone)]
pub struct Style {
    /// Style id used in `pStyle` / `rStyle` / `tblStyle`
    pub id: String,
    /// Display name
    pub name: String,
    pub style_type: StyleType,
    pub based_on: Option<String>,
    pub next: Option<String>,
    /// Default style of its type (`w:default="1"`)
    pub is_default: bool,
    pub ui_priority: Option<u32>,
    /// Outline level, 0 = Heading 1
    pub outline_level: Option<u8>,
    /// Character formatting
    pub run_format: RunFormat,
    pub spacing: Spacing,
    pub indentation: Indentation,
    /// Keep with the next paragraph
    pub keep_next: bool,
    /// Single borders on every table edge
    pub table_borders: bool,
}

impl Style {
    /// A bare style of the given type
    pub fn new(id: impl Into<String>, name: impl Into<String>, style_type: StyleType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            style_type,
            based_on: None,
            next: None,
            is_default: false,
            ui_priority: None,
            outline_level: None,
            run_format: RunFormat::default(),
            spacing: Spacing::default(),
            indentation: Indentation::default(),
            keep_next: false,
            table_borders: false,
        }
    }

    /// Paragraph style based on `Normal`
    pub fn paragraph(id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut style = Self::new(id, name, StyleType::Paragraph);
        style.based_on = Some("Normal".to_string());
        style
    }

    /// Character style
    pub fn character(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, StyleType::Character)
    }

    fn heading(level: u8) -> Self {
        let mut style = Self::paragraph(format!("Heading{}", level), format!("heading {}", level));
        style.next = Some("Normal".to_string());
        style.ui_priority = Some(9);
        style.outline_level = Some(level - 1);
        style.keep_next = true;
        style.run_format.bold = true;
        style.run_format.size = Some(match level {
            1 => 32,
            2 => 26,
            3 => 24,
            _ => 22,
        });
        style.spacing = Spacing {
            before: Some(if level == 1 { 240 } else { 40 }),
            after: Some(if level == 1 { 60 } else { 0 }),
            ..Spacing::default()
        };
        style
    }
}

/// Collection of styles, in definition order
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    styles: Vec<Style>,
    index: HashMap<String, usize>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a style part
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let root = xml::parse(bytes).map_err(DocxError::parse("word/styles.xml"))?;
        let mut sheet = Self::new();
        for node in root.children_named("style") {
            let Some(id) = node.attr("styleId") else {
                continue;
            };
            let mut style = Style::new(
                id,
                node.child_val("name").unwrap_or(id),
                StyleType::from_val(node.attr("type").unwrap_or("paragraph")),
            );
            style.is_default = node.attr_bool("default").unwrap_or(false);
            style.based_on = node.child_val("basedOn").map(str::to_string);
            style.next = node.child_val("next").map(str::to_string);
            style.ui_priority = node.child("uiPriority").and_then(|p| p.attr_parse("val"));
            style.outline_level = node
                .child("pPr")
                .and_then(|ppr| ppr.child("outlineLvl"))
                .and_then(|lvl| lvl.attr_parse("val"));
            sheet.upsert(style);
        }
        log::debug!("parsed {} styles", sheet.len());
        Ok(sheet)
    }

    /// The catalog used for generated documents
    pub fn builtin() -> Self {
        let mut sheet = Self::new();

        let mut normal = Style::new("Normal", "Normal", StyleType::Paragraph);
        normal.is_default = true;
        normal.ui_priority = Some(0);
        sheet.upsert(normal);

        let mut default_font = Style::character("DefaultParagraphFont", "Default Paragraph Font");
        default_font.is_default = true;
        default_font.ui_priority = Some(1);
        sheet.upsert(default_font);

        let mut title = Style::paragraph("Title", "Title");
        title.next = Some("Normal".to_string());
        title.ui_priority = Some(10);
        title.run_format.size = Some(56);
        sheet.upsert(title);

        for level in 1..=6 {
            sheet.upsert(Style::heading(level));
        }

        let mut hyperlink = Style::character("Hyperlink", "Hyperlink");
        hyperlink.based_on = Some("DefaultParagraphFont".to_string());
        hyperlink.ui_priority = Some(99);
        hyperlink.run_format.color = Some("0563C1".to_string());
        hyperlink.run_format.underline = UnderlineStyle::Single;
        sheet.upsert(hyperlink);

        let mut grid = Style::new("TableGrid", "Table Grid", StyleType::Table);
        grid.ui_priority = Some(39);
        grid.table_borders = true;
        sheet.upsert(grid);

        let mut list = Style::paragraph("ListParagraph", "List Paragraph");
        list.ui_priority = Some(34);
        list.indentation.left = Some(720);
        sheet.upsert(list);

        sheet
    }

    /// Add a style, rejecting ids that are already defined
    pub fn add(&mut self, style: Style) -> Result<()> {
        if style.id.trim().is_empty() {
            return Err(DocxError::invalid_argument("add style", "style id is empty"));
        }
        if self.contains(&style.id) {
            return Err(DocxError::invalid_state(
                "add style",
                format!("style '{}' is already defined", style.id),
            ));
        }
        self.upsert(style);
        Ok(())
    }

    fn upsert(&mut self, style: Style) {
        match self.index.get(&style.id) {
            Some(&idx) => self.styles[idx] = style,
            None => {
                self.index.insert(style.id.clone(), self.styles.len());
                self.styles.push(style);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Style> {
        self.index.get(id).map(|&idx| &self.styles[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All styles in definition order
    pub fn all(&self) -> impl Iterator<Item = &Style> {
        self.styles.iter()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Heading level (1-9) of a style, following `basedOn` for the outline level
    pub fn heading_level(&self, style_id: &str) -> Option<u8> {
        self.resolve_chain(style_id)
            .into_iter()
            .find_map(|s| s.outline_level)
            .filter(|&lvl| lvl < 9)
            .map(|lvl| lvl + 1)
    }

    pub fn is_heading(&self, style_id: &str) -> bool {
        self.heading_level(style_id).is_some()
    }

    /// The style followed by its `basedOn` ancestors
    pub fn resolve_chain(&self, style_id: &str) -> Vec<&Style> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(style_id);
        while let Some(style) = current {
            if !seen.insert(style.id.as_str()) {
                break;
            }
            chain.push(style);
            current = style.based_on.as_deref().and_then(|base| self.get(base));
        }
        chain
    }
}
