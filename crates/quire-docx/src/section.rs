//! Sections: page geometry plus headers and footers
//!
//! All measurements are in twips (1/20 pt, 1440 per inch).

use std::collections::BTreeMap;

use crate::error::{DocxError, Result};
use crate::paragraph::Paragraph;
use crate::relationships::Relationships;

/// Largest page dimension Word accepts (22 inches)
pub const MAX_PAGE_TWIPS: u32 = 31680;

/// Most text columns a section may have
pub const MAX_COLUMNS: u32 = 45;

/// Page size in twips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

impl PageSize {
    /// US Letter, portrait
    pub const LETTER: PageSize = PageSize {
        width: 12240,
        height: 15840,
    };

    /// ISO A4, portrait
    pub const A4: PageSize = PageSize {
        width: 11906,
        height: 16838,
    };

    /// Same size with width and height exchanged
    pub fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page margins in twips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMargins {
    pub top: i32,
    pub right: u32,
    pub bottom: i32,
    pub left: u32,
    pub header: u32,
    pub footer: u32,
    pub gutter: u32,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self {
            top: 1440,
            right: 1440,
            bottom: 1440,
            left: 1440,
            header: 720,
            footer: 720,
            gutter: 0,
        }
    }
}

/// Which pages a header or footer applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderFooterKind {
    Default,
    First,
    Even,
}

impl HeaderFooterKind {
    pub fn from_val(val: &str) -> Option<Self> {
        match val {
            "default" => Some(Self::Default),
            "first" => Some(Self::First),
            "even" => Some(Self::Even),
            _ => None,
        }
    }

    pub fn as_val(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::First => "first",
            Self::Even => "even",
        }
    }
}

/// How the section following a break starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionBreakType {
    #[default]
    NextPage,
    Continuous,
    EvenPage,
    OddPage,
}

impl SectionBreakType {
    pub fn from_val(val: &str) -> Option<Self> {
        match val {
            "nextPage" => Some(Self::NextPage),
            "continuous" => Some(Self::Continuous),
            "evenPage" => Some(Self::EvenPage),
            "oddPage" => Some(Self::OddPage),
            _ => None,
        }
    }

    pub fn as_val(&self) -> &'static str {
        match self {
            Self::NextPage => "nextPage",
            Self::Continuous => "continuous",
            Self::EvenPage => "evenPage",
            Self::OddPage => "oddPage",
        }
    }

    /// Whether the break starts a new page
    pub fn starts_page(&self) -> bool {
        !matches!(self, Self::Continuous)
    }
}

/// Content of one header or footer part
#[derive(Debug, Clone, Default)]
pub struct HeaderFooter {
    pub paragraphs: Vec<Paragraph>,
    /// Relationship id in the main document part
    pub rel_id: Option<String>,
    /// Part path (e.g. `word/header1.xml`)
    pub target: String,
    /// The part's own relationship table
    pub relationships: Relationships,
}

impl HeaderFooter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header or footer holding a single line of text
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            paragraphs: vec![Paragraph::with_text(text)],
            ..Self::default()
        }
    }

    pub fn add_paragraph(&mut self, paragraph: Paragraph) -> &mut Paragraph {
        self.paragraphs.push(paragraph);
        let last = self.paragraphs.len() - 1;
        &mut self.paragraphs[last]
    }

    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Page setup shared by a run of blocks
#[derive(Debug, Clone)]
pub struct Section {
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub margins: PageMargins,
    /// Number of text columns
    pub columns: u32,
    /// Space between columns in twips
    pub column_spacing: Option<u32>,
    pub headers: BTreeMap<HeaderFooterKind, HeaderFooter>,
    pub footers: BTreeMap<HeaderFooterKind, HeaderFooter>,
}

impl Default for Section {
    fn default() -> Self {
        Self::with_page(PageSize::LETTER)
    }
}

impl Section {
    /// Letter portrait section
    pub fn new() -> Self {
        Self::default()
    }

    /// Portrait section with the given page size
    pub fn with_page(page_size: PageSize) -> Self {
        Self {
            page_size,
            orientation: Orientation::Portrait,
            margins: PageMargins::default(),
            columns: 1,
            column_spacing: None,
            headers: BTreeMap::new(),
            footers: BTreeMap::new(),
        }
    }

    /// Set the page size in twips
    pub fn set_page_size(&mut self, width: u32, height: u32) -> Result<()> {
        for (what, value) in [("width", width), ("height", height)] {
            if value == 0 || value > MAX_PAGE_TWIPS {
                return Err(DocxError::invalid_argument(
                    "set page size",
                    format!("page {} {} twips is outside 1..={}", what, value, MAX_PAGE_TWIPS),
                ));
            }
        }
        self.page_size = PageSize { width, height };
        Ok(())
    }

    /// Set the orientation, swapping width and height when they disagree with it
    pub fn set_orientation(&mut self, orientation: Orientation) {
        let landscape_shape = self.page_size.width > self.page_size.height;
        let wants_landscape = orientation == Orientation::Landscape;
        if landscape_shape != wants_landscape && self.page_size.width != self.page_size.height {
            self.page_size = self.page_size.swapped();
        }
        self.orientation = orientation;
    }

    /// Set the number of text columns
    pub fn set_columns(&mut self, columns: u32) -> Result<()> {
        if columns == 0 || columns > MAX_COLUMNS {
            return Err(DocxError::invalid_argument(
                "set columns",
                format!("{} columns is outside 1..={}", columns, MAX_COLUMNS),
            ));
        }
        self.columns = columns;
        Ok(())
    }

    pub fn set_margins(&mut self, margins: PageMargins) -> Result<()> {
        let horizontal = margins.left + margins.right + margins.gutter;
        if horizontal >= self.page_size.width {
            return Err(DocxError::invalid_argument(
                "set margins",
                format!(
                    "left + right + gutter ({}) leave no room on a {} twip wide page",
                    horizontal, self.page_size.width
                ),
            ));
        }
        self.margins = margins;
        Ok(())
    }

    pub fn header(&self, kind: HeaderFooterKind) -> Option<&HeaderFooter> {
        self.headers.get(&kind)
    }

    pub fn footer(&self, kind: HeaderFooterKind) -> Option<&HeaderFooter> {
        self.footers.get(&kind)
    }

    /// Whether a first-page header or footer is present (`w:titlePg`)
    pub fn has_title_page(&self) -> bool {
        self.headers.contains_key(&HeaderFooterKind::First)
            || self.footers.contains_key(&HeaderFooterKind::First)
    }
}
