//! Paragraphs and their properties

use std::str::FromStr;
use std::sync::Arc;

use crate::error::{DocxError, Result};
use crate::field::Field;
use crate::image::Image;
use crate::run::Run;

/// Highest list level Word supports (`ilvl` 0..=8)
pub const MAX_LIST_LEVEL: u32 = 8;

/// Paragraph justification (`<w:jc>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Distribute,
}

impl Alignment {
    /// Value written to `w:jc`
    pub fn as_val(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "both",
            Self::Distribute => "distribute",
        }
    }
}

impl FromStr for Alignment {
    type Err = DocxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" | "start" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" | "end" => Ok(Self::Right),
            "both" | "justify" => Ok(Self::Justify),
            "distribute" => Ok(Self::Distribute),
            other => Err(DocxError::invalid_argument(
                "parse alignment",
                format!("unknown alignment '{}'", other),
            )),
        }
    }
}

/// Indentation in twips (`<w:ind>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Indentation {
    pub left: Option<i32>,
    pub right: Option<i32>,
    pub first_line: Option<u32>,
    pub hanging: Option<u32>,
}

impl Indentation {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// How `Spacing::line` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRule {
    /// 240ths of a line
    Auto,
    /// At least this many twips
    AtLeast,
    /// Exactly this many twips
    Exact,
}

impl LineRule {
    pub fn from_val(val: &str) -> Option<Self> {
        match val {
            "auto" => Some(Self::Auto),
            "atLeast" => Some(Self::AtLeast),
            "exact" => Some(Self::Exact),
            _ => None,
        }
    }

    pub fn as_val(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::AtLeast => "atLeast",
            Self::Exact => "exact",
        }
    }
}

/// Spacing in twips (`<w:spacing>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Spacing {
    pub before: Option<u32>,
    pub after: Option<u32>,
    pub line: Option<u32>,
    pub line_rule: Option<LineRule>,
}

impl Spacing {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// List membership (`<w:numPr>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingRef {
    pub num_id: u32,
    /// 0-based level
    pub level: u32,
}

/// Bookmark wrapped around a paragraph's runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub id: u32,
    pub name: String,
}

/// A paragraph
#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    /// Paragraph style id
    pub style: Option<String>,
    pub alignment: Option<Alignment>,
    pub indentation: Indentation,
    pub spacing: Spacing,
    pub numbering: Option<NumberingRef>,
    pub runs: Vec<Run>,
    /// Only set on heading paragraphs
    pub bookmark: Option<Bookmark>,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraph with a single plain run
    pub fn with_text(text: impl Into<String>) -> Self {
        let mut para = Self::new();
        para.runs.push(Run::new(text));
        para
    }

    /// Builder: set the style id
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Append a run and return it for further formatting
    pub fn add_run(&mut self, run: Run) -> &mut Run {
        self.runs.push(run);
        let last = self.runs.len() - 1;
        &mut self.runs[last]
    }

    /// Append a plain text run
    pub fn add_text(&mut self, text: impl Into<String>) -> &mut Run {
        self.add_run(Run::new(text))
    }

    /// Set indentation in twips; first-line and hanging indents exclude each other
    pub fn set_indentation(&mut self, indentation: Indentation) -> Result<()> {
        if indentation.first_line.is_some() && indentation.hanging.is_some() {
            return Err(DocxError::invalid_argument(
                "set_indentation",
                "first-line and hanging indentation are mutually exclusive",
            ));
        }
        self.indentation = indentation;
        Ok(())
    }

    /// Set spacing; a line rule needs a line value
    pub fn set_spacing(&mut self, spacing: Spacing) -> Result<()> {
        if spacing.line_rule.is_some() && spacing.line.is_none() {
            return Err(DocxError::invalid_argument(
                "set_spacing",
                "line rule given without a line value",
            ));
        }
        self.spacing = spacing;
        Ok(())
    }

    /// Put the paragraph in a list
    pub fn set_numbering(&mut self, num_id: u32, level: u32) -> Result<()> {
        if level > MAX_LIST_LEVEL {
            return Err(DocxError::invalid_argument(
                "set_numbering",
                format!("level {} exceeds maximum {}", level, MAX_LIST_LEVEL),
            ));
        }
        self.numbering = Some(NumberingRef { num_id, level });
        Ok(())
    }

    /// Concatenated run text
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Heading level from a `HeadingN` / `heading N` style id
    pub fn heading_level(&self) -> Option<u8> {
        self.style.as_deref().and_then(heading_level_of)
    }

    pub fn is_heading(&self) -> bool {
        self.heading_level().is_some()
    }

    /// Images attached to runs
    pub fn images(&self) -> impl Iterator<Item = &Image> {
        self.runs.iter().filter_map(|r| r.image.as_ref())
    }

    /// Fields attached to runs; a field shared by several runs appears once
    pub fn fields(&self) -> Vec<Arc<Field>> {
        let mut out: Vec<Arc<Field>> = Vec::new();
        for field in self.runs.iter().flat_map(|r| r.fields.iter()) {
            if !out.iter().any(|seen| Arc::ptr_eq(seen, field)) {
                out.push(Arc::clone(field));
            }
        }
        out
    }

    /// Whether the paragraph has no runs with content
    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(Run::is_empty)
    }
}

/// Level of a heading style id (`Heading2`, `heading 2`), 1..=9
pub fn heading_level_of(style: &str) -> Option<u8> {
    let lower = style.to_ascii_lowercase();
    let rest = lower.strip_prefix("heading")?.trim_start();
    let level: u8 = rest.parse().ok()?;
    (1..=9).contains(&level).then_some(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_parse() {
        assert_eq!("both".parse::<Alignment>().unwrap(), Alignment::Justify);
        assert_eq!("start".parse::<Alignment>().unwrap(), Alignment::Left);
        let err = "diagonal".parse::<Alignment>().unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(Alignment::Justify.as_val(), "both");
    }

    #[test]
    fn test_heading_detection() {
        assert_eq!(heading_level_of("Heading1"), Some(1));
        assert_eq!(heading_level_of("heading 3"), Some(3));
        assert_eq!(heading_level_of("Heading10"), None);
        assert_eq!(heading_level_of("HeadingX"), None);
        assert_eq!(heading_level_of("Title"), None);
        assert!(Paragraph::new().with_style("Heading2").is_heading());
    }

    #[test]
    fn test_text_concatenates_runs() {
        let mut para = Paragraph::with_text("Hello, ");
        para.add_text("world").set_bold(true);
        assert_eq!(para.text(), "Hello, world");
        assert!(para.runs[1].bold());
    }

    #[test]
    fn test_invalid_mutations_leave_paragraph_unchanged() {
        let mut para = Paragraph::new();
        let err = para
            .set_indentation(Indentation {
                first_line: Some(720),
                hanging: Some(360),
                ..Indentation::default()
            })
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(para.indentation.is_empty());

        assert!(para.set_numbering(1, 9).is_err());
        assert!(para.numbering.is_none());
        para.set_numbering(1, 8).unwrap();
        assert_eq!(para.numbering, Some(NumberingRef { num_id: 1, level: 8 }));

        assert!(para
            .set_spacing(Spacing {
                line_rule: Some(LineRule::Exact),
                ..Spacing::default()
            })
            .is_err());
    }

    #[test]
    fn test_shared_field_listed_once() {
        let field = Arc::new(Field::new("PAGE"));
        let mut para = Paragraph::new();
        para.add_text("a").add_field(Arc::clone(&field));
        para.add_text("b").add_field(Arc::clone(&field));
        assert_eq!(para.fields().len(), 1);
    }
}
