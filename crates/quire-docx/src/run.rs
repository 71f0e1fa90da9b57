//! Runs: stretches of text sharing one character format

use std::sync::Arc;

use crate::field::Field;
use crate::image::Image;

/// Break marker inside a run (`<w:br w:type="..."/>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakType {
    #[default]
    Line,
    Page,
    Column,
}

impl BreakType {
    /// Parse a `w:type` value; absent, `textWrapping` and `cr` all mean a line break
    pub fn from_val(val: Option<&str>) -> Self {
        match val {
            Some("page") => Self::Page,
            Some("column") => Self::Column,
            _ => Self::Line,
        }
    }

    /// `w:type` value to write, `None` for a plain line break
    pub fn as_val(&self) -> Option<&'static str> {
        match self {
            Self::Line => None,
            Self::Page => Some("page"),
            Self::Column => Some("column"),
        }
    }
}

/// Underline style (`<w:u w:val="..."/>`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    Double,
    Thick,
    Dotted,
    Dash,
    Wave,
    Words,
    /// Any other ST_Underline value, kept verbatim
    Other(String),
}

impl UnderlineStyle {
    pub fn from_val(val: &str) -> Self {
        match val {
            "none" => Self::None,
            "single" => Self::Single,
            "double" => Self::Double,
            "thick" => Self::Thick,
            "dotted" => Self::Dotted,
            "dash" => Self::Dash,
            "wave" => Self::Wave,
            "words" => Self::Words,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_val(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Single => "single",
            Self::Double => "double",
            Self::Thick => "thick",
            Self::Dotted => "dotted",
            Self::Dash => "dash",
            Self::Wave => "wave",
            Self::Words => "words",
            Self::Other(val) => val,
        }
    }
}

/// Font names for the three script slots of `<w:rFonts>`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FontTriple {
    pub ascii: Option<String>,
    pub h_ansi: Option<String>,
    pub cs: Option<String>,
}

impl FontTriple {
    /// Same font in every slot
    pub fn uniform(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            ascii: Some(name.clone()),
            h_ansi: Some(name.clone()),
            cs: Some(name),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ascii.is_none() && self.h_ansi.is_none() && self.cs.is_none()
    }
}

/// Character formatting of a run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunFormat {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub underline: UnderlineStyle,
    /// Hex RGB without `#` (e.g. `FF0000`)
    pub color: Option<String>,
    /// Size in half-points
    pub size: Option<u32>,
    pub fonts: FontTriple,
    /// Highlight color name (e.g. `yellow`)
    pub highlight: Option<String>,
    /// Character style id
    pub style: Option<String>,
}

/// A run of text
#[derive(Debug, Clone, Default)]
pub struct Run {
    /// Text; `\t` stands for a tab and `\n` for a line break to be split out on write
    pub text: String,
    /// Break markers following the text
    pub breaks: Vec<BreakType>,
    pub format: RunFormat,
    /// At most one drawing
    pub image: Option<Image>,
    /// Fields carried by this run
    pub fields: Vec<Arc<Field>>,
}

impl Run {
    /// Create a plain run
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Create a run holding only an image
    pub fn with_image(image: Image) -> Self {
        Self {
            image: Some(image),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bold(&self) -> bool {
        self.format.bold
    }

    pub fn italic(&self) -> bool {
        self.format.italic
    }

    pub fn strike(&self) -> bool {
        self.format.strike
    }

    pub fn set_bold(&mut self, on: bool) -> &mut Self {
        self.format.bold = on;
        self
    }

    pub fn set_italic(&mut self, on: bool) -> &mut Self {
        self.format.italic = on;
        self
    }

    pub fn set_strike(&mut self, on: bool) -> &mut Self {
        self.format.strike = on;
        self
    }

    pub fn set_underline(&mut self, style: UnderlineStyle) -> &mut Self {
        self.format.underline = style;
        self
    }

    /// Set the color as hex RGB; a leading `#` is dropped
    pub fn set_color(&mut self, hex: &str) -> &mut Self {
        self.format.color = Some(hex.trim_start_matches('#').to_ascii_uppercase());
        self
    }

    /// Set the size in points (stored as half-points)
    pub fn set_size_pt(&mut self, points: f32) -> &mut Self {
        self.format.size = Some((points * 2.0).round().max(1.0) as u32);
        self
    }

    pub fn set_font(&mut self, name: &str) -> &mut Self {
        self.format.fonts = FontTriple::uniform(name);
        self
    }

    pub fn set_highlight(&mut self, color: &str) -> &mut Self {
        self.format.highlight = Some(color.to_string());
        self
    }

    pub fn set_style(&mut self, style_id: &str) -> &mut Self {
        self.format.style = Some(style_id.to_string());
        self
    }

    pub fn add_break(&mut self, kind: BreakType) -> &mut Self {
        self.breaks.push(kind);
        self
    }

    pub fn add_field(&mut self, field: Arc<Field>) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// Whether the run carries nothing worth writing
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.breaks.is_empty() && self.image.is_none() && self.fields.is_empty()
    }

    /// Hyperlink field carried by this run, if any
    pub fn hyperlink(&self) -> Option<&Arc<Field>> {
        self.fields.iter().find(|f| f.is_hyperlink())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_type_values() {
        assert_eq!(BreakType::from_val(None), BreakType::Line);
        assert_eq!(BreakType::from_val(Some("cr")), BreakType::Line);
        assert_eq!(BreakType::from_val(Some("textWrapping")), BreakType::Line);
        assert_eq!(BreakType::from_val(Some("page")), BreakType::Page);
        assert_eq!(BreakType::Column.as_val(), Some("column"));
        assert_eq!(BreakType::Line.as_val(), None);
    }

    #[test]
    fn test_underline_values() {
        assert_eq!(UnderlineStyle::from_val("double"), UnderlineStyle::Double);
        assert_eq!(
            UnderlineStyle::from_val("dashDotHeavy"),
            UnderlineStyle::Other("dashDotHeavy".to_string())
        );
        assert_eq!(UnderlineStyle::Other("wavyDouble".into()).as_val(), "wavyDouble");
    }

    #[test]
    fn test_setters() {
        let mut run = Run::new("Hello, reader!");
        run.set_bold(true).set_color("#ff0000").set_size_pt(10.5).set_font("Consolas");
        assert!(run.bold());
        assert_eq!(run.text(), "Hello, reader!");
        assert_eq!(run.format.color.as_deref(), Some("FF0000"));
        assert_eq!(run.format.size, Some(21));
        assert_eq!(run.format.fonts.cs.as_deref(), Some("Consolas"));
    }

    #[test]
    fn test_emptiness() {
        let mut run = Run::default();
        assert!(run.is_empty());
        run.add_break(BreakType::Page);
        assert!(!run.is_empty());

        let mut carrier = Run::default();
        carrier.add_field(Arc::new(Field::new("PAGE")));
        assert!(!carrier.is_empty());
        assert!(carrier.hyperlink().is_none());
    }
}
