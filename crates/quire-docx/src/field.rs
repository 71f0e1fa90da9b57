//! Fields (page numbers, dates, hyperlinks, ...)
//!
//! A field pairs an instruction (`PAGE`, `DATE \@ "yyyy-MM-dd"`,
//! `HYPERLINK "https://..."`) with the result Word last rendered for it.
//! Fields are shared between runs as `Arc<Field>`; all state lives behind a
//! single mutex so one thread can read a field while another refreshes it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Local, NaiveDateTime};
use parking_lot::Mutex;

/// Property holding a hyperlink URL
pub const PROP_URL: &str = "url";
/// Property holding a hyperlink relationship id
pub const PROP_RELATIONSHIP_ID: &str = "relationshipId";
/// Property holding an in-document bookmark target
pub const PROP_ANCHOR: &str = "anchor";
/// Property holding the text shown for the field
pub const PROP_DISPLAY: &str = "display";

/// Kind of field, derived from the instruction keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    PageNumber,
    PageCount,
    TableOfContents,
    Date,
    Time,
    StyleRef,
    Seq,
    Ref,
    Hyperlink,
    Custom,
}

impl FieldType {
    /// Classify an instruction by its leading keyword
    pub fn classify(code: &str) -> Self {
        let keyword = code.split_whitespace().next().unwrap_or("");
        match keyword.to_ascii_uppercase().as_str() {
            "PAGE" => Self::PageNumber,
            "NUMPAGES" => Self::PageCount,
            "TOC" => Self::TableOfContents,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "STYLEREF" => Self::StyleRef,
            "SEQ" => Self::Seq,
            "REF" => Self::Ref,
            "HYPERLINK" => Self::Hyperlink,
            _ => Self::Custom,
        }
    }

    /// Instruction keyword, `None` for custom fields
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Self::PageNumber => Some("PAGE"),
            Self::PageCount => Some("NUMPAGES"),
            Self::TableOfContents => Some("TOC"),
            Self::Date => Some("DATE"),
            Self::Time => Some("TIME"),
            Self::StyleRef => Some("STYLEREF"),
            Self::Seq => Some("SEQ"),
            Self::Ref => Some("REF"),
            Self::Hyperlink => Some("HYPERLINK"),
            Self::Custom => None,
        }
    }
}

/// Values a field refresh can draw on
#[derive(Debug, Clone)]
pub struct FieldContext {
    /// Page the field is assumed to sit on
    pub page_number: u32,
    /// Total pages
    pub page_count: u32,
    /// Clock used for DATE and TIME
    pub now: NaiveDateTime,
}

impl Default for FieldContext {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_count: 1,
            now: Local::now().naive_local(),
        }
    }
}

#[derive(Debug, Clone)]
struct FieldState {
    field_type: FieldType,
    code: String,
    result: String,
    dirty: bool,
    properties: BTreeMap<String, String>,
}

/// A field instruction with its cached result
pub struct Field {
    state: Mutex<FieldState>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Field")
            .field("type", &state.field_type)
            .field("code", &state.code)
            .field("result", &state.result)
            .field("dirty", &state.dirty)
            .finish()
    }
}

impl Field {
    /// Create a field from an instruction; a fresh field is dirty
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into().trim().to_string();
        let field_type = FieldType::classify(&code);
        let mut properties = BTreeMap::new();
        if field_type == FieldType::Hyperlink {
            let (url, anchor) = parse_hyperlink_instruction(&code);
            if let Some(url) = url {
                properties.insert(PROP_URL.to_string(), url);
            }
            if let Some(anchor) = anchor {
                properties.insert(PROP_ANCHOR.to_string(), anchor);
            }
        }
        Self {
            state: Mutex::new(FieldState {
                field_type,
                code,
                result: String::new(),
                dirty: true,
                properties,
            }),
        }
    }

    /// Create a hyperlink field to an external URL or an internal anchor
    pub fn hyperlink(target: HyperlinkTarget, display: impl Into<String>) -> Self {
        let display = display.into();
        let code = match &target {
            HyperlinkTarget::External { url, .. } => format!("HYPERLINK \"{}\"", url),
            HyperlinkTarget::Anchor(anchor) => format!("HYPERLINK \\l \"{}\"", anchor),
        };
        let field = Self::new(code);
        {
            let mut state = field.state.lock();
            if let HyperlinkTarget::External {
                relationship_id: Some(rel_id),
                ..
            } = &target
            {
                state
                    .properties
                    .insert(PROP_RELATIONSHIP_ID.to_string(), rel_id.clone());
            }
            state
                .properties
                .insert(PROP_DISPLAY.to_string(), display.clone());
            state.result = display;
        }
        field
    }

    pub fn field_type(&self) -> FieldType {
        self.state.lock().field_type
    }

    pub fn code(&self) -> String {
        self.state.lock().code.clone()
    }

    /// Cached result text
    pub fn result(&self) -> String {
        self.state.lock().result.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    pub fn is_hyperlink(&self) -> bool {
        self.field_type() == FieldType::Hyperlink
    }

    pub fn property(&self, key: &str) -> Option<String> {
        self.state.lock().properties.get(key).cloned()
    }

    /// Snapshot of all properties
    pub fn properties(&self) -> BTreeMap<String, String> {
        self.state.lock().properties.clone()
    }

    /// Replace the instruction; re-classifies and marks dirty
    pub fn set_code(&self, code: impl Into<String>) {
        let code = code.into().trim().to_string();
        let mut state = self.state.lock();
        state.field_type = FieldType::classify(&code);
        if state.field_type == FieldType::Hyperlink {
            let (url, anchor) = parse_hyperlink_instruction(&code);
            for (key, value) in [(PROP_URL, url), (PROP_ANCHOR, anchor)] {
                match value {
                    Some(v) => {
                        state.properties.insert(key.to_string(), v);
                    }
                    None => {
                        state.properties.remove(key);
                    }
                }
            }
        }
        state.code = code;
        state.dirty = true;
    }

    /// Set a property; marks dirty
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut state = self.state.lock();
        state.properties.insert(key.into(), value.into());
        state.dirty = true;
    }

    /// Record the result a loaded document carried for this field.
    ///
    /// Also stored as the `display` property; the dirty flag is untouched, so
    /// only hydration calls this.
    pub(crate) fn set_cached_result(&self, result: impl Into<String>) {
        let result = result.into();
        let mut state = self.state.lock();
        state
            .properties
            .insert(PROP_DISPLAY.to_string(), result.clone());
        state.result = result;
    }

    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.state.lock().dirty = dirty;
    }

    /// Recompute the result and clear the dirty flag
    pub fn update(&self, ctx: &FieldContext) {
        let mut state = self.state.lock();
        if let Some(result) = compute_result(&state, ctx) {
            state.result = result;
        }
        state.dirty = false;
    }

    /// Recompute the result but keep the current dirty flag
    pub fn refresh_preserving_dirty(&self, ctx: &FieldContext) {
        let mut state = self.state.lock();
        if let Some(result) = compute_result(&state, ctx) {
            state.result = result;
        }
    }
}

/// Where a hyperlink field points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperlinkTarget {
    /// External URL, optionally already registered as a relationship
    External {
        url: String,
        relationship_id: Option<String>,
    },
    /// Bookmark inside the document
    Anchor(String),
}

fn compute_result(state: &FieldState, ctx: &FieldContext) -> Option<String> {
    match state.field_type {
        FieldType::PageNumber => Some(ctx.page_number.to_string()),
        FieldType::PageCount => Some(ctx.page_count.to_string()),
        FieldType::Date => {
            let picture = picture_switch(&state.code).unwrap_or_else(|| "M/d/yyyy".to_string());
            Some(format_picture(&picture, &ctx.now))
        }
        FieldType::Time => {
            let picture = picture_switch(&state.code).unwrap_or_else(|| "h:mm am/pm".to_string());
            Some(format_picture(&picture, &ctx.now))
        }
        FieldType::Hyperlink => state
            .properties
            .get(PROP_DISPLAY)
            .or_else(|| state.properties.get(PROP_URL))
            .or_else(|| state.properties.get(PROP_ANCHOR))
            .cloned(),
        // Need page layout or document-wide numbering; the cached result stands.
        FieldType::TableOfContents
        | FieldType::StyleRef
        | FieldType::Seq
        | FieldType::Ref
        | FieldType::Custom => None,
    }
}

/// Split an instruction into words, keeping quoted strings together
fn tokenize(code: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in code.chars() {
        match ch {
            '"' => {
                if quoted {
                    tokens.push(std::mem::take(&mut current));
                } else if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = !quoted;
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// URL and `\l` anchor of a HYPERLINK instruction
fn parse_hyperlink_instruction(code: &str) -> (Option<String>, Option<String>) {
    let tokens = tokenize(code);
    let mut url = None;
    let mut anchor = None;
    let mut iter = tokens.iter().skip(1);
    while let Some(token) = iter.next() {
        if token.eq_ignore_ascii_case("\\l") {
            anchor = iter.next().cloned();
        } else if token.starts_with('\\') {
            // Other switches (\o tooltip, \t frame) carry one argument
            if matches!(token.to_ascii_lowercase().as_str(), "\\o" | "\\t" | "\\m") {
                iter.next();
            }
        } else if url.is_none() {
            url = Some(token.clone());
        }
    }
    (url, anchor)
}

/// Argument of the `\@` date/time picture switch
fn picture_switch(code: &str) -> Option<String> {
    let tokens = tokenize(code);
    let pos = tokens.iter().position(|t| t == "\\@")?;
    tokens.get(pos + 1).cloned()
}

/// Render a Word date/time picture (`dd MMMM yyyy`, `HH:mm`, ...)
pub(crate) fn format_picture(picture: &str, at: &NaiveDateTime) -> String {
    let mut fmt = String::new();
    let chars: Vec<char> = picture.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        match c {
            '\'' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&x| x == '\'')
                    .map(|p| i + 1 + p)
                    .unwrap_or(chars.len());
                for &lit in &chars[i + 1..end] {
                    push_literal(&mut fmt, lit);
                }
                i = end + 1;
                continue;
            }
            'y' => fmt.push_str(if run >= 4 { "%Y" } else { "%y" }),
            'M' => fmt.push_str(match run {
                1 => "%-m",
                2 => "%m",
                3 => "%b",
                _ => "%B",
            }),
            'd' => fmt.push_str(match run {
                1 => "%-d",
                2 => "%d",
                3 => "%a",
                _ => "%A",
            }),
            'H' => fmt.push_str(if run >= 2 { "%H" } else { "%-H" }),
            'h' => fmt.push_str(if run >= 2 { "%I" } else { "%-I" }),
            'm' => fmt.push_str(if run >= 2 { "%M" } else { "%-M" }),
            's' => fmt.push_str(if run >= 2 { "%S" } else { "%-S" }),
            'a' | 'A' if is_am_pm(&chars[i..]) => {
                fmt.push_str(if c == 'A' { "%p" } else { "%P" });
                i += 5;
                continue;
            }
            _ => {
                for _ in 0..run {
                    push_literal(&mut fmt, c);
                }
            }
        }
        i += run;
    }
    at.format(&fmt).to_string()
}

fn is_am_pm(rest: &[char]) -> bool {
    let candidate: String = rest.iter().take(5).collect();
    candidate.eq_ignore_ascii_case("am/pm")
}

fn push_literal(fmt: &mut String, c: char) {
    if c == '%' {
        fmt.push_str("%%");
    } else {
        fmt.push(c);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::NaiveDate;

    use super::*;

    fn fixed_context() -> FieldContext {
        FieldContext {
            page_number: 3,
            page_count: 9,
            now: NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(14, 7, 9)
                .unwrap(),
        }
    }

    #[test]
    fn test_classify_keywords() {
        assert_eq!(FieldType::classify(" PAGE "), FieldType::PageNumber);
        assert_eq!(FieldType::classify("NUMPAGES \\* Arabic"), FieldType::PageCount);
        assert_eq!(FieldType::classify("TOC \\o \"1-3\""), FieldType::TableOfContents);
        assert_eq!(FieldType::classify("date"), FieldType::Date);
        assert_eq!(FieldType::classify("STYLEREF \"Heading 1\""), FieldType::StyleRef);
        assert_eq!(FieldType::classify("SEQ Figure"), FieldType::Seq);
        assert_eq!(FieldType::classify("REF _Ref123"), FieldType::Ref);
        assert_eq!(FieldType::classify("PAGEREF _Toc1"), FieldType::Custom);
        assert_eq!(FieldType::classify(""), FieldType::Custom);
    }

    #[test]
    fn test_fresh_field_is_dirty_and_update_clears() {
        let field = Field::new("PAGE");
        assert!(field.is_dirty());
        assert_eq!(field.result(), "");

        field.update(&fixed_context());
        assert!(!field.is_dirty());
        assert_eq!(field.result(), "3");
    }

    #[test]
    fn test_mutations_mark_dirty() {
        let field = Field::new("PAGE");
        field.update(&fixed_context());

        field.set_code("NUMPAGES");
        assert!(field.is_dirty());
        assert_eq!(field.field_type(), FieldType::PageCount);

        field.update(&fixed_context());
        assert_eq!(field.result(), "9");
        field.set_property("format", "roman");
        assert!(field.is_dirty());
    }

    #[test]
    fn test_refresh_preserving_dirty() {
        let field = Field::new("PAGE");
        field.refresh_preserving_dirty(&fixed_context());
        assert_eq!(field.result(), "3");
        assert!(field.is_dirty());

        let clean = Field::new("NUMPAGES");
        clean.set_dirty(false);
        clean.refresh_preserving_dirty(&fixed_context());
        assert!(!clean.is_dirty());
    }

    #[test]
    fn test_uncomputable_result_kept() {
        let field = Field::new("TOC \\o \"1-3\" \\h");
        field.set_cached_result("Table of contents");
        field.update(&fixed_context());
        assert_eq!(field.result(), "Table of contents");
        assert_eq!(field.property(PROP_DISPLAY).as_deref(), Some("Table of contents"));
    }

    #[test]
    fn test_cached_result_keeps_loaded_state() {
        let field = Field::new("REF _Ref12 \\h");
        field.set_dirty(false);
        field.set_cached_result("Figure 2");
        assert!(!field.is_dirty());
        assert_eq!(field.result(), "Figure 2");

        field.set_property(PROP_DISPLAY, "Figure 3");
        assert!(field.is_dirty());
    }

    #[test]
    fn test_hyperlink_instruction_parsing() {
        let field = Field::new("HYPERLINK \"https://example.com\" \\l \"section-2\"");
        assert!(field.is_hyperlink());
        assert_eq!(field.property(PROP_URL).as_deref(), Some("https://example.com"));
        assert_eq!(field.property(PROP_ANCHOR).as_deref(), Some("section-2"));

        let anchor_only = Field::new("HYPERLINK \\l \"_Toc1\"");
        assert_eq!(anchor_only.property(PROP_URL), None);
        assert_eq!(anchor_only.property(PROP_ANCHOR).as_deref(), Some("_Toc1"));

        let with_tooltip = Field::new("HYPERLINK \\o \"tip\" \"https://a.b\"");
        assert_eq!(with_tooltip.property(PROP_URL).as_deref(), Some("https://a.b"));
    }

    #[test]
    fn test_hyperlink_constructor() {
        let field = Field::hyperlink(
            HyperlinkTarget::External {
                url: "https://example.com".to_string(),
                relationship_id: Some("rId9".to_string()),
            },
            "Example",
        );
        assert_eq!(field.code(), "HYPERLINK \"https://example.com\"");
        assert_eq!(field.property(PROP_RELATIONSHIP_ID).as_deref(), Some("rId9"));
        assert_eq!(field.result(), "Example");

        field.update(&fixed_context());
        assert_eq!(field.result(), "Example");
    }

    #[test]
    fn test_date_picture_formats() {
        let at = fixed_context().now;
        assert_eq!(format_picture("yyyy-MM-dd", &at), "2024-03-05");
        assert_eq!(format_picture("d MMMM yyyy", &at), "5 March 2024");
        assert_eq!(format_picture("dddd, MMM d", &at), "Tuesday, Mar 5");
        assert_eq!(format_picture("HH:mm:ss", &at), "14:07:09");
        assert_eq!(format_picture("h:mm AM/PM", &at), "2:07 PM");
        assert_eq!(format_picture("'Week' M/d", &at), "Week 3/5");
        assert_eq!(format_picture("100% yy", &at), "100% 24");
    }

    #[test]
    fn test_date_field_uses_picture_switch() {
        let field = Field::new("DATE \\@ \"dd.MM.yyyy\"");
        field.update(&fixed_context());
        assert_eq!(field.result(), "05.03.2024");

        let time = Field::new("TIME");
        time.update(&fixed_context());
        assert_eq!(time.result(), "2:07 pm");
    }

    #[test]
    fn test_shared_across_threads() {
        let field = Arc::new(Field::new("PAGE"));
        let writer = {
            let field = Arc::clone(&field);
            thread::spawn(move || {
                for page in 1..=100 {
                    field.update(&FieldContext {
                        page_number: page,
                        ..fixed_context()
                    });
                }
            })
        };
        for _ in 0..100 {
            let result = field.result();
            assert!(result.is_empty() || result.parse::<u32>().is_ok());
        }
        writer.join().unwrap();
        assert_eq!(field.result(), "100");
        assert!(!field.is_dirty());
    }
}
