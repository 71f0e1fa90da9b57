//! Generic XML element tree
//!
//! Every typed reader in this crate works on an [`XmlElement`] tree rather
//! than on the raw event stream, and the serializer produces the same type.
//! Names are kept exactly as written (`w:p`), while the lookup helpers
//! compare by local name so namespace prefixes never matter on read.
//!
//! ```
//! use quire_docx::xml::{self, XmlElement};
//!
//! let root = xml::parse(br#"<w:p xmlns:w="urn:w"><w:r><w:t>Hi</w:t></w:r></w:p>"#)?;
//! assert_eq!(root.descendant("t").map(|t| t.text.as_str()), Some("Hi"));
//!
//! let built = XmlElement::new("w:b").with_attr("w:val", "0");
//! assert_eq!(built.attr("val"), Some("0"));
//! # Ok::<(), quire_docx::xml::XmlError>(())
//! ```

use std::borrow::Cow;
use std::str::FromStr;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// Errors produced by the tree parser and writer
#[derive(Error, Debug)]
pub enum XmlError {
    /// Tokenizer rejected the input
    #[error("{0}")]
    Syntax(#[from] quick_xml::Error),

    /// Writing the tree failed
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    /// Input held no element at all
    #[error("no root element found")]
    NoRoot,

    /// Input ended while elements were still open
    #[error("unexpected end of input inside <{0}>")]
    Truncated(String),

    /// Closing tag does not match the open element
    #[error("closing tag </{found}> does not match <{expected}>")]
    Mismatched {
        /// Name of the element that was open
        expected: String,
        /// Name found in the closing tag
        found: String,
    },
}

/// A node of the element tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name as written (e.g. `w:p`)
    pub name: String,
    /// Attributes in document order, qualified names as written
    pub attributes: Vec<(String, String)>,
    /// Accumulated character data
    pub text: String,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
}

/// Local part of a qualified name (`w:p` -> `p`)
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

impl XmlElement {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: add an attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Builder: add a child element
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: set the text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Append an attribute
    pub fn push_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    /// Append a child element
    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Local part of this element's name
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Whether the local name equals `local`
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Look up an attribute.
    ///
    /// An exact qualified match wins; otherwise attributes are compared by
    /// local name, so `attr("id")` finds `r:id` and `attr("r:embed")` finds
    /// `embed` under any prefix.
    pub fn attr(&self, name: &str) -> Option<&str> {
        if let Some((_, value)) = self.attributes.iter().find(|(k, _)| k == name) {
            return Some(value);
        }
        let wanted = local_name(name);
        self.attributes
            .iter()
            .find(|(k, _)| local_name(k) == wanted)
            .map(|(_, v)| v.as_str())
    }

    /// Parse an attribute into any `FromStr` type
    pub fn attr_parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.attr(name).and_then(|v| v.trim().parse().ok())
    }

    /// Interpret an attribute as an OOXML boolean (`1`/`true`/`on`)
    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        self.attr(name).map(|v| matches!(v, "1" | "true" | "on"))
    }

    /// First direct child with the given local name
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.is(local))
    }

    /// `val` attribute of the first child with the given local name
    pub fn child_val(&self, local: &str) -> Option<&str> {
        self.child(local).and_then(|c| c.attr("val"))
    }

    /// All direct children with the given local name
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.is(local))
    }

    /// First descendant (depth-first, excluding self) with the given local name
    pub fn descendant(&self, local: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.is(local) {
                return Some(child);
            }
            if let Some(found) = child.descendant(local) {
                return Some(found);
            }
        }
        None
    }

    /// Whether this element has neither text nor children
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.children.is_empty()
    }

    /// Serialize the tree as a standalone XML document
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>, XmlError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        self.write_into(&mut writer)?;
        Ok(writer.into_inner())
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), XmlError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

struct OpenElement {
    element: XmlElement,
    preserve_space: bool,
}

/// Parse XML bytes into a tree rooted at the first element.
///
/// Whitespace-only character data is dropped unless the enclosing element
/// (or an ancestor) declares `xml:space="preserve"`.
pub fn parse(xml: &[u8]) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let inherited = stack.last().map(|o| o.preserve_space).unwrap_or(false);
                let element = element_from_start(e)?;
                let preserve_space = match element.attr("xml:space") {
                    Some(mode) => mode == "preserve",
                    None => inherited,
                };
                stack.push(OpenElement {
                    element,
                    preserve_space,
                });
            }
            Event::Empty(ref e) => {
                let element = element_from_start(e)?;
                match stack.last_mut() {
                    Some(parent) => parent.element.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::End(ref e) => {
                let found = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let Some(open) = stack.pop() else {
                    return Err(XmlError::Mismatched {
                        expected: String::new(),
                        found,
                    });
                };
                if open.element.name != found {
                    return Err(XmlError::Mismatched {
                        expected: open.element.name,
                        found,
                    });
                }
                match stack.last_mut() {
                    Some(parent) => parent.element.children.push(open.element),
                    None => return Ok(open.element),
                }
            }
            Event::Text(ref e) => {
                if let Some(open) = stack.last_mut() {
                    let text = e.unescape()?;
                    append_text(open, &text);
                }
            }
            Event::CData(e) => {
                if let Some(open) = stack.last_mut() {
                    let raw = e.into_inner();
                    let text = String::from_utf8_lossy(&raw);
                    append_text(open, &text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    match stack.pop() {
        Some(open) => Err(XmlError::Truncated(open.element.name)),
        None => Err(XmlError::NoRoot),
    }
}

fn append_text(open: &mut OpenElement, text: &str) {
    if open.preserve_space || !text.chars().all(char::is_whitespace) {
        open.element.text.push_str(text);
    }
}

fn element_from_start(e: &BytesStart) -> Result<XmlElement, XmlError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value: Cow<str> = attr.unescape_value()?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_tree() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
        <w:document xmlns:w="urn:w">
            <w:body>
                <w:p><w:r><w:t>Hello</w:t></w:r></w:p>
                <w:p/>
            </w:body>
        </w:document>"#;

        let root = parse(xml).unwrap();
        assert_eq!(root.name, "w:document");
        let body = root.child("body").unwrap();
        assert_eq!(body.children_named("p").count(), 2);
        assert_eq!(root.descendant("t").unwrap().text, "Hello");
    }

    #[test]
    fn test_whitespace_only_text_dropped() {
        let root = parse(b"<a>\n   <b>  x </b>   </a>").unwrap();
        assert_eq!(root.text, "");
        assert_eq!(root.child("b").unwrap().text, "  x ");
    }

    #[test]
    fn test_preserved_whitespace_kept() {
        let root = parse(br#"<w:r><w:t xml:space="preserve">   </w:t></w:r>"#).unwrap();
        assert_eq!(root.child("t").unwrap().text, "   ");
    }

    #[test]
    fn test_entities_unescaped() {
        let root = parse(br#"<t a="&quot;x&quot;">a &amp; b &#65;</t>"#).unwrap();
        assert_eq!(root.text, "a & b A");
        assert_eq!(root.attr("a"), Some("\"x\""));
    }

    #[test]
    fn test_truncated_input_fails() {
        let err = parse(b"<a><b>text</b>").unwrap_err();
        assert!(matches!(err, XmlError::Truncated(ref name) if name == "a"));
    }

    #[test]
    fn test_mismatched_tags_fail() {
        assert!(parse(b"<a><b></a></b>").is_err());
    }

    #[test]
    fn test_no_root_fails() {
        assert!(matches!(parse(b"<?xml version=\"1.0\"?>"), Err(XmlError::NoRoot)));
    }

    #[test]
    fn test_attr_lookup_by_local_name() {
        let el = XmlElement::new("w:hyperlink")
            .with_attr("r:id", "rId4")
            .with_attr("w:anchor", "top");
        assert_eq!(el.attr("id"), Some("rId4"));
        assert_eq!(el.attr("r:id"), Some("rId4"));
        assert_eq!(el.attr("anchor"), Some("top"));
        assert_eq!(el.attr("missing"), None);
    }

    #[test]
    fn test_attr_helpers() {
        let el = XmlElement::new("w:b")
            .with_attr("w:val", "0")
            .with_attr("w:sz", " 24 ");
        assert_eq!(el.attr_bool("val"), Some(false));
        assert_eq!(el.attr_parse::<u32>("sz"), Some(24));
        assert_eq!(el.attr_parse::<u32>("val"), Some(0));
    }

    #[test]
    fn test_write_then_read_back() {
        let tree = XmlElement::new("w:p")
            .with_attr("xmlns:w", "urn:w")
            .with_child(
                XmlElement::new("w:r").with_child(
                    XmlElement::new("w:t")
                        .with_attr("xml:space", "preserve")
                        .with_text("a < b & \"c\""),
                ),
            )
            .with_child(XmlElement::new("w:bookmarkEnd").with_attr("w:id", "1"));

        let bytes = tree.to_xml_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert!(text.contains("<w:bookmarkEnd w:id=\"1\"/>"));

        let reparsed = parse(&bytes).unwrap();
        assert_eq!(reparsed, tree);
    }
}
