//! Content-type manifest (`[Content_Types].xml`)
//!
//! The manifest maps file extensions to default content types and overrides
//! individual parts by absolute path. Lookups are case-insensitive.

use std::collections::BTreeMap;

use crate::error::{DocxError, Result};
use crate::package::normalize_path;
use crate::xml::{self, XmlElement};

/// Path of the manifest inside the archive
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Namespace of the manifest root element
pub const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Content type constants for the parts this crate reads and writes
pub mod types {
    pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
    pub const XML: &str = "application/xml";
    pub const DOCUMENT: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
    pub const STYLES: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
    pub const NUMBERING: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";
    pub const FONT_TABLE: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.fontTable+xml";
    pub const SETTINGS: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml";
    pub const WEB_SETTINGS: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.webSettings+xml";
    pub const HEADER: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
    pub const FOOTER: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml";
    pub const THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
    pub const CORE_PROPERTIES: &str = "application/vnd.openxmlformats-package.core-properties+xml";
    pub const APP_PROPERTIES: &str =
        "application/vnd.openxmlformats-officedocument.extended-properties+xml";
    pub const CUSTOM_PROPERTIES: &str =
        "application/vnd.openxmlformats-officedocument.custom-properties+xml";
}

/// Parsed or to-be-written content-type manifest
#[derive(Debug, Clone, Default)]
pub struct ContentTypes {
    /// Lowercase extension -> content type
    defaults: BTreeMap<String, String>,
    /// Normalized part path -> (part name as written, content type)
    overrides: BTreeMap<String, (String, String)>,
}

impl ContentTypes {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the manifest from XML bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let root = xml::parse(bytes).map_err(DocxError::parse(CONTENT_TYPES_PATH))?;
        if !root.is("Types") {
            return Err(DocxError::InvalidStructure(format!(
                "{} has root <{}>, expected <Types>",
                CONTENT_TYPES_PATH, root.name
            )));
        }

        let mut manifest = Self::new();
        for entry in &root.children {
            match entry.local_name() {
                "Default" => {
                    if let (Some(ext), Some(ct)) = (entry.attr("Extension"), entry.attr("ContentType")) {
                        manifest.add_default(ext, ct);
                    }
                }
                "Override" => {
                    if let (Some(part), Some(ct)) = (entry.attr("PartName"), entry.attr("ContentType")) {
                        manifest.add_override(part, ct);
                    }
                }
                _ => {}
            }
        }
        Ok(manifest)
    }

    /// Register a default content type for an extension
    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        self.defaults.insert(
            extension.trim_start_matches('.').to_ascii_lowercase(),
            content_type.to_string(),
        );
    }

    /// Register an override for a single part
    pub fn add_override(&mut self, part_name: &str, content_type: &str) {
        let written = format!("/{}", part_name.trim_start_matches('/'));
        self.overrides
            .insert(normalize_path(part_name), (written, content_type.to_string()));
    }

    /// Content type registered as default for an extension
    pub fn default_for(&self, extension: &str) -> Option<&str> {
        self.defaults
            .get(&extension.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Content type for a part: explicit override first, extension default second
    pub fn content_type_for(&self, path: &str) -> Option<&str> {
        let normalized = normalize_path(path);
        if let Some((_, ct)) = self.overrides.get(&normalized) {
            return Some(ct);
        }
        let ext = normalized.rsplit_once('.').map(|(_, e)| e)?;
        self.defaults.get(ext).map(String::as_str)
    }

    /// Whether any override is registered for the path
    pub fn has_override(&self, path: &str) -> bool {
        self.overrides.contains_key(&normalize_path(path))
    }

    /// Number of defaults and overrides
    pub fn len(&self) -> usize {
        self.defaults.len() + self.overrides.len()
    }

    /// Whether the manifest is empty
    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty() && self.overrides.is_empty()
    }

    /// Build the manifest tree
    pub fn to_element(&self) -> XmlElement {
        let mut root = XmlElement::new("Types").with_attr("xmlns", CONTENT_TYPES_NS);
        for (ext, ct) in &self.defaults {
            root.push(
                XmlElement::new("Default")
                    .with_attr("Extension", ext.as_str())
                    .with_attr("ContentType", ct.as_str()),
            );
        }
        for (written, ct) in self.overrides.values() {
            root.push(
                XmlElement::new("Override")
                    .with_attr("PartName", written.as_str())
                    .with_attr("ContentType", ct.as_str()),
            );
        }
        root
    }
}
