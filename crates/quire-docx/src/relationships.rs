//! Relationship tables (`_rels/*.rels`)
//!
//! Every part that references another part (or an external URL) does so
//! through an id such as `rId4` declared in its relationship table. The table
//! keeps insertion order so written packages are deterministic, and new ids
//! continue after the highest numeric id already present.
//!
//! ```
//! use quire_docx::relationships::{Relationships, TargetMode};
//!
//! let mut rels = Relationships::new();
//! let id = rels.add(Relationships::TYPE_IMAGE, "media/image1.png", TargetMode::Internal);
//! assert_eq!(id, "rId1");
//! assert_eq!(rels.target(&id), Some("media/image1.png"));
//! ```

use std::collections::HashMap;

use crate::error::{DocxError, Result};
use crate::xml::{self, XmlElement};

/// Namespace of a relationship table root
pub const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Whether a target lives inside the package or outside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    #[default]
    Internal,
    External,
}

/// One entry of a relationship table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship id (e.g. `rId3`)
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path (relative to the owning part) or URL
    pub target: String,
    /// Target mode
    pub mode: TargetMode,
}

impl Relationship {
    /// Whether the relationship points at a hyperlink target
    pub fn is_hyperlink(&self) -> bool {
        self.rel_type == Relationships::TYPE_HYPERLINK
    }

    /// Whether the relationship points at an image part
    pub fn is_image(&self) -> bool {
        self.rel_type == Relationships::TYPE_IMAGE
    }
}

/// Relationship type URIs
impl Relationships {
    pub const TYPE_OFFICE_DOCUMENT: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const TYPE_STYLES: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    pub const TYPE_NUMBERING: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
    pub const TYPE_FONT_TABLE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/fontTable";
    pub const TYPE_THEME: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
    pub const TYPE_SETTINGS: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";
    pub const TYPE_WEB_SETTINGS: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/webSettings";
    pub const TYPE_HEADER: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
    pub const TYPE_FOOTER: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
    pub const TYPE_IMAGE: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const TYPE_HYPERLINK: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
    pub const TYPE_CORE_PROPERTIES: &'static str =
        "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
    pub const TYPE_APP_PROPERTIES: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
    pub const TYPE_CUSTOM_PROPERTIES: &'static str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/custom-properties";
}

/// An ordered relationship table
#[derive(Debug, Clone)]
pub struct Relationships {
    order: Vec<String>,
    map: HashMap<String, Relationship>,
    /// Wider than the parsed ids so the sequence cannot run out
    next_id_counter: u64,
}

impl Default for Relationships {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            map: HashMap::new(),
            next_id_counter: 1,
        }
    }
}

impl Relationships {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `.rels` part; `part` names it in errors
    pub fn parse(bytes: &[u8], part: &str) -> Result<Self> {
        let root = xml::parse(bytes).map_err(DocxError::parse(part))?;

        let mut rels = Self::new();
        for entry in root.children_named("Relationship") {
            let (Some(id), Some(target)) = (entry.attr("Id"), entry.attr("Target")) else {
                log::warn!("{}: skipping relationship without Id or Target", part);
                continue;
            };
            let mode = match entry.attr("TargetMode") {
                Some(m) if m.eq_ignore_ascii_case("external") => TargetMode::External,
                _ => TargetMode::Internal,
            };
            let rel_type = entry.attr("Type").unwrap_or_default();
            if rels.register_existing(id, rel_type, target, mode).is_err() {
                log::warn!("{}: duplicate relationship id {}", part, id);
            }
        }
        Ok(rels)
    }

    /// Add a relationship under a freshly generated id
    pub fn add(&mut self, rel_type: &str, target: &str, mode: TargetMode) -> String {
        let mut id = format!("rId{}", self.next_id_counter);
        while self.map.contains_key(&id) {
            self.next_id_counter += 1;
            id = format!("rId{}", self.next_id_counter);
        }
        self.next_id_counter += 1;
        self.insert(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            mode,
        });
        id
    }

    /// Register a relationship under an id that already exists in a source package.
    ///
    /// Later generated ids continue after the highest numeric id seen.
    pub fn register_existing(
        &mut self,
        id: &str,
        rel_type: &str,
        target: &str,
        mode: TargetMode,
    ) -> Result<()> {
        if self.map.contains_key(id) {
            return Err(DocxError::invalid_state(
                "register_existing",
                format!("relationship id {} is already registered", id),
            ));
        }
        if let Some(num) = extract_id_number(id) {
            self.next_id_counter = self.next_id_counter.max(u64::from(num).saturating_add(1));
        }
        self.insert(Relationship {
            id: id.to_string(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            mode,
        });
        Ok(())
    }

    fn insert(&mut self, rel: Relationship) {
        self.order.push(rel.id.clone());
        self.map.insert(rel.id.clone(), rel);
    }

    /// Look up a relationship by id
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.map.get(id)
    }

    /// Target of a relationship by id
    pub fn target(&self, id: &str) -> Option<&str> {
        self.map.get(id).map(|r| r.target.as_str())
    }

    /// First relationship of the given type
    pub fn find_by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.all().find(|r| r.rel_type == rel_type)
    }

    /// Relationship of the given type pointing at `target`, if any
    pub fn find(&self, rel_type: &str, target: &str) -> Option<&Relationship> {
        self.all()
            .find(|r| r.rel_type == rel_type && r.target == target)
    }

    /// All relationships in insertion order
    pub fn all(&self) -> impl Iterator<Item = &Relationship> {
        self.order.iter().filter_map(|id| self.map.get(id))
    }

    /// Number of relationships
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Build the `Relationships` tree
    pub fn to_element(&self) -> XmlElement {
        let mut root = XmlElement::new("Relationships").with_attr("xmlns", RELATIONSHIPS_NS);
        for rel in self.all() {
            let mut entry = XmlElement::new("Relationship")
                .with_attr("Id", rel.id.as_str())
                .with_attr("Type", rel.rel_type.as_str())
                .with_attr("Target", rel.target.as_str());
            if rel.mode == TargetMode::External {
                entry.push_attr("TargetMode", "External");
            }
            root.push(entry);
        }
        root
    }

    /// Serialize to `.rels` XML bytes
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        self.to_element()
            .to_xml_bytes()
            .map_err(DocxError::serialize("relationships"))
    }
}

/// Numeric part of an id (`rId5` -> 5)
fn extract_id_number(id: &str) -> Option<u32> {
    let digits = id
        .strip_prefix("rId")
        .or_else(|| id.strip_prefix("RId"))
        .or_else(|| id.strip_prefix("rid"))?;
    digits.parse().ok()
}
