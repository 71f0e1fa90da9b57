//! Document properties (`docProps/core.xml`, `docProps/app.xml`)

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{DocxError, Result};
use crate::package::CORE_PROPERTIES_PATH;
use crate::xml::{self, XmlElement};

const CP_NS: &str = "http://schemas.openxmlformats.org/package/2006/metadata/core-properties";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
const DCMITYPE_NS: &str = "http://purl.org/dc/dcmitype/";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const EXTENDED_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties";
const VT_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes";

/// Core document metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
    pub last_modified_by: Option<String>,
    pub revision: Option<u32>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl CoreProperties {
    /// Parse `docProps/core.xml`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let root = xml::parse(bytes).map_err(DocxError::parse(CORE_PROPERTIES_PATH))?;
        let text = |local: &str| {
            root.child(local)
                .map(|e| e.text.trim().to_string())
                .filter(|t| !t.is_empty())
        };
        let date = |local: &str| {
            let raw = text(local)?;
            match DateTime::parse_from_rfc3339(&raw) {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(e) => {
                    log::warn!("ignoring unparsable {} date '{}': {}", local, raw, e);
                    None
                }
            }
        };

        Ok(Self {
            title: text("title"),
            subject: text("subject"),
            creator: text("creator"),
            keywords: text("keywords"),
            description: text("description"),
            last_modified_by: text("lastModifiedBy"),
            revision: text("revision").and_then(|r| r.parse().ok()),
            created: date("created"),
            modified: date("modified"),
        })
    }

    /// Build the `cp:coreProperties` tree; missing dates become `now`
    pub fn to_element(&self, now: DateTime<Utc>) -> XmlElement {
        let mut root = XmlElement::new("cp:coreProperties")
            .with_attr("xmlns:cp", CP_NS)
            .with_attr("xmlns:dc", DC_NS)
            .with_attr("xmlns:dcterms", DCTERMS_NS)
            .with_attr("xmlns:dcmitype", DCMITYPE_NS)
            .with_attr("xmlns:xsi", XSI_NS);

        let fields = [
            ("dc:title", &self.title),
            ("dc:subject", &self.subject),
            ("dc:creator", &self.creator),
            ("cp:keywords", &self.keywords),
            ("dc:description", &self.description),
            ("cp:lastModifiedBy", &self.last_modified_by),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                root.push(XmlElement::new(name).with_text(value.as_str()));
            }
        }
        if let Some(revision) = self.revision {
            root.push(XmlElement::new("cp:revision").with_text(revision.to_string()));
        }
        for (name, value) in [("dcterms:created", self.created), ("dcterms:modified", self.modified)] {
            root.push(
                XmlElement::new(name)
                    .with_attr("xsi:type", "dcterms:W3CDTF")
                    .with_text(w3cdtf(value.unwrap_or(now))),
            );
        }
        root
    }
}

/// W3CDTF timestamp with second precision (`2024-05-01T12:00:00Z`)
pub fn w3cdtf(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build the extended properties tree naming the producing application
pub fn app_properties_element(application: &str) -> XmlElement {
    XmlElement::new("Properties")
        .with_attr("xmlns", EXTENDED_NS)
        .with_attr("xmlns:vt", VT_NS)
        .with_child(XmlElement::new("Application").with_text(application))
        .with_child(XmlElement::new("DocSecurity").with_text("0"))
}
