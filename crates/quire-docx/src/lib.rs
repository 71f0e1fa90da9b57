//! # quire-docx
//!
//! Round-trip codec between DOCX archives and an editable document model.
//!
//! This crate provides functionality to:
//! - Load a DOCX archive into paragraphs, tables, sections and fields
//! - Edit the model (formatting, merges, images, headers and footers)
//! - Write the model back as a valid archive, carrying unknown parts through
//!
//! ## Example: Editing a Document
//!
//! ```no_run
//! use quire_docx::{Document, Paragraph};
//!
//! let mut doc = Document::open("report.docx")?;
//! doc.add_heading("Appendix", 1)?;
//! doc.add_paragraph(Paragraph::with_text("Added after loading."));
//! doc.update_fields();
//! doc.save("report-edited.docx")?;
//! # Ok::<(), quire_docx::DocxError>(())
//! ```

pub mod config;
pub mod content_types;
pub mod document;
pub mod error;
pub mod field;
pub mod ids;
pub mod image;
pub mod media;
pub mod package;
pub mod paragraph;
pub mod properties;
pub mod relationships;
pub mod run;
pub mod section;
pub mod styles;
pub mod table;
pub mod xml;

mod hydrate;
mod serialize;
mod writer;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{Compression, Config, PagePreset};
pub use content_types::ContentTypes;
pub use document::{Block, Document, RetainedPart, SectionBreak};
pub use error::{DocxError, Result};
pub use field::{Field, FieldType, HyperlinkTarget};
pub use image::{AxisPosition, FloatingPosition, Image, ImagePosition, WrapType};
pub use media::{MediaEntry, MediaManager};
pub use package::Package;
pub use paragraph::{Alignment, Bookmark, Indentation, LineRule, Paragraph, Spacing};
pub use properties::CoreProperties;
pub use relationships::{Relationship, Relationships, TargetMode};
pub use run::{BreakType, Run, RunFormat, UnderlineStyle};
pub use section::{
    HeaderFooter, HeaderFooterKind, Orientation, PageMargins, PageSize, Section, SectionBreakType,
};
pub use styles::{Style, StyleSheet, StyleType};
pub use table::{Border, Cell, CellBlock, CellBorders, Row, Shading, Table, VMerge, VerticalAlign};
pub use xml::XmlElement;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
