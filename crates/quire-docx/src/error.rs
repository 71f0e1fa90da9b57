//! Error types for DOCX operations

use thiserror::Error;

use crate::xml::XmlError;

/// Errors that can occur while loading, editing or writing a document
#[derive(Error, Debug)]
pub enum DocxError {
    /// Error reading or writing the ZIP container
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A part contained malformed XML
    #[error("Malformed XML in part '{part}': {source}")]
    Parse {
        /// Name of the offending part
        part: String,
        #[source]
        source: XmlError,
    },

    /// A part tree could not be rendered
    #[error("Failed to write part '{part}': {source}")]
    Serialize {
        /// Name of the part being written
        part: String,
        #[source]
        source: XmlError,
    },

    /// Required part not found (or empty) in the archive
    #[error("Required part missing: {0}")]
    MissingPart(String),

    /// Invalid package or document structure
    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),

    /// A mutation was given an out-of-range or unsupported value
    #[error("{operation}: invalid argument: {detail}")]
    InvalidArgument {
        /// Operation that rejected the argument
        operation: &'static str,
        /// What was wrong with it
        detail: String,
    },

    /// A mutation conflicts with the current state of the model
    #[error("{operation}: invalid state: {detail}")]
    InvalidState {
        /// Operation that was rejected
        operation: &'static str,
        /// Which constraint was violated
        detail: String,
    },

    /// Feature intentionally not implemented
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Image bytes could not be decoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Configuration serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl DocxError {
    pub(crate) fn invalid_argument(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation,
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid_state(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidState {
            operation,
            detail: detail.into(),
        }
    }

    pub(crate) fn parse(part: impl Into<String>) -> impl FnOnce(XmlError) -> Self {
        let part = part.into();
        move |source| Self::Parse { part, source }
    }

    pub(crate) fn serialize(part: impl Into<String>) -> impl FnOnce(XmlError) -> Self {
        let part = part.into();
        move |source| Self::Serialize { part, source }
    }

    /// Whether this error was raised by argument validation
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Whether this error was raised by a state conflict
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}

/// Result type for DOCX operations
pub type Result<T> = std::result::Result<T, DocxError>;
