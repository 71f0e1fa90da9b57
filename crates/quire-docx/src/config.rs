//! Writer and document defaults, loadable from TOML
//!
//! ```toml
//! [defaults]
//! font = "Calibri"
//! font_size = 22        # half-points
//! page = "a4"
//!
//! [writer]
//! compression = "deflated"
//! application = "quire"
//!
//! [properties]
//! creator = "Jane Doe"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocxError, Result};
use crate::section::PageSize;

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub writer: WriterConfig,
    #[serde(default)]
    pub properties: PropertiesConfig,
}

/// Formatting defaults for generated documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Default font name
    pub font: String,
    /// Default font size in half-points
    pub font_size: u32,
    /// Page size of new sections
    pub page: PagePreset,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            font: "Calibri".to_string(),
            font_size: 22,
            page: PagePreset::Letter,
        }
    }
}

/// Named page sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PagePreset {
    #[default]
    Letter,
    A4,
}

impl PagePreset {
    pub fn size(&self) -> PageSize {
        match self {
            Self::Letter => PageSize::LETTER,
            Self::A4 => PageSize::A4,
        }
    }
}

/// ZIP entry compression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

/// Archive writer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    pub compression: Compression,
    /// Written to `docProps/app.xml`
    pub application: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Deflated,
            application: "quire".to_string(),
        }
    }
}

/// Defaults for `docProps/core.xml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertiesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
}

impl Config {
    /// Parse from a TOML string
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("loading configuration from {}", path.as_ref().display());
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.defaults.font.trim().is_empty() {
            return Err(DocxError::invalid_argument("load config", "defaults.font is empty"));
        }
        if !(2..=3276).contains(&self.defaults.font_size) {
            return Err(DocxError::invalid_argument(
                "load config",
                format!(
                    "defaults.font_size {} is outside 2..=3276 half-points",
                    self.defaults.font_size
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.defaults.font, "Calibri");
        assert_eq!(config.defaults.font_size, 22);
        assert_eq!(config.defaults.page, PagePreset::Letter);
        assert_eq!(config.writer.compression, Compression::Deflated);
        assert_eq!(config.properties.creator, None);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [defaults]
            page = "a4"

            [writer]
            compression = "stored"
            "#,
        )
        .unwrap();
        assert_eq!(config.defaults.page.size(), PageSize::A4);
        assert_eq!(config.defaults.font, "Calibri");
        assert_eq!(config.writer.compression, Compression::Stored);
        assert_eq!(config.writer.application, "quire");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_toml_str("[defaults]\npage = \"legal\""),
            Err(DocxError::Config(_))
        ));
        assert!(Config::from_toml_str("[defaults]\nfont_size = 0")
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.properties.creator = Some("Ada".to_string());
        config.defaults.font = "Cambria".to_string();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[properties]"));
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quire.toml");
        std::fs::write(&path, "[properties]\ncreator = \"Grace\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.properties.creator.as_deref(), Some("Grace"));
    }
}
