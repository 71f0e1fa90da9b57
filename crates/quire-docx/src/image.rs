//! Embedded images
//!
//! Images are embedded through `<w:drawing>` elements containing either an
//! inline (`<wp:inline>`) or floating (`<wp:anchor>`) placement:
//!
//! ```xml
//! <w:drawing>
//!   <wp:inline|wp:anchor>
//!     <wp:extent cx="..." cy="..."/>
//!     <wp:docPr id="..." name="..." descr="..."/>
//!     <a:graphic>
//!       <a:graphicData uri="...picture">
//!         <pic:pic><pic:blipFill><a:blip r:embed="rIdNN"/></pic:blipFill></pic:pic>
//!       </a:graphicData>
//!     </a:graphic>
//!   </wp:inline|wp:anchor>
//! </w:drawing>
//! ```
//!
//! Sizes are stored in EMUs (English Metric Units): 914400 per inch and
//! 9525 per pixel at 96 DPI.

use std::io::Cursor;
use std::sync::Arc;

use image::{ImageFormat, ImageReader};

use crate::error::Result;

/// EMUs per inch (914400)
pub const EMU_PER_INCH: i64 = 914400;

/// EMUs per pixel at 96 DPI (9525)
pub const EMU_PER_PIXEL: i64 = 9525;

/// Convert pixels to EMUs
pub fn px_to_emu(px: u32) -> i64 {
    i64::from(px) * EMU_PER_PIXEL
}

/// Convert EMUs to pixels, rounding half up
pub fn emu_to_px(emu: i64) -> u32 {
    let px = (emu.max(0) + EMU_PER_PIXEL / 2) / EMU_PER_PIXEL;
    u32::try_from(px).unwrap_or(u32::MAX)
}

/// An image attached to a run
#[derive(Debug, Clone)]
pub struct Image {
    /// Document-unique image id
    pub id: u32,
    /// Name from `docPr`
    pub name: String,
    /// Alt text from `docPr descr`
    pub description: Option<String>,
    /// Relationship id in the owning part, once registered
    pub rel_id: Option<String>,
    /// Target path relative to `word/` (e.g. `media/image1.png`)
    pub target: String,
    /// Raw image bytes
    pub data: Arc<[u8]>,
    /// MIME content type
    pub content_type: String,
    /// Width in EMUs
    pub width_emu: i64,
    /// Height in EMUs
    pub height_emu: i64,
    /// Inline or floating placement
    pub position: ImagePosition,
}

impl Image {
    /// Create an inline image with explicit bytes and no size yet
    pub fn new(id: u32, data: impl Into<Arc<[u8]>>, content_type: impl Into<String>) -> Self {
        Self {
            id,
            name: format!("Picture {}", id),
            description: None,
            rel_id: None,
            target: String::new(),
            data: data.into(),
            content_type: content_type.into(),
            width_emu: 0,
            height_emu: 0,
            position: ImagePosition::Inline,
        }
    }

    /// Create an inline image sized from the decoded pixel dimensions
    pub fn from_bytes(
        id: u32,
        data: impl Into<Arc<[u8]>>,
        content_type: impl Into<String>,
    ) -> Result<Self> {
        let image = Self::new(id, data, content_type);
        let (w, h) = decode_dimensions(&image.data, &image.content_type)?;
        Ok(image.with_size_px(w, h))
    }

    /// Set alt text
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the `docPr` name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the size in pixels
    pub fn with_size_px(mut self, width: u32, height: u32) -> Self {
        self.width_emu = px_to_emu(width);
        self.height_emu = px_to_emu(height);
        self
    }

    /// Set the size in EMUs
    pub fn with_size_emu(mut self, width: i64, height: i64) -> Self {
        self.width_emu = width;
        self.height_emu = height;
        self
    }

    /// Set the placement
    pub fn with_position(mut self, position: ImagePosition) -> Self {
        self.position = position;
        self
    }

    /// Width in pixels
    pub fn width_px(&self) -> u32 {
        emu_to_px(self.width_emu)
    }

    /// Height in pixels
    pub fn height_px(&self) -> u32 {
        emu_to_px(self.height_emu)
    }

    /// File name of the target path
    pub fn filename(&self) -> &str {
        self.target.rsplit('/').next().unwrap_or(&self.target)
    }

    /// Extension of the target path
    pub fn extension(&self) -> Option<&str> {
        self.filename().rsplit_once('.').map(|(_, ext)| ext)
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.position, ImagePosition::Inline)
    }
}

/// Image placement
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImagePosition {
    /// Flows with the text
    #[default]
    Inline,
    /// Anchored to the page, margin, column or paragraph
    Floating(FloatingPosition),
}

/// Placement of a floating image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingPosition {
    pub horizontal: AxisPosition,
    pub vertical: AxisPosition,
    pub wrap: WrapType,
    /// `relativeHeight`; larger values sit on top
    pub z_order: u32,
    /// `behindDoc`
    pub behind_text: bool,
}

impl Default for FloatingPosition {
    fn default() -> Self {
        Self {
            horizontal: AxisPosition::offset("column", 0),
            vertical: AxisPosition::offset("paragraph", 0),
            wrap: WrapType::Square,
            z_order: 0,
            behind_text: false,
        }
    }
}

/// Position on one axis (`positionH` / `positionV`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisPosition {
    /// `relativeFrom` (page, margin, column, paragraph, ...)
    pub relative_from: String,
    /// Named alignment (left, center, right, top, ...); wins over the offset
    pub align: Option<String>,
    /// `posOffset` in EMUs
    pub offset: i64,
}

impl AxisPosition {
    /// Offset position
    pub fn offset(relative_from: impl Into<String>, offset: i64) -> Self {
        Self {
            relative_from: relative_from.into(),
            align: None,
            offset,
        }
    }

    /// Aligned position
    pub fn aligned(relative_from: impl Into<String>, align: impl Into<String>) -> Self {
        Self {
            relative_from: relative_from.into(),
            align: Some(align.into()),
            offset: 0,
        }
    }
}

/// Text wrapping around a floating image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapType {
    #[default]
    None,
    Square,
    Tight,
    Through,
    TopAndBottom,
}

impl WrapType {
    /// Parse from the wrap element's local name
    pub fn from_element_name(name: &str) -> Option<Self> {
        match name {
            "wrapNone" => Some(Self::None),
            "wrapSquare" => Some(Self::Square),
            "wrapTight" => Some(Self::Tight),
            "wrapThrough" => Some(Self::Through),
            "wrapTopAndBottom" => Some(Self::TopAndBottom),
            _ => None,
        }
    }

    /// Local name of the wrap element
    pub fn element_name(&self) -> &'static str {
        match self {
            Self::None => "wrapNone",
            Self::Square => "wrapSquare",
            Self::Tight => "wrapTight",
            Self::Through => "wrapThrough",
            Self::TopAndBottom => "wrapTopAndBottom",
        }
    }
}

/// MIME content type for an image extension
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        _ => "application/octet-stream",
    }
}

/// Preferred file extension for an image content type
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpeg",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/svg+xml" => "svg",
        "image/x-emf" => "emf",
        "image/x-wmf" => "wmf",
        _ => "png",
    }
}

/// Decode the pixel dimensions of an image.
///
/// The format is taken from the content type (or a bare extension), PNG when
/// neither is recognized; if that decode fails the format is sniffed from the
/// bytes instead.
pub fn decode_dimensions(bytes: &[u8], content_type: &str) -> Result<(u32, u32)> {
    let format = ImageFormat::from_mime_type(content_type)
        .or_else(|| ImageFormat::from_extension(content_type.trim_start_matches('.')))
        .unwrap_or(ImageFormat::Png);

    match ImageReader::with_format(Cursor::new(bytes), format).into_dimensions() {
        Ok(dims) => Ok(dims),
        Err(first) => {
            log::debug!("decoding as {:?} failed ({}), sniffing format", format, first);
            let dims = ImageReader::new(Cursor::new(bytes))
                .with_guessed_format()?
                .into_dimensions()?;
            Ok(dims)
        }
    }
}
