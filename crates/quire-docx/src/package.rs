//! Archive loading and part classification
//!
//! A DOCX file is a ZIP archive of XML parts and media. [`Package`] unpacks
//! it, indexes every entry by a normalized path (forward slashes, no leading
//! `/` or `./`, lowercase) and sorts the parts into the slots hydration needs.
//! Entries nothing claims are kept verbatim as additional parts.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use zip::read::ZipArchive;

use crate::content_types::{ContentTypes, CONTENT_TYPES_PATH};
use crate::error::{DocxError, Result};
use crate::image::content_type_for_extension;
use crate::relationships::Relationships;

/// Conventional location of the main document part
pub const DEFAULT_DOCUMENT_PATH: &str = "word/document.xml";
/// Package-level relationship table
pub const ROOT_RELS_PATH: &str = "_rels/.rels";

pub const STYLES_PATH: &str = "word/styles.xml";
pub const NUMBERING_PATH: &str = "word/numbering.xml";
pub const FONT_TABLE_PATH: &str = "word/fonttable.xml";
pub const SETTINGS_PATH: &str = "word/settings.xml";
pub const WEB_SETTINGS_PATH: &str = "word/websettings.xml";
pub const CORE_PROPERTIES_PATH: &str = "docprops/core.xml";
pub const APP_PROPERTIES_PATH: &str = "docprops/app.xml";
pub const CUSTOM_PROPERTIES_PATH: &str = "docprops/custom.xml";

const THEME_PREFIX: &str = "word/theme/";
/// Upper bound on buffer preallocation from an entry's declared size
const MAX_PREALLOCATION: u64 = 1 << 20;
const HEADER_PREFIX: &str = "word/header";
const FOOTER_PREFIX: &str = "word/footer";
const MEDIA_PREFIX: &str = "word/media/";

/// Normalize a part path for lookup
pub fn normalize_path(path: &str) -> String {
    let mut p = path.replace('\\', "/");
    loop {
        if let Some(rest) = p.strip_prefix("./") {
            p = rest.to_string();
        } else if let Some(rest) = p.strip_prefix('/') {
            p = rest.to_string();
        } else {
            break;
        }
    }
    p.to_lowercase()
}

/// Path of the relationship table belonging to a part (`word/_rels/document.xml.rels`)
pub fn rels_path_for(part: &str) -> String {
    let part = part.trim_start_matches('/');
    match part.rsplit_once('/') {
        Some((dir, name)) => format!("{}/_rels/{}.rels", dir, name),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that declares it.
///
/// `..` and `.` segments are collapsed; a target starting with `/` is taken
/// from the package root. The result keeps the target's casing.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    if !target.starts_with('/') {
        let source = source_part.trim_start_matches('/');
        if let Some((dir, _)) = source.rsplit_once('/') {
            segments.extend(dir.split('/').filter(|s| !s.is_empty()));
        }
    }
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// One entry of the archive
#[derive(Debug, Clone)]
pub struct PackagePart {
    /// Path as stored in the archive
    pub path: String,
    /// Normalized lookup key
    pub normalized: String,
    /// Content type from the manifest, if declared
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A media entry from `word/media/`
#[derive(Debug, Clone)]
pub struct MediaPart {
    pub path: String,
    /// Base file name
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// An unpacked and classified DOCX archive
#[derive(Debug)]
pub struct Package {
    parts: Vec<PackagePart>,
    index: HashMap<String, usize>,
    content_types: ContentTypes,
    document_path: String,
    themes: Vec<usize>,
    headers: Vec<usize>,
    footers: Vec<usize>,
    media: Vec<MediaPart>,
    additional: Vec<usize>,
}

impl Package {
    /// Open a DOCX file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load from an in-memory archive
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Load from any `Read + Seek` source
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut parts = Vec::with_capacity(archive.len());
        let mut index = HashMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let path = file.name().to_string();
            let mut data = Vec::with_capacity(initial_capacity(file.size()));
            file.read_to_end(&mut data)?;

            let normalized = normalize_path(&path);
            if index.contains_key(&normalized) {
                log::warn!("duplicate archive entry {}, keeping the first", path);
                continue;
            }
            index.insert(normalized.clone(), parts.len());
            parts.push(PackagePart {
                path,
                normalized,
                content_type: None,
                data,
            });
        }

        let manifest = match index.get(&normalize_path(CONTENT_TYPES_PATH)) {
            Some(&i) if !parts[i].data.is_empty() => ContentTypes::parse(&parts[i].data)?,
            _ => return Err(DocxError::MissingPart(CONTENT_TYPES_PATH.to_string())),
        };
        for part in &mut parts {
            part.content_type = manifest.content_type_for(&part.normalized).map(str::to_string);
        }

        let document_path = match index.get(ROOT_RELS_PATH) {
            Some(&i) => Relationships::parse(&parts[i].data, ROOT_RELS_PATH)?
                .find_by_type(Relationships::TYPE_OFFICE_DOCUMENT)
                .map(|rel| resolve_target("", &rel.target))
                .unwrap_or_else(|| DEFAULT_DOCUMENT_PATH.to_string()),
            None => DEFAULT_DOCUMENT_PATH.to_string(),
        };
        match index.get(&normalize_path(&document_path)) {
            Some(&i) if !parts[i].data.is_empty() => {}
            _ => return Err(DocxError::MissingPart(document_path)),
        }

        let mut package = Self {
            parts,
            index,
            content_types: manifest,
            document_path,
            themes: Vec::new(),
            headers: Vec::new(),
            footers: Vec::new(),
            media: Vec::new(),
            additional: Vec::new(),
        };
        package.classify();
        Ok(package)
    }

    fn classify(&mut self) {
        let singletons = [
            normalize_path(CONTENT_TYPES_PATH),
            ROOT_RELS_PATH.to_string(),
            normalize_path(&self.document_path),
            normalize_path(&rels_path_for(&self.document_path)),
            STYLES_PATH.to_string(),
            NUMBERING_PATH.to_string(),
            FONT_TABLE_PATH.to_string(),
            SETTINGS_PATH.to_string(),
            WEB_SETTINGS_PATH.to_string(),
            CORE_PROPERTIES_PATH.to_string(),
            APP_PROPERTIES_PATH.to_string(),
            CUSTOM_PROPERTIES_PATH.to_string(),
        ];

        for (i, part) in self.parts.iter().enumerate() {
            let key = part.normalized.as_str();
            if singletons.iter().any(|s| s == key) {
                continue;
            }
            if key.starts_with(THEME_PREFIX) {
                self.themes.push(i);
            } else if key.starts_with(HEADER_PREFIX) {
                self.headers.push(i);
            } else if key.starts_with(FOOTER_PREFIX) {
                self.footers.push(i);
            } else if key.starts_with(MEDIA_PREFIX) {
                let name = part.path.rsplit('/').next().unwrap_or(&part.path).to_string();
                let content_type = part.content_type.clone().unwrap_or_else(|| {
                    let ext = name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
                    content_type_for_extension(ext).to_string()
                });
                self.media.push(MediaPart {
                    path: part.path.clone(),
                    name,
                    content_type,
                    data: part.data.clone(),
                });
            } else if is_header_footer_rels(key) {
                // Reached through part_rels()
            } else {
                self.additional.push(i);
            }
        }

        log::debug!(
            "classified {} parts: {} headers, {} footers, {} themes, {} media, {} additional",
            self.parts.len(),
            self.headers.len(),
            self.footers.len(),
            self.themes.len(),
            self.media.len(),
            self.additional.len()
        );
    }

    /// Any part by path (case-insensitive)
    pub fn get(&self, path: &str) -> Option<&PackagePart> {
        self.index.get(&normalize_path(path)).map(|&i| &self.parts[i])
    }

    fn slot(&self, path: &str) -> Option<&[u8]> {
        self.get(path).map(|p| p.data.as_slice())
    }

    /// The content-type manifest
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Path of the main document part, as referenced by the package
    pub fn document_path(&self) -> &str {
        &self.document_path
    }

    pub fn document(&self) -> Option<&[u8]> {
        self.slot(&self.document_path)
    }

    pub fn document_rels(&self) -> Option<&[u8]> {
        self.slot(&rels_path_for(&self.document_path))
    }

    pub fn root_rels(&self) -> Option<&[u8]> {
        self.slot(ROOT_RELS_PATH)
    }

    pub fn styles(&self) -> Option<&[u8]> {
        self.slot(STYLES_PATH)
    }

    pub fn numbering(&self) -> Option<&PackagePart> {
        self.get(NUMBERING_PATH)
    }

    pub fn font_table(&self) -> Option<&[u8]> {
        self.slot(FONT_TABLE_PATH)
    }

    pub fn settings(&self) -> Option<&PackagePart> {
        self.get(SETTINGS_PATH)
    }

    pub fn web_settings(&self) -> Option<&PackagePart> {
        self.get(WEB_SETTINGS_PATH)
    }

    pub fn core_properties(&self) -> Option<&[u8]> {
        self.slot(CORE_PROPERTIES_PATH)
    }

    pub fn app_properties(&self) -> Option<&[u8]> {
        self.slot(APP_PROPERTIES_PATH)
    }

    pub fn custom_properties(&self) -> Option<&PackagePart> {
        self.get(CUSTOM_PROPERTIES_PATH)
    }

    /// Theme parts in archive order
    pub fn themes(&self) -> impl Iterator<Item = &PackagePart> {
        self.themes.iter().map(|&i| &self.parts[i])
    }

    /// Header parts in archive order
    pub fn headers(&self) -> impl Iterator<Item = &PackagePart> {
        self.headers.iter().map(|&i| &self.parts[i])
    }

    /// Footer parts in archive order
    pub fn footers(&self) -> impl Iterator<Item = &PackagePart> {
        self.footers.iter().map(|&i| &self.parts[i])
    }

    /// Media parts in archive order
    pub fn media(&self) -> &[MediaPart] {
        &self.media
    }

    /// Parts no slot claimed
    pub fn additional(&self) -> impl Iterator<Item = &PackagePart> {
        self.additional.iter().map(|&i| &self.parts[i])
    }

    /// Relationship table of any part, if present
    pub fn part_rels(&self, part: &str) -> Option<&[u8]> {
        self.slot(&rels_path_for(part))
    }

    /// Number of archive entries
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Declared sizes come from the archive header and are not trusted
fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOCATION)).unwrap_or(0)
}

fn is_header_footer_rels(key: &str) -> bool {
    key.strip_prefix("word/_rels/")
        .map(|name| name.starts_with("header") || name.starts_with("footer"))
        .unwrap_or(false)
}
