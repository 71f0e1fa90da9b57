//! Media table for the `word/media/` folder
//!
//! New assets get generated names (`image1.png`, `image2.jpeg`, ...) and
//! identical byte streams are stored once, keyed by their SHA-256 digest.
//! Assets read from an existing package keep their original names.

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::image::extension_for_content_type;
use crate::package::normalize_path;

/// Folder media parts live in
pub const MEDIA_DIR: &str = "word/media/";

/// A registered media asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    /// File name (e.g. `image1.png`)
    pub name: String,
    /// Full part path (e.g. `word/media/image1.png`)
    pub path: String,
    /// MIME content type
    pub content_type: String,
    /// Raw bytes
    pub data: Arc<[u8]>,
}

impl MediaEntry {
    /// Target relative to `word/`, as used in relationships
    pub fn target(&self) -> String {
        format!("media/{}", self.name)
    }

    /// File extension of the asset
    pub fn extension(&self) -> &str {
        self.name.rsplit_once('.').map(|(_, e)| e).unwrap_or("")
    }
}

/// Registered media assets, in registration order
#[derive(Debug, Clone, Default)]
pub struct MediaManager {
    entries: Vec<MediaEntry>,
    by_path: HashMap<String, usize>,
    by_digest: HashMap<[u8; 32], usize>,
    counter: u32,
}

impl MediaManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register new bytes; identical bytes return the existing entry
    pub fn register(&mut self, data: impl Into<Arc<[u8]>>, content_type: &str) -> MediaEntry {
        let data = data.into();
        let digest = digest(&data);
        if let Some(&idx) = self.by_digest.get(&digest) {
            return self.entries[idx].clone();
        }

        let ext = extension_for_content_type(content_type);
        let name = loop {
            self.counter += 1;
            let candidate = format!("image{}.{}", self.counter, ext);
            if !self.by_path.contains_key(&normalize_path(&media_path(&candidate))) {
                break candidate;
            }
        };
        log::debug!("registered media {} ({} bytes)", name, data.len());
        self.push(MediaEntry {
            path: media_path(&name),
            name,
            content_type: content_type.to_string(),
            data,
        })
    }

    /// Register an asset read from a package under its original path
    pub fn register_existing(
        &mut self,
        path: &str,
        data: impl Into<Arc<[u8]>>,
        content_type: &str,
    ) -> MediaEntry {
        if let Some(&idx) = self.by_path.get(&normalize_path(path)) {
            return self.entries[idx].clone();
        }
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        self.push(MediaEntry {
            name,
            path: path.trim_start_matches('/').to_string(),
            content_type: content_type.to_string(),
            data: data.into(),
        })
    }

    fn push(&mut self, entry: MediaEntry) -> MediaEntry {
        let idx = self.entries.len();
        self.by_path.insert(normalize_path(&entry.path), idx);
        self.by_digest.entry(digest(&entry.data)).or_insert(idx);
        self.entries.push(entry.clone());
        entry
    }

    /// Look up by part path (case-insensitive, separator-normalized)
    pub fn get(&self, path: &str) -> Option<&MediaEntry> {
        self.by_path
            .get(&normalize_path(path))
            .map(|&idx| &self.entries[idx])
    }

    /// All entries in registration order
    pub fn entries(&self) -> &[MediaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn media_path(name: &str) -> String {
    format!("{}{}", MEDIA_DIR, name)
}

fn digest(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_names() {
        let mut media = MediaManager::new();
        let a = media.register(vec![1, 2, 3], "image/png");
        let b = media.register(vec![4, 5, 6], "image/jpeg");
        assert_eq!(a.name, "image1.png");
        assert_eq!(a.path, "word/media/image1.png");
        assert_eq!(a.target(), "media/image1.png");
        assert_eq!(b.name, "image2.jpeg");
        assert_eq!(b.extension(), "jpeg");
    }

    #[test]
    fn test_identical_bytes_deduplicated() {
        let mut media = MediaManager::new();
        let a = media.register(vec![9; 64], "image/png");
        let b = media.register(vec![9; 64], "image/png");
        assert_eq!(a, b);
        assert_eq!(media.len(), 1);
    }

    #[test]
    fn test_existing_names_not_reused() {
        let mut media = MediaManager::new();
        media.register_existing("word/media/image1.png", vec![1], "image/png");
        let fresh = media.register(vec![2], "image/png");
        assert_eq!(fresh.name, "image2.png");
    }

    #[test]
    fn test_existing_asset_dedupes_new_registration() {
        let mut media = MediaManager::new();
        let original = media.register_existing("word/media/Logo.PNG", vec![7, 7], "image/png");
        assert_eq!(original.name, "Logo.PNG");
        let again = media.register(vec![7, 7], "image/png");
        assert_eq!(again.path, "word/media/Logo.PNG");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut media = MediaManager::new();
        media.register_existing("word/media/Logo.PNG", vec![1], "image/png");
        assert!(media.get("WORD\\media\\logo.png").is_some());
        assert!(media.get("word/media/other.png").is_none());
    }
}
