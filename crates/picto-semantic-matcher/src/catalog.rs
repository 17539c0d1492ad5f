//! Pictogram catalog snapshot
//!
//! A `Catalog` is an immutable, validated list of pictogram entries. It is
//! loaded once per session and shared read-only (usually behind an `Arc`);
//! reloading produces a new snapshot rather than mutating this one.
//!
//! Every snapshot carries a content fingerprint so that derived data
//! (e.g. cached entry vectors) can be invalidated when the catalog changes.

use crate::types::{MatcherError, PictogramEntry};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Seed catalog shipped with the crate
const BUILTIN_CATALOG_JSON: &str = include_str!("../data/pictograms.json");

static BUILTIN: Lazy<Result<Arc<Catalog>, MatcherError>> =
    Lazy::new(|| Catalog::from_json_str(BUILTIN_CATALOG_JSON).map(Arc::new));

/// Immutable, ordered pictogram catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<PictogramEntry>,
    fingerprint: String,
}

impl Catalog {
    /// Build a catalog, validating entries.
    ///
    /// Labels must be non-empty and unique; every entry needs at least one
    /// non-blank keyword. Entry order is preserved (it breaks score ties).
    pub fn new(entries: Vec<PictogramEntry>) -> Result<Self, MatcherError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.label.trim().is_empty() {
                return Err(MatcherError::InvalidCatalog(
                    "entry with empty label".to_string(),
                ));
            }
            if !seen.insert(entry.label.as_str()) {
                return Err(MatcherError::InvalidCatalog(format!(
                    "duplicate label '{}'",
                    entry.label
                )));
            }
            if entry.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(MatcherError::InvalidCatalog(format!(
                    "entry '{}' has no keywords",
                    entry.label
                )));
            }
        }

        let fingerprint = fingerprint_entries(&entries);
        Ok(Self {
            entries,
            fingerprint,
        })
    }

    /// A catalog with no entries. Valid to hold, rejected by ranking.
    pub fn empty() -> Self {
        Self {
            fingerprint: fingerprint_entries(&[]),
            entries: Vec::new(),
        }
    }

    /// Parse a JSON array of `{label, keywords, path}` objects
    pub fn from_json_str(json: &str) -> Result<Self, MatcherError> {
        let entries: Vec<PictogramEntry> = serde_json::from_str(json)
            .map_err(|e| MatcherError::InvalidCatalog(format!("malformed JSON: {}", e)))?;
        Self::new(entries)
    }

    /// Load catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self, MatcherError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MatcherError::InvalidCatalog(format!("cannot read {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json_str(&content)?;
        info!(
            "Loaded catalog from {} ({} entries, {})",
            path.display(),
            catalog.len(),
            &catalog.fingerprint[..12]
        );
        Ok(catalog)
    }

    /// Save catalog as pretty JSON, creating parent directories.
    ///
    /// # Errors
    /// `ResourceUnavailable` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), MatcherError> {
        let unwritable = |e: std::io::Error| {
            MatcherError::ResourceUnavailable(format!("cannot write {}: {}", path.display(), e))
        };
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| MatcherError::InvalidCatalog(format!("cannot serialize: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(unwritable)?;
        }
        std::fs::write(path, json).map_err(unwritable)?;
        info!("Saved catalog to {} ({} entries)", path.display(), self.len());
        Ok(())
    }

    /// The seed catalog, parsed once per process
    pub fn builtin() -> Result<Arc<Catalog>, MatcherError> {
        (*BUILTIN).clone()
    }

    pub fn entries(&self) -> &[PictogramEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PictogramEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookup by label
    pub fn get(&self, label: &str) -> Option<&PictogramEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    /// SHA-256 over the canonical JSON of the entries (hex)
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint_entries(entries: &[PictogramEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        // Field order is fixed by the struct, so this is canonical
        if let Ok(bytes) = serde_json::to_vec(entry) {
            hasher.update(&bytes);
        }
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.entries()[0].label, "飲む");
        assert!(catalog.get("禁止").is_some());
        assert_eq!(
            catalog.get("病院").and_then(|e| e.image_ref.as_deref()),
            Some("data/pictos/hospital.png")
        );
    }

    #[test]
    fn test_builtin_is_shared() {
        let a = Catalog::builtin().unwrap();
        let b = Catalog::builtin().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let entries = vec![
            PictogramEntry::new("待つ", ["待つ"], None),
            PictogramEntry::new("待つ", ["wait"], None),
        ];
        assert!(matches!(
            Catalog::new(entries),
            Err(MatcherError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn test_entry_without_keywords_rejected() {
        let entries = vec![PictogramEntry::new("待つ", Vec::<String>::new(), None)];
        assert!(matches!(
            Catalog::new(entries),
            Err(MatcherError::InvalidCatalog(_))
        ));

        let entries = vec![PictogramEntry::new("待つ", ["  "], None)];
        assert!(Catalog::new(entries).is_err());
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            Catalog::from_json_str("{not json"),
            Err(MatcherError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = Catalog::new(vec![PictogramEntry::new("待つ", ["待つ"], None)]).unwrap();
        let b = Catalog::new(vec![PictogramEntry::new("待つ", ["待つ"], None)]).unwrap();
        let c = Catalog::new(vec![PictogramEntry::new("待つ", ["wait"], None)]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::empty();
        assert!(catalog.is_empty());
        assert!(catalog.get("禁止").is_none());
    }
}
