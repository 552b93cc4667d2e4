//! Persistent title → enrichment cache.
//!
//! The whole mapping lives in one JSON document that is rewritten after every
//! mutation. A `null` value is a negative result: the title was looked up and the
//! catalog had nothing for it, so it must not be queried again.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::records::{CachedLookup, EnrichmentRecord};

const CACHE_FILE_NAME: &str = "movie_cache.json";

/// Failures surfaced by the cache store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache document exists but could not be read.
    #[error("failed to read cache {}: {message}", path.display())]
    Unreadable { path: PathBuf, message: String },
    /// The cache document is not a valid title mapping.
    #[error("cache {} is corrupt: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },
    /// The cache document could not be written back.
    #[error("failed to write cache {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
}

/// Default cache location under the user's cache directory.
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("watchlog")
        .join(CACHE_FILE_NAME)
}

/// Title-keyed enrichment cache backed by a single JSON file.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    entries: HashMap<String, CachedLookup>,
}

impl CacheStore {
    /// Loads the cache from `path`, creating an empty persisted document when none exists.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        if !path.exists() {
            let store = Self {
                path: path.to_path_buf(),
                entries: HashMap::new(),
            };
            info!("Cache file not found. Creating empty cache. path={}", path.display());
            store.persist()?;
            return Ok(store);
        }

        let text = fs::read_to_string(path).map_err(|error| CacheError::Unreadable {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        let document: BTreeMap<String, Option<EnrichmentRecord>> = serde_json::from_str(&text)
            .map_err(|error| CacheError::Corrupt {
                path: path.to_path_buf(),
                message: error.to_string(),
            })?;
        let entries: HashMap<String, CachedLookup> = document
            .into_iter()
            .map(|(title, value)| (title, CachedLookup::from_document_value(value)))
            .collect();
        debug!(
            "Loaded {} cached titles from {}",
            entries.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, title: &str) -> Option<&CachedLookup> {
        self.entries.get(title)
    }

    /// Inserts or overwrites `title`, then rewrites the whole document.
    pub fn put(&mut self, title: &str, value: CachedLookup) -> Result<(), CacheError> {
        self.entries.insert(title.to_string(), value);
        self.persist()
    }

    /// Drops one title so the next run looks it up again. Returns whether it was cached.
    pub fn remove(&mut self, title: &str) -> Result<bool, CacheError> {
        if self.entries.remove(title).is_none() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Drops every negative marker. Returns how many were removed.
    pub fn clear_not_found(&mut self) -> Result<usize, CacheError> {
        let before = self.entries.len();
        self.entries
            .retain(|_, value| !matches!(value, CachedLookup::NotFound));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn not_found_count(&self) -> usize {
        self.entries
            .values()
            .filter(|value| matches!(value, CachedLookup::NotFound))
            .count()
    }

    fn serialize_document(&self) -> Result<String, String> {
        let document: BTreeMap<&str, Option<EnrichmentRecord>> = self
            .entries
            .iter()
            .map(|(title, value)| (title.as_str(), value.to_document_value()))
            .collect();
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"  ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        serde::Serialize::serialize(&document, &mut serializer)
            .map_err(|error| format!("failed to serialize cache: {error}"))?;
        String::from_utf8(out).map_err(|error| format!("cache is not valid UTF-8: {error}"))
    }

    fn persist(&self) -> Result<(), CacheError> {
        let write_error = |message: String| CacheError::Write {
            path: self.path.clone(),
            message,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|error| write_error(error.to_string()))?;
            }
        }
        let text = self.serialize_document().map_err(write_error)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, text).map_err(|error| write_error(error.to_string()))?;
        if let Err(error) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(write_error(error.to_string()));
        }
        Ok(())
    }
}
