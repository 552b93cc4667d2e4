//! Shared watch-log record types passed between the parser, cache, lookup and report stages.

use serde::{Deserialize, Serialize};

/// One watched title normalized from a raw log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEntry {
    pub title: String,
    /// `MM-DD` without a year, or empty when the line carried no date token.
    pub watch_date: String,
    pub is_venue_watch: bool,
}

/// Catalog category the enrichment was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MediaKind {
    #[serde(rename = "movie")]
    Movie,
    #[serde(rename = "tv", alias = "series")]
    Series,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "tv",
        }
    }
}

/// Catalog metadata attached to a title. Field names match the persisted cache document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    #[serde(alias = "Genres", default)]
    pub genres: Vec<String>,
    #[serde(rename = "runtime", alias = "Runtime", default)]
    pub runtime_minutes: u32,
    #[serde(rename = "type", alias = "Type")]
    pub media_kind: MediaKind,
}

/// Cached outcome for a title: either enrichment or a negative marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedLookup {
    Found(EnrichmentRecord),
    NotFound,
}

impl CachedLookup {
    pub fn from_document_value(value: Option<EnrichmentRecord>) -> Self {
        match value {
            Some(record) => Self::Found(record),
            None => Self::NotFound,
        }
    }

    pub fn to_document_value(&self) -> Option<EnrichmentRecord> {
        match self {
            Self::Found(record) => Some(record.clone()),
            Self::NotFound => None,
        }
    }
}

/// A normalized entry joined with its enrichment; lives for one run only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedEntry {
    pub title: String,
    pub watch_date: String,
    pub is_venue_watch: bool,
    pub genres: Vec<String>,
    pub runtime_minutes: u32,
    pub media_kind: MediaKind,
}

impl EnrichedEntry {
    pub fn join(entry: &NormalizedEntry, record: &EnrichmentRecord) -> Self {
        Self {
            title: entry.title.clone(),
            watch_date: entry.watch_date.clone(),
            is_venue_watch: entry.is_venue_watch,
            genres: record.genres.clone(),
            runtime_minutes: record.runtime_minutes,
            media_kind: record.media_kind,
        }
    }
}
