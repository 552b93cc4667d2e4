//! Catalog service abstractions and concrete implementations.

pub mod tmdb;

use crate::records::MediaKind;

/// One search hit returned by a catalog service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogCandidate {
    pub id: u64,
    pub name: String,
}

/// Detail payload for a selected candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogDetails {
    pub genres: Vec<String>,
    /// `None` when the catalog has no runtime for the title.
    pub runtime_minutes: Option<u32>,
}

/// Read-only queries the enrichment lookup needs from a catalog.
pub trait CatalogService {
    fn search_movies(&self, title: &str) -> Result<Vec<CatalogCandidate>, String>;
    fn search_series(&self, title: &str) -> Result<Vec<CatalogCandidate>, String>;
    fn fetch_details(&self, kind: MediaKind, id: u64) -> Result<CatalogDetails, String>;
}
