//! Title resolution against a catalog service.
//!
//! Movies win over series: the first movie hit is used when there is one, the first
//! series hit otherwise. Every service fault is folded into a not-found outcome for
//! that title so one bad response never stops the run.

use log::{debug, info, warn};

use crate::catalog::{CatalogCandidate, CatalogService};
use crate::records::{CachedLookup, EnrichmentRecord, MediaKind};

/// Result of resolving one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(EnrichmentRecord),
    /// `reason` carries the service fault, if any. It is diagnostic only and never cached.
    NotFound { reason: Option<String> },
}

impl LookupOutcome {
    pub fn into_cached(self) -> CachedLookup {
        match self {
            Self::Found(record) => CachedLookup::Found(record),
            Self::NotFound { .. } => CachedLookup::NotFound,
        }
    }
}

/// Fault warning for `title`. The title is cached as not-found afterwards, so the
/// message names the flag that undoes it.
fn fault_message(title: &str, error: &str) -> String {
    format!(
        "Lookup[{title}]: catalog request failed: {error}. Cached as not found; \
         run `watchlog enrich --retry-not-found` to look it up again"
    )
}

/// Resolves titles to enrichment records through a [`CatalogService`].
pub struct CatalogLookup<C: CatalogService> {
    catalog: C,
}

impl<C: CatalogService> CatalogLookup<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    #[cfg(test)]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    fn select_candidate(
        movies: Vec<CatalogCandidate>,
        series: Vec<CatalogCandidate>,
    ) -> Option<(MediaKind, CatalogCandidate)> {
        if let Some(movie) = movies.into_iter().next() {
            return Some((MediaKind::Movie, movie));
        }
        series
            .into_iter()
            .next()
            .map(|candidate| (MediaKind::Series, candidate))
    }

    fn try_lookup(&self, title: &str) -> Result<Option<EnrichmentRecord>, String> {
        let movies = self.catalog.search_movies(title)?;
        let series = self.catalog.search_series(title)?;
        debug!(
            "Lookup[{title}]: {} movie and {} series candidates",
            movies.len(),
            series.len()
        );

        let Some((media_kind, candidate)) = Self::select_candidate(movies, series) else {
            return Ok(None);
        };
        debug!(
            "Lookup[{title}]: selected {} '{}' (id {})",
            media_kind.label(),
            candidate.name,
            candidate.id
        );
        let details = self.catalog.fetch_details(media_kind, candidate.id)?;
        Ok(Some(EnrichmentRecord {
            genres: details.genres,
            runtime_minutes: details.runtime_minutes.unwrap_or(0),
            media_kind,
        }))
    }

    /// Looks up `title`, returning not-found for empty results and for any service fault.
    pub fn lookup(&self, title: &str) -> LookupOutcome {
        match self.try_lookup(title) {
            Ok(Some(record)) => {
                info!(
                    "Lookup[{title}]: resolved as {} ({} min, genres: {})",
                    record.media_kind.label(),
                    record.runtime_minutes,
                    record.genres.join(", ")
                );
                LookupOutcome::Found(record)
            }
            Ok(None) => {
                info!("Lookup[{title}]: no catalog results");
                LookupOutcome::NotFound { reason: None }
            }
            Err(error) => {
                warn!("{}", fault_message(title, &error));
                LookupOutcome::NotFound {
                    reason: Some(error),
                }
            }
        }
    }
}
