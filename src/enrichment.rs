//! Cache-backed enrichment pass over normalized watch entries.

use log::{debug, info};

use crate::cache_store::{CacheError, CacheStore};
use crate::catalog::CatalogService;
use crate::catalog_lookup::{CatalogLookup, LookupOutcome};
use crate::records::{CachedLookup, EnrichedEntry, NormalizedEntry};

/// Output of one enrichment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct EnrichmentRun {
    pub enriched: Vec<EnrichedEntry>,
    /// Titles without enrichment, one per occurrence in input order.
    pub not_found: Vec<String>,
}

/// Enriches `entries` in order, consulting `cache` before `lookup`.
///
/// A cache miss triggers exactly one catalog lookup whose outcome (found or not) is
/// written to the cache before the entry is classified, so a title is never queried
/// twice while its cache entry stands. Cache write failures abort the pass.
pub fn run_enrichment<C: CatalogService>(
    entries: &[NormalizedEntry],
    cache: &mut CacheStore,
    lookup: &CatalogLookup<C>,
) -> Result<EnrichmentRun, CacheError> {
    let mut run = EnrichmentRun::default();
    let mut lookups = 0usize;

    for entry in entries {
        let cached = match cache.get(&entry.title) {
            Some(cached) => {
                debug!("Found '{}' in cache.", entry.title);
                cached.clone()
            }
            None => {
                lookups += 1;
                let outcome = lookup.lookup(&entry.title);
                if let LookupOutcome::NotFound {
                    reason: Some(reason),
                } = &outcome
                {
                    debug!("Caching '{}' as not found after fault: {}", entry.title, reason);
                }
                let fresh = outcome.into_cached();
                cache.put(&entry.title, fresh.clone())?;
                fresh
            }
        };

        match cached {
            CachedLookup::Found(record) => run.enriched.push(EnrichedEntry::join(entry, &record)),
            CachedLookup::NotFound => run.not_found.push(entry.title.clone()),
        }
    }

    info!(
        "Enrichment finished: {} entries, {} enriched, {} not found, {} catalog lookups",
        entries.len(),
        run.enriched.len(),
        run.not_found.len(),
        lookups
    );
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::{run_enrichment, EnrichmentRun};
    use crate::cache_store::CacheStore;
    use crate::catalog_lookup::tests::{details, FakeCatalog};
    use crate::catalog_lookup::CatalogLookup;
    use crate::entry_parser::{parse_entries, parse_entry_line};
    use crate::records::{CachedLookup, EnrichmentRecord, MediaKind};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_cache_path(name: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be valid")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("watchlog_enrich_{name}_{nonce}"))
            .join("movie_cache.json")
    }

    fn dune_catalog() -> FakeCatalog {
        FakeCatalog::default().with_movie("Dune", 438631, details(&["Science Fiction"], Some(155)))
    }

    #[test]
    fn test_dune_scenario_enriches_and_caches_record() {
        let path = unique_temp_cache_path("dune");
        let mut cache = CacheStore::load(&path).expect("cache should load");
        let lookup = CatalogLookup::new(dune_catalog());
        let entries = vec![parse_entry_line("dune (10-15)").expect("line should parse")];

        let run = run_enrichment(&entries, &mut cache, &lookup).expect("run should succeed");

        let expected = EnrichmentRecord {
            genres: vec!["Science Fiction".to_string()],
            runtime_minutes: 155,
            media_kind: MediaKind::Movie,
        };
        assert_eq!(cache.get("Dune"), Some(&CachedLookup::Found(expected)));
        assert!(run.not_found.is_empty());
        assert_eq!(run.enriched.len(), 1);
        let enriched = &run.enriched[0];
        assert_eq!(enriched.title, "Dune");
        assert_eq!(enriched.watch_date, "10-15");
        assert_eq!(enriched.genres, vec!["Science Fiction"]);
        assert_eq!(enriched.runtime_minutes, 155);
        assert_eq!(enriched.media_kind, MediaKind::Movie);
    }

    #[test]
    fn test_obscure_title_scenario_caches_negative_marker() {
        let path = unique_temp_cache_path("obscure");
        let mut cache = CacheStore::load(&path).expect("cache should load");
        let lookup = CatalogLookup::new(FakeCatalog::default());
        let entry = parse_entry_line("some obscure title (03-02) (cinema)").expect("parse");
        assert!(entry.is_venue_watch);

        let run = run_enrichment(&[entry], &mut cache, &lookup).expect("run should succeed");

        assert!(run.enriched.is_empty());
        assert_eq!(run.not_found, vec!["Some Obscure Title"]);
        assert_eq!(cache.get("Some Obscure Title"), Some(&CachedLookup::NotFound));
        let document: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("cache file"))
                .expect("valid json");
        assert!(document["Some Obscure Title"].is_null());
    }

    #[test]
    fn test_unstructured_line_causes_no_cache_activity() {
        let path = unique_temp_cache_path("notes");
        let mut cache = CacheStore::load(&path).expect("cache should load");
        let lookup = CatalogLookup::new(dune_catalog());
        let entries = parse_entries("just some notes");

        let run = run_enrichment(&entries, &mut cache, &lookup).expect("run should succeed");

        assert!(entries.is_empty());
        assert_eq!(run, EnrichmentRun::default());
        assert!(cache.is_empty());
        assert_eq!(lookup.catalog().search_calls.get(), 0);
    }

    #[test]
    fn test_cached_title_is_not_queried_again() {
        let path = unique_temp_cache_path("idempotent");
        let mut cache = CacheStore::load(&path).expect("cache should load");
        let lookup = CatalogLookup::new(dune_catalog());
        let entries = parse_entries("dune (10-15)\nDUNE (12-24) (cinema)");

        let run = run_enrichment(&entries, &mut cache, &lookup).expect("run should succeed");
        assert_eq!(run.enriched.len(), 2);
        assert!(run.enriched[1].is_venue_watch);
        // One movie search plus one series search for the single lookup.
        assert_eq!(lookup.catalog().search_calls.get(), 2);

        run_enrichment(&entries, &mut cache, &lookup).expect("second run should succeed");
        assert_eq!(lookup.catalog().search_calls.get(), 2);
    }

    #[test]
    fn test_negative_result_is_stable_across_runs_and_reloads() {
        let path = unique_temp_cache_path("negative");
        let entries = parse_entries("some obscure title (03-02)");
        {
            let mut cache = CacheStore::load(&path).expect("cache should load");
            let lookup = CatalogLookup::new(FakeCatalog::default());
            run_enrichment(&entries, &mut cache, &lookup).expect("first run");
            assert_eq!(lookup.catalog().search_calls.get(), 2);
        }

        // The catalog now knows the title, but the cached negative is trusted.
        let mut cache = CacheStore::load(&path).expect("cache should reload");
        let lookup = CatalogLookup::new(FakeCatalog::default().with_movie(
            "Some Obscure Title",
            7,
            details(&["Drama"], Some(80)),
        ));
        let run = run_enrichment(&entries, &mut cache, &lookup).expect("second run");
        assert_eq!(lookup.catalog().search_calls.get(), 0);
        assert_eq!(run.not_found, vec!["Some Obscure Title"]);
    }

    #[test]
    fn test_service_fault_is_isolated_to_its_title() {
        let path = unique_temp_cache_path("fault");
        let mut cache = CacheStore::load(&path).expect("cache should load");
        let lookup = CatalogLookup::new(dune_catalog().failing_on("Broken"));
        let entries = parse_entries("broken (01-01)\ndune (01-02)");

        let run = run_enrichment(&entries, &mut cache, &lookup).expect("run should succeed");

        assert_eq!(run.not_found, vec!["Broken"]);
        assert_eq!(run.enriched.len(), 1);
        assert_eq!(run.enriched[0].title, "Dune");
        assert_eq!(cache.get("Broken"), Some(&CachedLookup::NotFound));
    }

    #[test]
    fn test_zero_runtime_entry_is_enriched_not_missing() {
        let path = unique_temp_cache_path("zero");
        let mut cache = CacheStore::load(&path).expect("cache should load");
        let lookup = CatalogLookup::new(FakeCatalog::default().with_series(
            "Shogun",
            126308,
            details(&["Drama"], None),
        ));
        let entries = parse_entries("shogun (04-23)");

        let run = run_enrichment(&entries, &mut cache, &lookup).expect("run should succeed");

        assert!(run.not_found.is_empty());
        assert_eq!(run.enriched[0].runtime_minutes, 0);
        assert_eq!(run.enriched[0].media_kind, MediaKind::Series);
    }
}
