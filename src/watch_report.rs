//! Plain-text watch summary and JSON export of an enrichment run.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use log::warn;

use crate::enrichment::EnrichmentRun;
use crate::records::MediaKind;

// Leap year so that `02-29` validates.
const REFERENCE_YEAR: i32 = 2000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Genre counts, highest first, ties by name.
    pub genre_counts: Vec<(String, usize)>,
    pub movie_count: usize,
    pub series_count: usize,
    /// Total runtime in minutes per calendar month (1-12).
    pub monthly_runtime: BTreeMap<u32, u64>,
    pub total_runtime_minutes: u64,
    pub cinema_visits: usize,
    pub undated_entries: usize,
    pub not_found: Vec<String>,
}

/// Month of an `MM-DD` watch date, or `None` when it is not a real calendar day.
pub fn watch_month(watch_date: &str) -> Option<u32> {
    let (month, day) = watch_date.split_once('-')?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(REFERENCE_YEAR, month, day).map(|date| date.month())
}

pub fn summarize(run: &EnrichmentRun) -> WatchSummary {
    let mut summary = WatchSummary {
        not_found: run.not_found.clone(),
        ..WatchSummary::default()
    };
    let mut genre_counts: HashMap<&str, usize> = HashMap::new();

    for entry in &run.enriched {
        for genre in &entry.genres {
            *genre_counts.entry(genre.as_str()).or_default() += 1;
        }
        match entry.media_kind {
            MediaKind::Movie => summary.movie_count += 1,
            MediaKind::Series => summary.series_count += 1,
        }
        if entry.is_venue_watch {
            summary.cinema_visits += 1;
        }
        let runtime = u64::from(entry.runtime_minutes);
        summary.total_runtime_minutes += runtime;

        if entry.watch_date.is_empty() {
            summary.undated_entries += 1;
            continue;
        }
        match watch_month(&entry.watch_date) {
            Some(month) => *summary.monthly_runtime.entry(month).or_default() += runtime,
            None => {
                warn!(
                    "Malformed watch date '{}' for '{}'",
                    entry.watch_date, entry.title
                );
                summary.undated_entries += 1;
            }
        }
    }

    let mut genre_counts: Vec<(String, usize)> = genre_counts
        .into_iter()
        .map(|(genre, count)| (genre.to_string(), count))
        .collect();
    genre_counts.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
    summary.genre_counts = genre_counts;
    summary
}

pub fn render_summary(summary: &WatchSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Watched: {} movies, {} series", summary.movie_count, summary.series_count);
    let _ = writeln!(out, "Cinema visits: {}", summary.cinema_visits);
    let _ = writeln!(
        out,
        "Total runtime: {} min ({:.1} h)",
        summary.total_runtime_minutes,
        summary.total_runtime_minutes as f64 / 60.0
    );

    if !summary.genre_counts.is_empty() {
        let _ = writeln!(out, "\nGenres:");
        for (genre, count) in &summary.genre_counts {
            let _ = writeln!(out, "  {genre:<20} {count}");
        }
    }

    if !summary.monthly_runtime.is_empty() {
        let _ = writeln!(out, "\nRuntime per month:");
        for (month, minutes) in &summary.monthly_runtime {
            let _ = writeln!(out, "  {month:02}  {minutes} min");
        }
    }
    if summary.undated_entries > 0 {
        let _ = writeln!(out, "  (undated: {})", summary.undated_entries);
    }

    if !summary.not_found.is_empty() {
        let _ = writeln!(out, "\nNo details found for {} titles:", summary.not_found.len());
        for title in &summary.not_found {
            let _ = writeln!(out, "  {title}");
        }
    }
    out
}

/// Writes the enriched records and unresolved titles as pretty JSON.
pub fn write_enriched_json(path: &Path, run: &EnrichmentRun) -> Result<(), String> {
    let text = serde_json::to_string_pretty(run)
        .map_err(|err| format!("failed to serialize enrichment output: {}", err))?;
    std::fs::write(path, text)
        .map_err(|err| format!("failed to write enrichment output {}: {}", path.display(), err))
}
