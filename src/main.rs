mod cache_store;
mod catalog;
mod catalog_lookup;
mod config;
mod enrichment;
mod entry_parser;
mod plex_library;
mod records;
mod watch_log;
mod watch_report;

use std::path::PathBuf;

use cache_store::CacheStore;
use catalog::tmdb::TmdbCatalog;
use catalog_lookup::CatalogLookup;
use clap::{Parser, Subcommand};
use config::Config;
use log::{debug, info, warn};
use plex_library::PlexLibrary;
use records::NormalizedEntry;

/// Enriches a watched-titles log with TMDb metadata.
#[derive(Debug, Parser)]
#[command(name = "watchlog", version)]
struct Cli {
    /// Config file path (defaults to the user config directory).
    #[arg(long, global = true, env = "WATCHLOG_CONFIG")]
    config: Option<PathBuf>,
    /// Cache document path, overriding the config.
    #[arg(long, global = true)]
    cache: Option<PathBuf>,
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse the watch log, enrich every entry and print a summary.
    Enrich {
        /// Watch log path, overriding the config.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Also import watched titles from this Plex library database.
        #[arg(long)]
        plex_db: Option<PathBuf>,
        /// Write enriched records and unresolved titles to this JSON file.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Drop cached not-found markers before enriching.
        #[arg(long)]
        retry_not_found: bool,
    },
    /// Print the normalized entries of the watch log without any lookup.
    Parse {
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Remove one title from the cache so it is looked up again.
    Forget { title: String },
}

fn collect_entries(
    config: &Config,
    log_path: Option<PathBuf>,
    plex_db: Option<PathBuf>,
) -> Result<Vec<NormalizedEntry>, String> {
    let log_path = log_path.unwrap_or_else(|| config.log_path());
    let plex_db = plex_db.or_else(|| config.plex.library_db_path.clone());

    let mut entries = Vec::new();
    if plex_db.is_none() || log_path.exists() {
        entries.extend(watch_log::read_watch_log(&log_path)?);
    } else {
        debug!("Watch log {} not present; using Plex only", log_path.display());
    }
    if let Some(plex_db) = plex_db {
        let library = PlexLibrary::open(&plex_db).map_err(|err| {
            format!("failed to open Plex library {}: {}", plex_db.display(), err)
        })?;
        let plex_entries = library
            .watched_entries()
            .map_err(|err| format!("failed to read Plex library: {}", err))?;
        entries.extend(plex_entries);
    }
    Ok(entries)
}

fn run_enrich(
    config: &Config,
    cache_path: PathBuf,
    log_path: Option<PathBuf>,
    plex_db: Option<PathBuf>,
    output: Option<PathBuf>,
    retry_not_found: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // A corrupt cache is fatal: nothing is looked up before it loads.
    let mut cache = CacheStore::load(&cache_path)?;
    info!(
        "Loaded cache {} ({} titles, {} not found)",
        cache.path().display(),
        cache.len(),
        cache.not_found_count()
    );

    let entries = collect_entries(config, log_path, plex_db)?;
    if config.catalog.api_key.is_empty() {
        return Err(
            "TMDb API key missing: set catalog.api_key in the config or TMDB_API_KEY".into(),
        );
    }
    if retry_not_found {
        let cleared = cache.clear_not_found()?;
        info!("Cleared {} cached not-found markers", cleared);
    }

    let lookup = CatalogLookup::new(TmdbCatalog::new(&config.catalog));
    let run = enrichment::run_enrichment(&entries, &mut cache, &lookup)?;

    let summary = watch_report::summarize(&run);
    print!("{}", watch_report::render_summary(&summary));

    if let Some(output) = output {
        watch_report::write_enriched_json(&output, &run)?;
        info!("Wrote enrichment output to {}", output.display());
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let mut clog = colog::default_builder();
    clog.filter(
        None,
        if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        },
    );
    clog.init();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let config = config::load_effective_config(&config_path);
    let cache_path = cli.cache.unwrap_or_else(|| config.cache_path());

    let result: Result<(), Box<dyn std::error::Error>> = match cli.command {
        Command::Enrich {
            log,
            plex_db,
            output,
            retry_not_found,
        } => run_enrich(&config, cache_path, log, plex_db, output, retry_not_found),
        Command::Parse { log } => {
            let log_path = log.unwrap_or_else(|| config.log_path());
            watch_log::read_watch_log(&log_path).map_err(Into::into).map(|entries| {
                for entry in entries {
                    let venue = if entry.is_venue_watch { " [cinema]" } else { "" };
                    println!("{}\t{}{}", entry.watch_date, entry.title, venue);
                }
            })
        }
        Command::Forget { title } => CacheStore::load(&cache_path)
            .and_then(|mut cache| cache.remove(&title))
            .map_err(Into::into)
            .map(|removed| {
                if removed {
                    info!("Removed '{}' from cache", title);
                } else {
                    warn!("'{}' is not cached", title);
                }
            }),
    };

    if let Err(error) = &result {
        log::error!("{}", error);
        std::process::exit(1);
    }
}
