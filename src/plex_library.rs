//! Read-only import of watched titles from a Plex Media Server library database.

use std::fmt::Display;
use std::path::Path;

use chrono::{DateTime, Local, TimeZone};
use log::{debug, info};
use rusqlite::{Connection, OpenFlags};

use crate::entry_parser::title_case;
use crate::records::NormalizedEntry;

const PLEX_MOVIE_TYPE: i64 = 1;
const PLEX_EPISODE_TYPE: i64 = 4;

// Episodes are rolled up to their show (episode -> season -> show).
const WATCHED_TITLES_QUERY: &str = "
    SELECT
        CASE WHEN item.metadata_type = ?2 THEN COALESCE(show.title, item.title)
             ELSE item.title END AS watched_title,
        MAX(settings.last_viewed_at) AS last_viewed_at
    FROM metadata_item_settings AS settings
    JOIN metadata_items AS item ON item.guid = settings.guid
    LEFT JOIN metadata_items AS season ON season.id = item.parent_id
    LEFT JOIN metadata_items AS show ON show.id = season.parent_id
    WHERE settings.view_count > 0
      AND item.metadata_type IN (?1, ?2)
      AND watched_title IS NOT NULL
    GROUP BY watched_title
    ORDER BY last_viewed_at, watched_title";

/// Formats a Plex `last_viewed_at` timestamp as `MM-DD` in `timezone`.
pub fn format_view_date<Tz>(unix_secs: i64, timezone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    DateTime::from_timestamp(unix_secs, 0)
        .map(|utc| utc.with_timezone(timezone).format("%m-%d").to_string())
        .unwrap_or_default()
}

pub struct PlexLibrary {
    conn: Connection,
}

impl PlexLibrary {
    /// Opens the library database read-only.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!("Opened Plex library database {}", path.display());
        Ok(Self { conn })
    }

    /// Watched movies and shows, one entry per title, oldest view first. Dates use local time.
    pub fn watched_entries(&self) -> Result<Vec<NormalizedEntry>, rusqlite::Error> {
        self.watched_entries_in(&Local)
    }

    pub fn watched_entries_in<Tz>(&self, timezone: &Tz) -> Result<Vec<NormalizedEntry>, rusqlite::Error>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut stmt = self.conn.prepare(WATCHED_TITLES_QUERY)?;
        let rows = stmt.query_map([PLEX_MOVIE_TYPE, PLEX_EPISODE_TYPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (raw_title, last_viewed_at) = row?;
            let title = title_case(&raw_title.split_whitespace().collect::<Vec<_>>().join(" "));
            if title.is_empty() {
                continue;
            }
            let watch_date = last_viewed_at
                .map(|secs| format_view_date(secs, timezone))
                .unwrap_or_default();
            entries.push(NormalizedEntry {
                title,
                watch_date,
                is_venue_watch: false,
            });
        }
        info!("Imported {} watched titles from Plex", entries.len());
        Ok(entries)
    }
}
