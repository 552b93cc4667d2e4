//! Watch-log file input.

use std::path::Path;

use log::info;

use crate::entry_parser::parse_entries;
use crate::records::NormalizedEntry;

/// Reads a UTF-8 watch log and normalizes its entries.
pub fn read_watch_log(path: &Path) -> Result<Vec<NormalizedEntry>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read watch log {}: {}", path.display(), err))?;
    let entries = parse_entries(&text);
    info!(
        "Read {} entries from {} ({} lines)",
        entries.len(),
        path.display(),
        text.lines().count()
    );
    Ok(entries)
}
