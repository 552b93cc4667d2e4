//! Watch-log line normalization.
//!
//! A log line looks like `<title> (<MM-DD>) (cinema)`, with the date and the venue
//! marker optional and in any order. Both may also share one group, as in
//! `(10-15 cinema)` or `(cinema, 10-15)`. Lines without a closed parenthesis are dropped.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::records::NormalizedEntry;

static SUFFIX_GROUP_PATTERN: OnceLock<Regex> = OnceLock::new();
static DATE_TOKEN_PATTERN: OnceLock<Regex> = OnceLock::new();

fn suffix_group_pattern() -> &'static Regex {
    SUFFIX_GROUP_PATTERN
        .get_or_init(|| Regex::new(r"\(([^()]*)\)").expect("suffix group pattern should compile"))
}

fn date_token_pattern() -> &'static Regex {
    DATE_TOKEN_PATTERN
        .get_or_init(|| Regex::new(r"^\d{2}-\d{2}$").expect("date token pattern should compile"))
}

/// Tokens found in one parenthesized suffix group.
#[derive(Debug, Default)]
struct SuffixTokens<'a> {
    date: Option<&'a str>,
    is_venue: bool,
}

/// Splits a group body on spaces and commas. Returns `None` unless every token is a
/// `MM-DD` date or the `cinema` marker, so `(1995)` or `(director's cut)` are not suffixes.
fn suffix_tokens(body: &str) -> Option<SuffixTokens<'_>> {
    let mut tokens = SuffixTokens::default();
    let mut seen_any = false;
    for token in body
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|token| !token.is_empty())
    {
        seen_any = true;
        if token.eq_ignore_ascii_case("cinema") {
            tokens.is_venue = true;
        } else if date_token_pattern().is_match(token) {
            if tokens.date.is_none() {
                tokens.date = Some(token);
            }
        } else {
            return None;
        }
    }
    seen_any.then_some(tokens)
}

fn has_closed_group(line: &str) -> bool {
    line.find('(')
        .is_some_and(|open| line[open + 1..].contains(')'))
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title-cases `value`: a letter is upper-cased when the character before it is not a
/// letter, lower-cased otherwise. `spider-man` becomes `Spider-Man`.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_is_cased = false;
    for ch in value.chars() {
        let is_cased = ch.is_uppercase() || ch.is_lowercase();
        if is_cased && previous_is_cased {
            out.extend(ch.to_lowercase());
        } else if is_cased {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        previous_is_cased = is_cased;
    }
    out
}

/// Parses one trimmed log line into a normalized entry.
pub fn parse_entry_line(line: &str) -> Option<NormalizedEntry> {
    let line = line.trim();
    if !has_closed_group(line) {
        return None;
    }

    let mut watch_date = String::new();
    let mut is_venue_watch = false;
    let remaining = suffix_group_pattern().replace_all(line, |captures: &regex::Captures| {
        let body = captures.get(1).map_or("", |body| body.as_str());
        match suffix_tokens(body) {
            Some(tokens) => {
                if let Some(date) = tokens.date {
                    if watch_date.is_empty() {
                        watch_date = date.to_string();
                    }
                }
                is_venue_watch |= tokens.is_venue;
                " ".to_string()
            }
            None => captures[0].to_string(),
        }
    });

    let title = title_case(&collapse_whitespace(&remaining));
    if title.is_empty() {
        debug!("Skipping log line with an empty title: {line}");
        return None;
    }

    Some(NormalizedEntry {
        title,
        watch_date,
        is_venue_watch,
    })
}

/// Parses every non-blank line of a watch log, preserving input order.
pub fn parse_entries(text: &str) -> Vec<NormalizedEntry> {
    let mut entries = Vec::new();
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match parse_entry_line(line) {
            Some(entry) => entries.push(entry),
            None => debug!("Skipping log line without a parenthesized suffix: {line}"),
        }
    }
    entries
}
