use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the worker's append-only `scrape_log.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub scrape_success: Option<bool>,
    #[serde(default)]
    pub analysis_success: Option<bool>,
    /// Worker configuration at the time of the run.
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HistoryEntry {
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }
}

/// Parses the worker's ISO-8601 timestamps, with or without an offset.
/// Offset timestamps are normalised to UTC.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Reads the run history, newest first. Entries that fail to decode are
/// skipped individually; an unreadable file yields an empty list.
pub fn read_history(path: &Path) -> Vec<HistoryEntry> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::debug!("Could not read history {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let raw: Vec<Value> = match serde_json::from_str(&text) {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!("Ignoring malformed history {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let mut entries: Vec<HistoryEntry> = raw
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();

    sort_newest_first(&mut entries);
    entries
}

fn sort_newest_first(entries: &mut [HistoryEntry]) {
    // Unparseable timestamps sort last; ties keep file order.
    entries.sort_by(|a, b| {
        let key_a = (a.parsed_timestamp(), &a.timestamp);
        let key_b = (b.parsed_timestamp(), &b.timestamp);
        key_b.cmp(&key_a)
    });
}
