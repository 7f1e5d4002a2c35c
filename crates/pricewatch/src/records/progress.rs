use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// The worker's per-day completion marker (`daily_progress.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyProgress {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub completed_properties: BTreeSet<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl DailyProgress {
    pub fn completed_count(&self) -> usize {
        self.completed_properties.len()
    }

    /// `true` once every one of `total` properties is done. An unknown (zero)
    /// total never counts as complete.
    pub fn is_complete(&self, total: usize) -> bool {
        total > 0 && self.completed_count() >= total
    }
}

/// Reads the progress marker. Absent, empty or malformed files yield `None`.
pub fn read_daily_progress(path: &Path) -> Option<DailyProgress> {
    let text = std::fs::read_to_string(path).ok()?;
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(&text) {
        Ok(progress) => Some(progress),
        Err(e) => {
            log::warn!("Ignoring malformed progress file {}: {}", path.display(), e);
            None
        }
    }
}
