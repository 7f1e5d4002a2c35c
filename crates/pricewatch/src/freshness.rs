//! Decides whether the analysis artifact lags behind the raw scrape data.

use std::path::Path;
use std::time::SystemTime;

use log::debug;
use serde_json::Value;

use crate::config::PricewatchConfig;
use crate::records::read_daily_progress;
use crate::storage::{ArtifactCategory, PathResolver};

/// Filesystem observations the freshness decision is made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessInputs {
    pub raw_data_modified: Option<SystemTime>,
    pub analysis_modified: Option<SystemTime>,
    pub completed: usize,
    pub total: usize,
}

/// `true` only when raw data is newer than the analysis and today's scrape
/// has covered every property. Missing artifacts or a partial scrape are
/// never outdated, so an in-flight run cannot trigger a re-analysis.
pub fn is_outdated(inputs: &FreshnessInputs) -> bool {
    let (Some(raw), Some(analysis)) = (inputs.raw_data_modified, inputs.analysis_modified) else {
        return false;
    };
    if inputs.total == 0 || inputs.completed < inputs.total {
        return false;
    }
    raw > analysis
}

/// Number of properties a complete scrape covers: the configured
/// `total_properties`, else the entry count of the worker's hotels file.
/// Zero when neither is known.
pub fn expected_total(config: &PricewatchConfig) -> usize {
    if let Some(total) = config.total_properties {
        return total;
    }
    count_properties(&config.hotels_path()).unwrap_or(0)
}

/// Counts entries in a hotels file: a top-level array, a `hotels` array, or
/// the keys of a top-level object.
pub fn count_properties(path: &Path) -> Option<usize> {
    let text = std::fs::read_to_string(path).ok()?;
    let value: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            debug!("Unreadable hotels file {}: {}", path.display(), e);
            return None;
        }
    };
    match value {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => match map.get("hotels") {
            Some(Value::Array(items)) => Some(items.len()),
            _ => Some(map.len()),
        },
        _ => None,
    }
}

fn modified(path: Option<&Path>) -> Option<SystemTime> {
    std::fs::metadata(path?).and_then(|m| m.modified()).ok()
}

/// Gathers [`FreshnessInputs`] through the resolver.
pub fn gather_inputs(resolver: &PathResolver, total: usize) -> FreshnessInputs {
    let layout = resolver.layout();
    let raw = resolver.resolve(ArtifactCategory::Outputs, &layout.pricing_data());
    let analysis = resolver.resolve(ArtifactCategory::Outputs, &layout.analysis());
    let completed = resolver
        .resolve(ArtifactCategory::Outputs, &layout.daily_progress())
        .and_then(|path| read_daily_progress(&path))
        .map_or(0, |p| p.completed_count());

    FreshnessInputs {
        raw_data_modified: modified(raw.as_deref()),
        analysis_modified: modified(analysis.as_deref()),
        completed,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::storage::Layout;

    fn at(secs: u64) -> Option<SystemTime> {
        Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
    }

    fn inputs(raw: Option<SystemTime>, analysis: Option<SystemTime>, completed: usize) -> FreshnessInputs {
        FreshnessInputs {
            raw_data_modified: raw,
            analysis_modified: analysis,
            completed,
            total: 3,
        }
    }

    #[test]
    fn test_decision_table() {
        assert!(is_outdated(&inputs(at(200), at(100), 3)));
        assert!(!is_outdated(&inputs(at(100), at(200), 3)));
        assert!(!is_outdated(&inputs(at(100), at(100), 3)));
        assert!(!is_outdated(&inputs(at(200), at(100), 2)));
        assert!(!is_outdated(&inputs(None, at(100), 3)));
        assert!(!is_outdated(&inputs(at(200), None, 3)));
    }

    #[test]
    fn test_unknown_total_never_outdated() {
        let mut i = inputs(at(200), at(100), 5);
        i.total = 0;
        assert!(!is_outdated(&i));
    }

    #[test]
    fn test_count_properties_shapes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hotels.json");

        std::fs::write(&path, r#"[{"name": "a"}, {"name": "b"}]"#).unwrap();
        assert_eq!(count_properties(&path), Some(2));

        std::fs::write(&path, r#"{"hotels": [1, 2, 3]}"#).unwrap();
        assert_eq!(count_properties(&path), Some(3));

        std::fs::write(&path, r#"{"a": "url", "b": "url"}"#).unwrap();
        assert_eq!(count_properties(&path), Some(2));

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(count_properties(&path), None);
    }

    #[test]
    fn test_expected_total_prefers_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hotels.json"), "[1, 2]").unwrap();

        let mut config = PricewatchConfig::for_root(dir.path());
        assert_eq!(expected_total(&config), 2);

        config.total_properties = Some(7);
        assert_eq!(expected_total(&config), 7);

        config.total_properties = None;
        config.hotels_file = "missing.json".to_string();
        assert_eq!(expected_total(&config), 0);
    }

    #[test]
    fn test_gather_from_disk() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        std::fs::create_dir_all(layout.dir(ArtifactCategory::Outputs)).unwrap();

        let analysis = std::fs::File::create(layout.analysis()).unwrap();
        analysis
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();
        std::fs::write(layout.pricing_data(), "hotel_name,check_in_date\n").unwrap();
        std::fs::write(
            layout.daily_progress(),
            r#"{"date": "2026-01-01", "completed_properties": ["a", "b"]}"#,
        )
        .unwrap();

        let resolver = PathResolver::new(layout);
        let complete = gather_inputs(&resolver, 2);
        assert_eq!(complete.completed, 2);
        assert!(is_outdated(&complete));

        let partial = gather_inputs(&resolver, 3);
        assert!(!is_outdated(&partial));
    }
}
