//! Assembles the viewable history of analyses: the live one plus every
//! archived day, newest first, each paired with its raw daily rows.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use glob::Pattern;
use log::{debug, warn};
use regex::Regex;
use serde::Serialize;

use crate::records::{read_analysis, read_pricing_data, Analysis, DailyPricingRecord};
use crate::storage::layout::ARCHIVE_ANALYSIS_PREFIX;
use crate::storage::{ArtifactCategory, PathResolver};

pub const CURRENT_SNAPSHOT_ID: &str = "current";

static RE_ARCHIVE_ANALYSIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^pricing_analysis_(\d{8})\.json$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    Current,
    Archive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub source: SnapshotSource,
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_date: Option<String>,
    pub analysis: Analysis,
    pub daily_data: Vec<DailyPricingRecord>,
}

impl Snapshot {
    /// Identity used for de-duplication: the generation timestamp, or the id
    /// when the timestamp is blank.
    pub fn identity(&self) -> &str {
        if self.generated_at.trim().is_empty() {
            &self.id
        } else {
            &self.generated_at
        }
    }
}

pub struct SnapshotResolver<'a> {
    resolver: &'a PathResolver,
}

impl<'a> SnapshotResolver<'a> {
    pub fn new(resolver: &'a PathResolver) -> Self {
        Self { resolver }
    }

    /// Up to `limit` distinct snapshots, most recent first.
    pub fn list_snapshots(&self, limit: usize) -> Vec<Snapshot> {
        if limit == 0 {
            return Vec::new();
        }
        self.collect(Some(limit))
    }

    /// Every distinct snapshot, most recent first.
    pub fn list_all_snapshots(&self) -> Vec<Snapshot> {
        self.collect(None)
    }

    fn collect(&self, limit: Option<usize>) -> Vec<Snapshot> {
        let mut snapshots = Vec::new();
        let mut seen = HashSet::new();
        let is_full = |count: usize| limit.is_some_and(|limit| count >= limit);

        if let Some(current) = self.current_snapshot() {
            seen.insert(current.identity().to_string());
            snapshots.push(current);
        }

        for date in self.archive_dates() {
            if is_full(snapshots.len()) {
                break;
            }
            let Some(snapshot) = self.archive_snapshot(&date) else {
                continue;
            };
            if seen.insert(snapshot.identity().to_string()) {
                snapshots.push(snapshot);
            } else {
                debug!("Skipping archive {}: duplicates an earlier snapshot", date);
            }
        }

        if snapshots.is_empty() {
            // The live files may have been mid-rewrite on the first attempt.
            if let Some(current) = self.current_snapshot() {
                snapshots.push(current);
            }
        }

        snapshots
    }

    /// The live analysis with the live raw rows. `None` when no readable
    /// analysis exists.
    pub fn current_snapshot(&self) -> Option<Snapshot> {
        let layout = self.resolver.layout();
        let analysis_path = self
            .resolver
            .resolve(ArtifactCategory::Outputs, &layout.analysis())?;
        let analysis = read_analysis(&analysis_path)?;
        let daily_data = self
            .resolver
            .resolve(ArtifactCategory::Outputs, &layout.pricing_data())
            .map(|path| read_pricing_data(&path))
            .unwrap_or_default();

        Some(Snapshot {
            id: CURRENT_SNAPSHOT_ID.to_string(),
            source: SnapshotSource::Current,
            generated_at: analysis.generated_at.clone(),
            archive_date: None,
            analysis,
            daily_data,
        })
    }

    /// The archived analysis for `date` (`YYYYMMDD`). A missing raw CSV
    /// yields empty daily data, not a missing snapshot.
    pub fn archive_snapshot(&self, date: &str) -> Option<Snapshot> {
        let layout = self.resolver.layout();
        let analysis_path = self
            .resolver
            .resolve(ArtifactCategory::Archive, &layout.archive_analysis(date))?;
        let Some(analysis) = read_analysis(&analysis_path) else {
            warn!("Skipping unreadable archive {}", analysis_path.display());
            return None;
        };
        let daily_data = self
            .resolver
            .resolve(ArtifactCategory::Archive, &layout.archive_data(date))
            .map(|path| read_pricing_data(&path))
            .unwrap_or_default();

        Some(Snapshot {
            id: format!("archive-{}", date),
            source: SnapshotSource::Archive,
            generated_at: analysis.generated_at.clone(),
            archive_date: Some(date.to_string()),
            analysis,
            daily_data,
        })
    }

    /// Date tags of every archived analysis across all archive directories,
    /// newest first, without duplicates.
    pub fn archive_dates(&self) -> Vec<String> {
        let mut dates = BTreeSet::new();
        for dir in self.resolver.search_dirs(ArtifactCategory::Archive) {
            dates.extend(archive_dates_in(&dir));
        }
        dates.into_iter().rev().collect()
    }
}

fn archive_dates_in(dir: &Path) -> Vec<String> {
    let Some(dir_str) = dir.to_str() else {
        debug!("Skipping non UTF-8 archive directory {}", dir.display());
        return Vec::new();
    };
    let pattern = format!(
        "{}/{}*.json",
        Pattern::escape(dir_str),
        ARCHIVE_ANALYSIS_PREFIX
    );

    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Invalid archive pattern '{}': {}", pattern, e);
            return Vec::new();
        }
    };

    paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            let captures = RE_ARCHIVE_ANALYSIS.captures(name)?;
            Some(captures[1].to_string())
        })
        .collect()
}
