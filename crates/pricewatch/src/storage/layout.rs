//! Filesystem layout of the worker's module root.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const RUN_STATE_FILE: &str = "run_state.json";
pub const RUN_LOCK_FILE: &str = "run.lock";
pub const HISTORY_FILE: &str = "scrape_log.json";
pub const DAILY_PROGRESS_FILE: &str = "daily_progress.json";
pub const ANALYSIS_FILE: &str = "pricing_analysis.json";
pub const PRICING_DATA_FILE: &str = "pricing_data.csv";

pub const ARCHIVE_ANALYSIS_PREFIX: &str = "pricing_analysis_";
pub const ARCHIVE_DATA_PREFIX: &str = "pricing_data_";
pub const RUN_LOG_PREFIX: &str = "run-";

/// Directory category an artifact lives in. Each category has its own
/// fallback search list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactCategory {
    Outputs,
    Archive,
    Logs,
}

impl ArtifactCategory {
    pub const ALL: [ArtifactCategory; 3] = [Self::Outputs, Self::Archive, Self::Logs];

    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Outputs => "outputs",
            Self::Archive => "archive",
            Self::Logs => "logs",
        }
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Primary locations of every artifact, relative to a module root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, category: ArtifactCategory) -> PathBuf {
        self.root.join(category.dir_name())
    }

    pub fn run_state(&self) -> PathBuf {
        self.dir(ArtifactCategory::Outputs).join(RUN_STATE_FILE)
    }

    pub fn run_lock(&self) -> PathBuf {
        self.dir(ArtifactCategory::Outputs).join(RUN_LOCK_FILE)
    }

    pub fn history(&self) -> PathBuf {
        self.dir(ArtifactCategory::Outputs).join(HISTORY_FILE)
    }

    pub fn daily_progress(&self) -> PathBuf {
        self.dir(ArtifactCategory::Outputs).join(DAILY_PROGRESS_FILE)
    }

    pub fn analysis(&self) -> PathBuf {
        self.dir(ArtifactCategory::Outputs).join(ANALYSIS_FILE)
    }

    pub fn pricing_data(&self) -> PathBuf {
        self.dir(ArtifactCategory::Outputs).join(PRICING_DATA_FILE)
    }

    pub fn run_log(&self, run_id: &str) -> PathBuf {
        self.dir(ArtifactCategory::Logs)
            .join(format!("{}{}.log", RUN_LOG_PREFIX, run_id))
    }

    pub fn archive_analysis(&self, date_tag: &str) -> PathBuf {
        self.dir(ArtifactCategory::Archive)
            .join(format!("{}{}.json", ARCHIVE_ANALYSIS_PREFIX, date_tag))
    }

    pub fn archive_data(&self, date_tag: &str) -> PathBuf {
        self.dir(ArtifactCategory::Archive)
            .join(format!("{}{}.csv", ARCHIVE_DATA_PREFIX, date_tag))
    }
}
