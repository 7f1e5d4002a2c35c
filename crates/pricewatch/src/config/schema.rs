use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_module_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_python_executable() -> String {
    "python3".to_string()
}

fn default_run_script() -> String {
    "scrape.py".to_string()
}

fn default_analyze_script() -> String {
    "analyze.py".to_string()
}

fn default_config_manager_script() -> String {
    "config_manager.py".to_string()
}

fn default_hotels_file() -> String {
    "hotels.json".to_string()
}

fn default_stop_grace_period_ms() -> u64 {
    1000
}

fn default_log_retention() -> usize {
    10
}

fn default_snapshot_limit() -> usize {
    10
}

/// Orchestrator configuration.
///
/// Every field has a default so an empty document is a valid config rooted
/// at the current directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricewatchConfig {
    /// Directory holding the worker scripts and the `outputs/`, `archive/`
    /// and `logs/` directories.
    #[serde(default = "default_module_root")]
    pub module_root: PathBuf,

    #[serde(default = "default_python_executable")]
    pub python_executable: String,

    #[serde(default = "default_run_script")]
    pub run_script: String,

    #[serde(default = "default_analyze_script")]
    pub analyze_script: String,

    #[serde(default = "default_config_manager_script")]
    pub config_manager_script: String,

    /// Worker property list, used to derive the expected property count.
    #[serde(default = "default_hotels_file")]
    pub hotels_file: String,

    /// Overrides the property count derived from `hotels_file`.
    #[serde(default)]
    pub total_properties: Option<usize>,

    #[serde(default = "default_stop_grace_period_ms")]
    pub stop_grace_period_ms: u64,

    /// Number of run logs kept after each run.
    #[serde(default = "default_log_retention")]
    pub log_retention: usize,

    /// Default snapshot count for `get_snapshots` callers that pass none.
    #[serde(default = "default_snapshot_limit")]
    pub snapshot_limit: usize,

    #[serde(default)]
    pub fallback_dirs: FallbackDirsConfig,
}

/// Per-category fallback search directories.
///
/// `None` selects the built-in defaults; `Some` replaces them, so an empty
/// list disables fallback search for that category. Relative entries are
/// resolved against the module root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FallbackDirsConfig {
    #[serde(default)]
    pub outputs: Option<Vec<PathBuf>>,
    #[serde(default)]
    pub archive: Option<Vec<PathBuf>>,
    #[serde(default)]
    pub logs: Option<Vec<PathBuf>>,
}

impl Default for PricewatchConfig {
    fn default() -> Self {
        Self {
            module_root: default_module_root(),
            python_executable: default_python_executable(),
            run_script: default_run_script(),
            analyze_script: default_analyze_script(),
            config_manager_script: default_config_manager_script(),
            hotels_file: default_hotels_file(),
            total_properties: None,
            stop_grace_period_ms: default_stop_grace_period_ms(),
            log_retention: default_log_retention(),
            snapshot_limit: default_snapshot_limit(),
            fallback_dirs: FallbackDirsConfig::default(),
        }
    }
}

impl PricewatchConfig {
    /// Default configuration rooted at `module_root`.
    pub fn for_root<P: AsRef<Path>>(module_root: P) -> Self {
        Self {
            module_root: module_root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn stop_grace_period(&self) -> Duration {
        Duration::from_millis(self.stop_grace_period_ms)
    }

    pub fn hotels_path(&self) -> PathBuf {
        self.module_root.join(&self.hotels_file)
    }
}
