//! Isolated module root for integration tests.
//!
//! Each harness owns a temp directory laid out like a worker module root
//! (`outputs/`, `archive/`, `logs/`) and a config that runs worker scripts
//! with `/bin/sh`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use pricewatch::storage::Layout;
use pricewatch::{ArtifactCategory, Orchestrator, PricewatchConfig};

pub struct TestHarness {
    temp_dir: TempDir,
    pub layout: Layout,
    pub config: PricewatchConfig,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let layout = Layout::new(temp_dir.path());
        for category in ArtifactCategory::ALL {
            std::fs::create_dir_all(layout.dir(category)).expect("Failed to create layout dir");
        }

        let mut config = PricewatchConfig::for_root(temp_dir.path());
        config.python_executable = "/bin/sh".to_string();
        config.run_script = "scrape.sh".to_string();
        config.analyze_script = "analyze.sh".to_string();
        config.config_manager_script = "config_manager.sh".to_string();
        config.stop_grace_period_ms = 100;

        Self {
            temp_dir,
            layout,
            config,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.config.clone())
    }

    /// Writes a file relative to the module root, creating parents.
    pub fn write(&self, relative: impl AsRef<Path>, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        self.write_at(&path, content);
        path
    }

    pub fn write_at(&self, path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    pub fn write_run_script(&self, body: &str) {
        self.write(&self.config.run_script, body);
    }

    pub fn write_analyze_script(&self, body: &str) {
        self.write(&self.config.analyze_script, body);
    }

    pub fn write_hotels(&self, count: usize) {
        let hotels: Vec<_> = (0..count)
            .map(|i| serde_json::json!({"name": format!("Hotel {}", i), "slug": format!("hotel-{}", i)}))
            .collect();
        self.write(&self.config.hotels_file, &serde_json::to_string(&hotels).unwrap());
    }

    pub fn write_progress(&self, completed: usize) {
        let slugs: Vec<String> = (0..completed).map(|i| format!("hotel-{}", i)).collect();
        let doc = serde_json::json!({
            "date": "2026-01-05",
            "completed_properties": slugs,
            "last_updated": "2026-01-05T09:00:00",
        });
        self.write_at(&self.layout.daily_progress(), &doc.to_string());
    }

    /// Backdates a file's modification time by `secs`.
    pub fn age(&self, path: &Path, secs: u64) {
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(path)
            .expect("Failed to open file");
        file.set_modified(SystemTime::now() - Duration::from_secs(secs))
            .expect("Failed to set mtime");
    }
}
