//! Entry point tying the supervisor, analyzer and read paths to one module
//! root.

use log::info;

use crate::config::PricewatchConfig;
use crate::error::{AnalyzerError, Result};
use crate::freshness;
use crate::records::{
    read_daily_progress, read_history, read_pricing_data, DailyPricingRecord, HistoryEntry,
};
use crate::run_state::RunState;
use crate::snapshot::{Snapshot, SnapshotResolver};
use crate::storage::{read_artifact, ArtifactCategory, FileArtifact, FileTarget, PathResolver};
use crate::worker::{
    analyzer, config_manager, AnalyzerOutcome, RunOutcome, StopOutcome, Supervisor,
    WorkerConfig, WorkerSettings,
};

pub struct Orchestrator {
    config: PricewatchConfig,
    resolver: PathResolver,
    settings: WorkerSettings,
    supervisor: Supervisor,
}

impl Orchestrator {
    pub fn new(config: PricewatchConfig) -> Self {
        let supervisor = Supervisor::new(&config);
        Self::with_supervisor(config, supervisor)
    }

    /// Uses a prepared supervisor, e.g. one with a custom process control.
    pub fn with_supervisor(config: PricewatchConfig, supervisor: Supervisor) -> Self {
        Self {
            resolver: PathResolver::from_config(&config),
            settings: WorkerSettings::from_config(&config),
            supervisor,
            config,
        }
    }

    pub fn config(&self) -> &PricewatchConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn get_status(&self) -> RunState {
        self.supervisor.status()
    }

    pub async fn start_run(&self) -> Result<String> {
        Ok(self.supervisor.start().await?)
    }

    pub async fn stop_run(&self) -> Result<StopOutcome> {
        Ok(self.supervisor.stop().await?)
    }

    pub async fn wait_for_completion(&self) -> Result<RunOutcome> {
        Ok(self.supervisor.wait_for_completion().await?)
    }

    /// Runs the analysis script once a complete scrape is on disk and no run
    /// is active.
    pub async fn run_analyzer(&self) -> Result<AnalyzerOutcome> {
        if self.supervisor.is_running() {
            return Err(AnalyzerError::AlreadyRunning.into());
        }

        let layout = self.resolver.layout();
        let raw_data = self
            .resolver
            .resolve(ArtifactCategory::Outputs, &layout.pricing_data());
        let progress = self
            .resolver
            .resolve(ArtifactCategory::Outputs, &layout.daily_progress())
            .and_then(|path| read_daily_progress(&path));
        let total = freshness::expected_total(&self.config);

        analyzer::check_preconditions(raw_data.as_deref(), progress.as_ref(), total)?;
        Ok(analyzer::run_analyzer(&self.settings).await?)
    }

    /// Whether the raw data of a complete scrape is newer than the analysis.
    pub fn is_outdated(&self) -> bool {
        let total = freshness::expected_total(&self.config);
        let inputs = freshness::gather_inputs(&self.resolver, total);
        let outdated = freshness::is_outdated(&inputs);
        if outdated {
            info!("Analysis is older than the completed scrape data");
        }
        outdated
    }

    /// Most recent snapshots; `None` uses the configured default limit.
    pub fn get_snapshots(&self, limit: Option<usize>) -> Vec<Snapshot> {
        let limit = limit.unwrap_or(self.config.snapshot_limit);
        SnapshotResolver::new(&self.resolver).list_snapshots(limit)
    }

    pub fn get_all_snapshots(&self) -> Vec<Snapshot> {
        SnapshotResolver::new(&self.resolver).list_all_snapshots()
    }

    /// Raw rows of the live scrape; empty when none exist.
    pub fn get_daily_pricing_data(&self) -> Vec<DailyPricingRecord> {
        let layout = self.resolver.layout();
        self.resolver
            .resolve(ArtifactCategory::Outputs, &layout.pricing_data())
            .map(|path| read_pricing_data(&path))
            .unwrap_or_default()
    }

    pub fn get_history(&self) -> Vec<HistoryEntry> {
        let layout = self.resolver.layout();
        self.resolver
            .resolve(ArtifactCategory::Outputs, &layout.history())
            .map(|path| read_history(&path))
            .unwrap_or_default()
    }

    /// Reads a named artifact, e.g. `analysis` or `archive-data:20260104`.
    pub fn get_file(&self, target: &str) -> Result<FileArtifact> {
        let target: FileTarget = target.parse()?;
        Ok(read_artifact(&self.resolver, &target)?)
    }

    pub async fn get_worker_config(&self) -> Result<WorkerConfig> {
        Ok(config_manager::get_worker_config(&self.settings).await?)
    }

    pub async fn update_worker_config(&self, update: &WorkerConfig) -> Result<()> {
        Ok(config_manager::update_worker_config(&self.settings, update).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricewatchError;
    use crate::storage::Layout;
    use tempfile::TempDir;

    fn orchestrator(dir: &TempDir) -> Orchestrator {
        let mut config = PricewatchConfig::for_root(dir.path());
        config.total_properties = Some(2);
        Orchestrator::new(config)
    }

    #[test]
    fn test_empty_root_read_paths() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir);

        assert!(!orch.get_status().is_running());
        assert!(!orch.is_outdated());
        assert!(orch.get_snapshots(None).is_empty());
        assert!(orch.get_daily_pricing_data().is_empty());
        assert!(orch.get_history().is_empty());
        assert!(matches!(
            orch.get_file("analysis"),
            Err(PricewatchError::Artifact(_))
        ));
        assert!(orch.get_file("log:../../etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_analyzer_needs_data() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir);

        let err = orch.run_analyzer().await.unwrap_err();
        assert_eq!(err.to_string(), "Analyzer error: No pricing data found. Run the scraper first.");
    }

    #[tokio::test]
    async fn test_analyzer_refused_while_running() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir);
        let layout = Layout::new(dir.path());
        crate::run_state::RunStateStore::new(layout.run_state())
            .write(&RunState::running(
                "r1",
                1,
                layout.run_log("r1"),
                chrono::Utc::now(),
            ))
            .unwrap();

        assert!(matches!(
            orch.run_analyzer().await,
            Err(PricewatchError::Analyzer(AnalyzerError::AlreadyRunning))
        ));
    }
}
