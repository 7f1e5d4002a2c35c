pub mod config;
pub mod error;
pub mod freshness;
pub mod orchestrator;
pub mod records;
pub mod run_state;
pub mod snapshot;
pub mod storage;
pub mod worker;

pub use config::{load_config, PricewatchConfig};
pub use error::{
    AnalyzerError, ArtifactError, ConfigError, ConfigManagerError, PricewatchError, Result,
    StoreError, SupervisorError,
};
pub use orchestrator::Orchestrator;
pub use records::{Analysis, DailyPricingRecord, DailyProgress, HistoryEntry};
pub use run_state::{RunState, RunStatus};
pub use snapshot::{Snapshot, SnapshotSource};
pub use storage::{ArtifactCategory, FileArtifact, FileTarget, PathResolver};
pub use worker::{RunOutcome, StopOutcome, WorkerConfig};
