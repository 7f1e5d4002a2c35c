//! Durable run lifecycle record and the lock that makes runs exclusive.

pub mod lock;
pub mod store;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use lock::{LockRecord, RunLock};
pub use store::RunStateStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
}

/// Persisted lifecycle of the single worker run.
///
/// While `status` is `Running`, `run_id`, `pid` and `log_file` are set. The
/// `last_*` fields describe the most recent finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Set on a running state once a stop has been requested, so the monitor
    /// of that run can tell a requested stop from a crash.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stop_requested: bool,
}

impl RunState {
    pub fn running(run_id: &str, pid: u32, log_file: PathBuf, started_at: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::Running,
            started_at: Some(started_at),
            run_id: Some(run_id.to_string()),
            pid: Some(pid),
            log_file: Some(log_file),
            ..Self::default()
        }
    }

    /// Idle state recording the end of `run_id`.
    pub fn finished(
        run_id: &str,
        exit_code: Option<i32>,
        error_message: Option<String>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: RunStatus::Idle,
            last_ended_at: Some(ended_at),
            last_exit_code: exit_code,
            last_run_id: Some(run_id.to_string()),
            error_message,
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// Whether this state is the running state of `run_id`.
    pub fn is_running_run(&self, run_id: &str) -> bool {
        self.is_running() && self.run_id.as_deref() == Some(run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_constructor() {
        let now = Utc::now();
        let state = RunState::running("r1", 42, PathBuf::from("/logs/run-r1.log"), now);
        assert!(state.is_running());
        assert_eq!(state.run_id.as_deref(), Some("r1"));
        assert_eq!(state.pid, Some(42));
        assert!(state.log_file.is_some());
    }

    #[test]
    fn test_serialized_shape() {
        let state = RunState::finished("r1", Some(0), None, Utc::now());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["lastRunId"], "r1");
        assert_eq!(json["lastExitCode"], 0);
        assert!(json.get("pid").is_none());
    }
}
