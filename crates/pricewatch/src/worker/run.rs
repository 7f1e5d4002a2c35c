use chrono::Utc;
use serde::Serialize;

/// Generates a sortable run id: `YYYYMMDD-HHMMSS-<8 hex>`.
pub fn new_run_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y%m%d-%H%M%S"), &suffix[..8])
}

/// How a supervised run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub run_id: String,
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
    pub stopped: bool,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && self.error_message.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopOutcome {
    pub run_id: Option<String>,
    pub pid: u32,
    /// Whether the worker outlived the grace period and was killed.
    pub forced: bool,
    /// Set when the kill signal could not be delivered. The run is recorded
    /// as stopped regardless.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_shape() {
        let id = new_run_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
        assert_ne!(new_run_id(), id);
    }

    #[test]
    fn test_outcome_success() {
        let ok = RunOutcome {
            run_id: "r".to_string(),
            exit_code: Some(0),
            error_message: None,
            stopped: false,
        };
        assert!(ok.success());

        let failed = RunOutcome {
            exit_code: Some(2),
            error_message: Some("Worker exited with code 2".to_string()),
            ..ok
        };
        assert!(!failed.success());
    }
}
