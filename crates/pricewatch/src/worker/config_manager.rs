//! Bridge to the worker's own configuration script.
//!
//! `get` prints the current settings as JSON on stdout; `set` reads a JSON
//! patch from the `CONFIG_UPDATE` environment variable.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigManagerError;
use crate::worker::{output_tail, WorkerSettings};

pub const CONFIG_UPDATE_ENV: &str = "CONFIG_UPDATE";

/// The scraper's tunables. Every field is optional so the same type serves
/// as a partial update; unset fields are left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(rename = "DAYS_AHEAD", default, skip_serializing_if = "Option::is_none")]
    pub days_ahead: Option<u32>,
    #[serde(rename = "OCCUPANCY_MODE", default, skip_serializing_if = "Option::is_none")]
    pub occupancy_mode: Option<bool>,
    #[serde(rename = "CHECK_IN_OFFSETS", default, skip_serializing_if = "Option::is_none")]
    pub check_in_offsets: Option<Vec<i64>>,
    #[serde(rename = "STAY_DURATIONS", default, skip_serializing_if = "Option::is_none")]
    pub stay_durations: Option<Vec<u32>>,
    #[serde(rename = "GUESTS", default, skip_serializing_if = "Option::is_none")]
    pub guests: Option<u32>,
    #[serde(rename = "ROOMS", default, skip_serializing_if = "Option::is_none")]
    pub rooms: Option<u32>,
    #[serde(rename = "REFERENCE_PROPERTY", default, skip_serializing_if = "Option::is_none")]
    pub reference_property: Option<String>,
    #[serde(rename = "HEADLESS", default, skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,
    #[serde(rename = "REQUEST_DELAY", default, skip_serializing_if = "Option::is_none")]
    pub request_delay: Option<f64>,
    #[serde(rename = "OCCUPANCY_CHECK_INTERVAL", default, skip_serializing_if = "Option::is_none")]
    pub occupancy_check_interval: Option<u32>,
    #[serde(rename = "OCCUPANCY_STAY_DURATION", default, skip_serializing_if = "Option::is_none")]
    pub occupancy_stay_duration: Option<u32>,
    #[serde(rename = "ENABLE_ARCHIVING", default, skip_serializing_if = "Option::is_none")]
    pub enable_archiving: Option<bool>,
    #[serde(rename = "MAX_ARCHIVE_FILES", default, skip_serializing_if = "Option::is_none")]
    pub max_archive_files: Option<u32>,
    #[serde(rename = "BROWSER_TIMEOUT", default, skip_serializing_if = "Option::is_none")]
    pub browser_timeout: Option<u64>,
    /// Settings this crate does not model, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkerConfig {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Reads the worker's current configuration.
pub async fn get_worker_config(
    settings: &WorkerSettings,
) -> Result<WorkerConfig, ConfigManagerError> {
    let output = settings
        .script_command(&settings.config_manager_script, &["get"])
        .output()
        .await
        .map_err(ConfigManagerError::SpawnFailed)?;

    if !output.status.success() {
        return Err(ConfigManagerError::Failed {
            code: output.status.code(),
            stderr: output_tail(&output.stderr, 20),
        });
    }

    serde_json::from_slice(&output.stdout).map_err(ConfigManagerError::Decode)
}

/// Applies `update` through the worker's config script. Only fields set in
/// `update` are sent.
pub async fn update_worker_config(
    settings: &WorkerSettings,
    update: &WorkerConfig,
) -> Result<(), ConfigManagerError> {
    let payload = serde_json::to_string(update).map_err(ConfigManagerError::Encode)?;
    debug!("Sending worker config update: {}", payload);

    let output = settings
        .script_command(&settings.config_manager_script, &["set"])
        .env(CONFIG_UPDATE_ENV, &payload)
        .output()
        .await
        .map_err(ConfigManagerError::SpawnFailed)?;

    if !output.status.success() {
        return Err(ConfigManagerError::Failed {
            code: output.status.code(),
            stderr: output_tail(&output.stderr, 20),
        });
    }

    info!("Worker configuration updated");
    Ok(())
}
