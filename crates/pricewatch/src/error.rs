use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PricewatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    #[error("Config manager error: {0}")]
    ConfigManager(#[from] ConfigManagerError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Unsupported config file extension: {0}")]
    UnsupportedFormat(String),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Errors raised while persisting orchestrator-owned files.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize run state: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("A scraper run is already in progress")]
    AlreadyRunning,

    #[error("No scraper run is in progress")]
    NotRunning,

    #[error("Run state is marked running but has no process id")]
    NoPid,

    #[error("Failed to open run log '{path}': {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to signal process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to acquire run lock '{path}': {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No run is being monitored by this orchestrator")]
    NotMonitored,

    #[error("Run monitor task failed: {0}")]
    MonitorFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("{0}")]
    Precondition(String),

    #[error("Cannot run analysis while a scraper run is in progress")]
    AlreadyRunning,

    #[error("Failed to spawn analyzer: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Analyzer exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

#[derive(Error, Debug)]
pub enum ConfigManagerError {
    #[error("Failed to spawn config manager: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Config manager exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Failed to decode config manager output: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode config update: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Unknown file target: {0}")]
    UnknownTarget(String),

    #[error("Invalid file target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PricewatchError>;
