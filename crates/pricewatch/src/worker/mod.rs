pub mod analyzer;
pub mod config_manager;
pub mod log_capture;
pub mod run;
pub mod signal;
pub mod supervisor;

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::PricewatchConfig;

pub use analyzer::AnalyzerOutcome;
pub use config_manager::WorkerConfig;
pub use run::{new_run_id, RunOutcome, StopOutcome};
pub use signal::{ProcessControl, SignalDelivery, SystemProcessControl};
pub use supervisor::Supervisor;

/// How the external worker scripts are invoked.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub executable: String,
    pub module_root: PathBuf,
    pub run_script: String,
    pub analyze_script: String,
    pub config_manager_script: String,
}

impl WorkerSettings {
    pub fn from_config(config: &PricewatchConfig) -> Self {
        Self {
            executable: config.python_executable.clone(),
            module_root: config.module_root.clone(),
            run_script: config.run_script.clone(),
            analyze_script: config.analyze_script.clone(),
            config_manager_script: config.config_manager_script.clone(),
        }
    }

    /// `<executable> -u <script> <args..>` in the module root with unbuffered
    /// output and piped stdout/stderr.
    pub fn script_command(&self, script: &str, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-u")
            .arg(script)
            .args(args)
            .current_dir(&self.module_root)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

/// Last `max_lines` lines of process output, for error messages.
pub(crate) fn output_tail(bytes: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
