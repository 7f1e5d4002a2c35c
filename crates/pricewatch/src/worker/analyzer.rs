//! One-shot invocation of the analysis script.

use std::path::Path;
use std::time::Instant;

use log::{info, warn};
use serde::Serialize;

use crate::error::AnalyzerError;
use crate::records::DailyProgress;
use crate::worker::{output_tail, WorkerSettings};

const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerOutcome {
    pub stdout: String,
    pub duration_ms: u64,
}

/// Checks that a complete scrape is on disk before analysis runs.
pub fn check_preconditions(
    raw_data: Option<&Path>,
    progress: Option<&DailyProgress>,
    total: usize,
) -> Result<(), AnalyzerError> {
    if raw_data.is_none() {
        return Err(AnalyzerError::Precondition(
            "No pricing data found. Run the scraper first.".to_string(),
        ));
    }

    let completed = progress.map_or(0, DailyProgress::completed_count);
    let complete = progress.is_some_and(|p| p.is_complete(total));
    if !complete {
        return Err(AnalyzerError::Precondition(format!(
            "Scrape incomplete ({}/{} properties). Wait for scraper to finish before running analysis.",
            completed, total
        )));
    }

    Ok(())
}

/// Runs the analysis script to completion.
pub async fn run_analyzer(settings: &WorkerSettings) -> Result<AnalyzerOutcome, AnalyzerError> {
    let started = Instant::now();
    info!("Running analyzer {}", settings.analyze_script);

    let output = settings
        .script_command(&settings.analyze_script, &[])
        .output()
        .await
        .map_err(AnalyzerError::SpawnFailed)?;

    let duration_ms = started.elapsed().as_millis() as u64;
    if !output.status.success() {
        let stderr = output_tail(&output.stderr, STDERR_TAIL_LINES);
        warn!(
            "Analyzer exited with code {:?} after {}ms",
            output.status.code(),
            duration_ms
        );
        return Err(AnalyzerError::Failed {
            code: output.status.code(),
            stderr,
        });
    }

    info!("Analyzer finished in {}ms", duration_ms);
    Ok(AnalyzerOutcome {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        duration_ms,
    })
}
