//! Named artifact lookup for download/serving.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ArtifactError;
use crate::storage::layout::{ArtifactCategory, Layout};
use crate::storage::resolver::PathResolver;

/// A servable artifact, parsed from a target key such as `analysis` or
/// `archive-data:20260101`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTarget {
    Analysis,
    PricingData,
    DailyProgress,
    History,
    RunState,
    ArchiveAnalysis(String),
    ArchiveData(String),
    RunLog(String),
}

impl FileTarget {
    pub fn category(&self) -> ArtifactCategory {
        match self {
            Self::ArchiveAnalysis(_) | Self::ArchiveData(_) => ArtifactCategory::Archive,
            Self::RunLog(_) => ArtifactCategory::Logs,
            _ => ArtifactCategory::Outputs,
        }
    }

    pub fn primary_path(&self, layout: &Layout) -> PathBuf {
        match self {
            Self::Analysis => layout.analysis(),
            Self::PricingData => layout.pricing_data(),
            Self::DailyProgress => layout.daily_progress(),
            Self::History => layout.history(),
            Self::RunState => layout.run_state(),
            Self::ArchiveAnalysis(date) => layout.archive_analysis(date),
            Self::ArchiveData(date) => layout.archive_data(date),
            Self::RunLog(run_id) => layout.run_log(run_id),
        }
    }
}

impl fmt::Display for FileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => f.write_str("analysis"),
            Self::PricingData => f.write_str("data"),
            Self::DailyProgress => f.write_str("progress"),
            Self::History => f.write_str("history"),
            Self::RunState => f.write_str("run-state"),
            Self::ArchiveAnalysis(date) => write!(f, "archive-analysis:{}", date),
            Self::ArchiveData(date) => write!(f, "archive-data:{}", date),
            Self::RunLog(run_id) => write!(f, "log:{}", run_id),
        }
    }
}

impl FromStr for FileTarget {
    type Err = ArtifactError;

    fn from_str(target: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ArtifactError::InvalidTarget {
            target: target.to_string(),
            reason: reason.to_string(),
        };

        match target.split_once(':') {
            None => match target {
                "analysis" => Ok(Self::Analysis),
                "data" | "csv" => Ok(Self::PricingData),
                "progress" => Ok(Self::DailyProgress),
                "history" => Ok(Self::History),
                "run-state" => Ok(Self::RunState),
                _ => Err(ArtifactError::UnknownTarget(target.to_string())),
            },
            Some((kind @ ("archive-analysis" | "archive-data"), date)) => {
                if !is_date_tag(date) {
                    return Err(invalid("archive date must be eight digits (YYYYMMDD)"));
                }
                if kind == "archive-analysis" {
                    Ok(Self::ArchiveAnalysis(date.to_string()))
                } else {
                    Ok(Self::ArchiveData(date.to_string()))
                }
            }
            Some(("log", run_id)) => {
                let valid = !run_id.is_empty()
                    && run_id
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-');
                if !valid {
                    return Err(invalid("run id may only contain letters, digits and '-'"));
                }
                Ok(Self::RunLog(run_id.to_string()))
            }
            Some(_) => Err(ArtifactError::UnknownTarget(target.to_string())),
        }
    }
}

/// `true` for fixed-width `YYYYMMDD` tags.
pub fn is_date_tag(tag: &str) -> bool {
    tag.len() == 8 && tag.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileArtifact {
    pub filename: String,
    pub content_type: String,
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(skip)]
    pub contents: Vec<u8>,
}

pub fn read_artifact(
    resolver: &PathResolver,
    target: &FileTarget,
) -> Result<FileArtifact, ArtifactError> {
    let primary = target.primary_path(resolver.layout());
    let path = resolver
        .resolve(target.category(), &primary)
        .ok_or_else(|| ArtifactError::NotFound(target.to_string()))?;

    let contents = std::fs::read(&path).map_err(|e| ArtifactError::ReadFile {
        path: path.clone(),
        source: e,
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| target.to_string());

    let content_type = if matches!(target, FileTarget::RunLog(_)) {
        "text/plain".to_string()
    } else {
        mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string()
    };

    Ok(FileArtifact {
        filename,
        content_type,
        path,
        contents,
    })
}
