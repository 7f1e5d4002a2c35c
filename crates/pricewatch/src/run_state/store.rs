use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::run_state::RunState;

/// File-backed store for the single [`RunState`].
#[derive(Debug, Clone)]
pub struct RunStateStore {
    path: PathBuf,
}

impl RunStateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state; `Idle` when the file is absent or unreadable.
    pub fn read(&self) -> RunState {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(_) => return RunState::default(),
        };

        serde_json::from_str(&text).unwrap_or_else(|e| {
            log::warn!(
                "Run state {} is unreadable, treating as idle: {}",
                self.path.display(),
                e
            );
            RunState::default()
        })
    }

    /// Replaces the stored state. Writes a sibling temp file and renames it
    /// over the target so readers never see a partial document.
    pub fn write(&self, state: &RunState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| StoreError::CreateDirectory {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "run_state.json".to_string());
        let tmp_path = dir.join(format!(
            ".{}.{}.tmp",
            file_name,
            uuid::Uuid::new_v4().simple()
        ));

        let write_tmp = || -> std::io::Result<()> {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()
        };

        if let Err(e) = write_tmp().and_then(|_| std::fs::rename(&tmp_path, &self.path)) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(StoreError::WriteFile {
                path: self.path.clone(),
                source: e,
            });
        }

        Ok(())
    }
}
