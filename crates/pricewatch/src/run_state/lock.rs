//! Exclusive-create lock file guarding "a run is active".
//!
//! Reading the run state and then writing `Running` leaves a window in which
//! two starts both observe `Idle`. The lock closes it: the file is created
//! with `create_new` (O_CREAT | O_EXCL), so exactly one caller wins.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SupervisorError;

/// A lock file whose contents cannot be read is only treated as abandoned
/// once it is older than this.
const UNREADABLE_LOCK_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    pub run_id: String,
    /// Pid of the orchestrator process holding the lock (not the worker).
    pub owner_pid: u32,
    pub acquired_at: DateTime<Utc>,
}

/// Held for the lifetime of one run. Dropping the guard removes the lock file
/// if it still belongs to this run.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    run_id: String,
}

impl RunLock {
    /// Takes the lock for `run_id`.
    ///
    /// Fails with `AlreadyRunning` when another live holder exists. A lock
    /// left behind by a dead orchestrator (per `is_alive`) is removed and the
    /// acquisition retried once.
    pub fn acquire(
        path: &Path,
        run_id: &str,
        is_alive: impl Fn(u32) -> bool,
    ) -> Result<RunLock, SupervisorError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| SupervisorError::Lock {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        for attempt in 0..2 {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
            {
                Ok(mut file) => {
                    let record = LockRecord {
                        run_id: run_id.to_string(),
                        owner_pid: std::process::id(),
                        acquired_at: Utc::now(),
                    };
                    let json = serde_json::to_vec(&record).unwrap_or_default();
                    if let Err(e) = file.write_all(&json) {
                        let _ = std::fs::remove_file(path);
                        return Err(SupervisorError::Lock {
                            path: path.to_path_buf(),
                            source: e,
                        });
                    }
                    return Ok(RunLock {
                        path: path.to_path_buf(),
                        run_id: run_id.to_string(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if attempt == 0 {
                        if let Some(stale) = stale_holder(path, &is_alive) {
                            if reclaim(path, &stale) {
                                log::warn!("Removed stale run lock {}", path.display());
                                continue;
                            }
                        }
                    }
                    return Err(SupervisorError::AlreadyRunning);
                }
                Err(e) => {
                    return Err(SupervisorError::Lock {
                        path: path.to_path_buf(),
                        source: e,
                    })
                }
            }
        }

        Err(SupervisorError::AlreadyRunning)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn release(self) {
        // Removal happens in Drop.
    }

    /// Current holder of the lock at `path`, if readable.
    pub fn holder(path: &Path) -> Option<LockRecord> {
        let bytes = std::fs::read(path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Removes the lock at `path` if it is held for `run_id`. Returns whether
    /// a lock was removed.
    pub fn release_for(path: &Path, run_id: &str) -> bool {
        match Self::holder(path) {
            Some(record) if record.run_id == run_id => std::fs::remove_file(path).is_ok(),
            _ => false,
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if Self::release_for(&self.path, &self.run_id) {
            log::debug!("Released run lock for {}", self.run_id);
        }
    }
}

/// What an abandoned lock file looked like when it was judged stale.
#[derive(Debug, PartialEq, Eq)]
enum StaleLock {
    Record(LockRecord),
    Unreadable,
}

fn stale_holder(path: &Path, is_alive: &impl Fn(u32) -> bool) -> Option<StaleLock> {
    match RunLock::holder(path) {
        Some(record) if !is_alive(record.owner_pid) => Some(StaleLock::Record(record)),
        Some(_) => None,
        None => std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > UNREADABLE_LOCK_GRACE)
            .then_some(StaleLock::Unreadable),
    }
}

/// Moves the lock aside and deletes it only if it is still the `stale` one.
/// A lock another process created in the meantime is put back.
fn reclaim(path: &Path, stale: &StaleLock) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let aside = path.with_file_name(format!(
        "{}.{}.stale",
        name.to_string_lossy(),
        uuid::Uuid::new_v4().simple()
    ));
    if std::fs::rename(path, &aside).is_err() {
        return false;
    }

    let moved = match RunLock::holder(&aside) {
        Some(record) => StaleLock::Record(record),
        None => StaleLock::Unreadable,
    };
    if &moved == stale {
        let _ = std::fs::remove_file(&aside);
        return true;
    }

    if let Err(e) = std::fs::hard_link(&aside, path) {
        log::warn!("Could not restore run lock {}: {}", path.display(), e);
    }
    let _ = std::fs::remove_file(&aside);
    false
}
