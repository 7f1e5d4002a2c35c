//! Per-run log file fed by the worker's stdout and stderr.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, warn};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::storage::layout::RUN_LOG_PREFIX;

/// Append-only log for one run.
pub struct RunLog {
    path: PathBuf,
    file: File,
    write_failed: bool,
}

impl RunLog {
    /// Opens (creating parent directories) the log in append mode.
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            write_failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes raw bytes. Failures are logged once and otherwise ignored so a
    /// full disk never takes the run down with it.
    pub async fn write(&mut self, bytes: &[u8]) {
        if let Err(e) = self.file.write_all(bytes).await {
            if !self.write_failed {
                warn!("Failed to write run log {}: {}", self.path.display(), e);
                self.write_failed = true;
            }
        }
    }

    pub async fn write_line(&mut self, line: &str) {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.write(&bytes).await;
    }

    /// Drains `lines` into the file until every sender is gone.
    pub async fn pump(&mut self, mut lines: mpsc::Receiver<Vec<u8>>) {
        while let Some(line) = lines.recv().await {
            self.write(&line).await;
        }
    }

    pub async fn close(mut self) {
        if let Err(e) = self.file.flush().await {
            warn!("Failed to flush run log {}: {}", self.path.display(), e);
        }
    }
}

/// Forwards `stream` line by line (newline kept) to `tx`. Bytes are passed
/// through untouched, so non-UTF-8 output is preserved.
pub fn spawn_stream_reader<R>(stream: R, tx: mpsc::Sender<Vec<u8>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    if line.last() != Some(&b'\n') {
                        line.push(b'\n');
                    }
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Worker output stream closed with error: {}", e);
                    break;
                }
            }
        }
    })
}

/// Keeps the `keep` most recently modified run logs in `dir` and deletes the
/// rest. Best effort: returns the number of files removed.
pub fn prune_logs(dir: &Path, keep: usize) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Skipping log pruning for {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut logs: Vec<(SystemTime, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(RUN_LOG_PREFIX) && name.ends_with(".log")
        })
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, entry.path()))
        })
        .collect();

    if logs.len() <= keep {
        return 0;
    }

    // Newest first; ties broken by name so the order is stable.
    logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    let mut removed = 0;
    for (_, path) in logs.into_iter().skip(keep) {
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove old run log {}: {}", path.display(), e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(path: &Path, age_secs: u64) {
        let file = std::fs::File::create(path).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        file.set_modified(mtime).unwrap();
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = TempDir::new().unwrap();
        for i in 0..5u64 {
            touch(&dir.path().join(format!("run-{}.log", i)), 100 - i * 10);
        }
        touch(&dir.path().join("other.log"), 1000);

        let removed = prune_logs(dir.path(), 2);
        assert_eq!(removed, 3);

        assert!(dir.path().join("run-4.log").exists());
        assert!(dir.path().join("run-3.log").exists());
        assert!(!dir.path().join("run-0.log").exists());
        assert!(dir.path().join("other.log").exists());
    }

    #[test]
    fn test_prune_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert_eq!(prune_logs(&dir.path().join("nope"), 3), 0);
    }

    #[tokio::test]
    async fn test_stream_reader_preserves_bytes() {
        let (tx, mut rx) = mpsc::channel(8);
        let input: &[u8] = b"first\n\xff\xfe raw\nno newline";
        spawn_stream_reader(input, tx).await.unwrap();

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        assert_eq!(
            lines,
            vec![
                b"first\n".to_vec(),
                b"\xff\xfe raw\n".to_vec(),
                b"no newline\n".to_vec(),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_log_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("run-a.log");

        let mut log = RunLog::open(&path).await.unwrap();
        log.write_line("header").await;
        let (tx, rx) = mpsc::channel(4);
        tx.send(b"body\n".to_vec()).await.unwrap();
        drop(tx);
        log.pump(rx).await;
        log.close().await;

        let mut log = RunLog::open(&path).await.unwrap();
        log.write_line("again").await;
        log.close().await;

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "header\nbody\nagain\n");
    }
}
