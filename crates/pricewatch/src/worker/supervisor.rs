//! Scraper run lifecycle: start, monitor, stop.
//!
//! At most one run is active across every supervisor sharing a module root.
//! The persisted [`RunState`] is the source of truth for status; the lock file
//! makes `start` exclusive; a single monitor task per run owns the child
//! process, its log, and the terminal state write.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::PricewatchConfig;
use crate::error::SupervisorError;
use crate::run_state::{RunLock, RunState, RunStateStore};
use crate::storage::{ArtifactCategory, Layout};
use crate::worker::log_capture::{prune_logs, spawn_stream_reader, RunLog};
use crate::worker::run::{new_run_id, RunOutcome, StopOutcome};
use crate::worker::signal::{ProcessControl, SignalDelivery, SystemProcessControl};
use crate::worker::WorkerSettings;

pub const STOPPED_MESSAGE: &str = "Manually stopped";

/// How long output is still collected once the worker has exited.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

struct ActiveRun {
    run_id: String,
    stop_requested: Arc<AtomicBool>,
    handle: JoinHandle<RunOutcome>,
}

/// Everything the monitor task needs once the supervisor call has returned.
struct RunContext {
    run_id: String,
    store: RunStateStore,
    lock: RunLock,
    log: RunLog,
    logs_dir: PathBuf,
    log_retention: usize,
    stop_requested: Arc<AtomicBool>,
}

pub struct Supervisor {
    settings: WorkerSettings,
    layout: Layout,
    store: RunStateStore,
    control: Arc<dyn ProcessControl>,
    grace_period: Duration,
    log_retention: usize,
    active: Mutex<Option<ActiveRun>>,
}

impl Supervisor {
    pub fn new(config: &PricewatchConfig) -> Self {
        Self::with_control(config, Arc::new(SystemProcessControl))
    }

    pub fn with_control(config: &PricewatchConfig, control: Arc<dyn ProcessControl>) -> Self {
        let layout = Layout::new(&config.module_root);
        Self {
            settings: WorkerSettings::from_config(config),
            store: RunStateStore::new(layout.run_state()),
            layout,
            control,
            grace_period: config.stop_grace_period(),
            log_retention: config.log_retention,
            active: Mutex::new(None),
        }
    }

    /// Current persisted run state.
    pub fn status(&self) -> RunState {
        self.store.read()
    }

    pub fn is_running(&self) -> bool {
        self.store.read().is_running()
    }

    /// Launches the worker and returns its run id.
    ///
    /// A spawn failure is not an error here: the run is recorded as ended
    /// with the failure as its error message, and the id is still returned.
    pub async fn start(&self) -> Result<String, SupervisorError> {
        if self.store.read().is_running() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let run_id = new_run_id();
        let lock = RunLock::acquire(&self.layout.run_lock(), &run_id, |pid| {
            self.control.is_alive(pid)
        })?;

        // Another process may have committed Running between our first read
        // and taking the lock.
        if self.store.read().is_running() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let log_path = self.layout.run_log(&run_id);
        let mut log = RunLog::open(&log_path)
            .await
            .map_err(|e| SupervisorError::OpenLog {
                path: log_path.clone(),
                source: e,
            })?;

        let started_at = Utc::now();
        log.write_line(&format!(
            "=== Run {} started at {} ===",
            run_id,
            started_at.to_rfc3339()
        ))
        .await;

        let mut cmd = self
            .settings
            .script_command(&self.settings.run_script, &[]);
        let spawned = cmd.spawn();

        match &spawned {
            Ok(child) => match child.id() {
                Some(pid) => {
                    let state = RunState::running(&run_id, pid, log_path.clone(), started_at);
                    if let Err(e) = self.store.write(&state) {
                        error!("Failed to record run {} as running: {}", run_id, e);
                        if let Err(kill_err) = self.control.kill(pid) {
                            warn!("Failed to kill unrecorded worker {}: {}", pid, kill_err);
                        }
                        return Err(e.into());
                    }
                    info!("Started run {} (pid {})", run_id, pid);
                }
                None => debug!("Worker for run {} exited before its pid was read", run_id),
            },
            Err(e) => error!("Failed to start worker for run {}: {}", run_id, e),
        }

        let stop_requested = Arc::new(AtomicBool::new(false));
        let ctx = RunContext {
            run_id: run_id.clone(),
            store: self.store.clone(),
            lock,
            log,
            logs_dir: self.layout.dir(ArtifactCategory::Logs),
            log_retention: self.log_retention,
            stop_requested: Arc::clone(&stop_requested),
        };
        let handle = tokio::spawn(monitor_run(ctx, spawned));

        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        *active = Some(ActiveRun {
            run_id: run_id.clone(),
            stop_requested,
            handle,
        });

        Ok(run_id)
    }

    /// Stops the active run: SIGTERM, wait out the grace period, SIGKILL if
    /// still alive, then record the run as manually stopped.
    pub async fn stop(&self) -> Result<StopOutcome, SupervisorError> {
        let state = self.store.read();
        if !state.is_running() {
            return Err(SupervisorError::NotRunning);
        }
        let pid = state.pid.ok_or(SupervisorError::NoPid)?;

        if let Some(run_id) = &state.run_id {
            let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(run) = active.as_ref().filter(|run| &run.run_id == run_id) {
                run.stop_requested.store(true, Ordering::SeqCst);
            }
        }

        let mut marked = state.clone();
        marked.stop_requested = true;
        if let Err(e) = self.store.write(&marked) {
            warn!("Failed to record stop request: {}", e);
        }

        info!("Stopping run {:?} (pid {})", state.run_id, pid);
        match self.control.terminate(pid) {
            Ok(SignalDelivery::Delivered) => {}
            Ok(SignalDelivery::NoSuchProcess) => debug!("Worker {} already exited", pid),
            Err(e) => warn!("Failed to send SIGTERM to {}: {}", pid, e),
        }

        tokio::time::sleep(self.grace_period).await;

        let mut forced = false;
        let mut signal_error = None;
        if self.control.is_alive(pid) {
            warn!("Worker {} survived the grace period, killing", pid);
            match self.control.kill(pid) {
                Ok(SignalDelivery::Delivered) => forced = true,
                Ok(SignalDelivery::NoSuchProcess) => {}
                Err(e) => {
                    let err = SupervisorError::Signal { pid, source: e };
                    error!("{}", err);
                    signal_error = Some(err.to_string());
                }
            }
        }

        let run_id = state.run_id.clone().unwrap_or_default();
        let latest = self.store.read();
        if latest.is_running() && !latest.is_running_run(&run_id) {
            debug!("Run {} already replaced by {:?}", run_id, latest.run_id);
            return Ok(StopOutcome {
                run_id: state.run_id,
                pid,
                forced,
                signal_error,
            });
        }
        // Keep the exit code if the monitor already recorded the end.
        let exit_code = if latest.last_run_id.as_deref() == Some(run_id.as_str()) {
            latest.last_exit_code
        } else {
            None
        };
        let stopped = RunState::finished(
            &run_id,
            exit_code,
            Some(STOPPED_MESSAGE.to_string()),
            Utc::now(),
        );
        self.store.write(&stopped)?;
        RunLock::release_for(&self.layout.run_lock(), &run_id);

        Ok(StopOutcome {
            run_id: state.run_id,
            pid,
            forced,
            signal_error,
        })
    }

    /// Waits for the run started by this supervisor to finish.
    pub async fn wait_for_completion(&self) -> Result<RunOutcome, SupervisorError> {
        let run = {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            active.take()
        };
        let run = run.ok_or(SupervisorError::NotMonitored)?;

        run.handle
            .await
            .map_err(|e| SupervisorError::MonitorFailed(e.to_string()))
    }
}

/// Owns one run from spawn to terminal state.
async fn monitor_run(ctx: RunContext, spawned: std::io::Result<Child>) -> RunOutcome {
    let RunContext {
        run_id,
        store,
        lock,
        mut log,
        logs_dir,
        log_retention,
        stop_requested,
    } = ctx;

    let (exit_code, mut error_message) = match spawned {
        Err(e) => {
            log.write_line(&format!("Failed to start worker: {}", e)).await;
            (None, Some(format!("Failed to start worker: {}", e)))
        }
        Ok(mut child) => {
            let (tx, rx) = mpsc::channel::<Vec<u8>>(256);
            let readers: Vec<JoinHandle<()>> = [
                child.stdout.take().map(|out| spawn_stream_reader(out, tx.clone())),
                child.stderr.take().map(|err| spawn_stream_reader(err, tx.clone())),
            ]
            .into_iter()
            .flatten()
            .collect();
            drop(tx);

            let status = {
                let pump = log.pump(rx);
                tokio::pin!(pump);
                let mut pumped = false;
                let status = loop {
                    tokio::select! {
                        status = child.wait() => break status,
                        _ = &mut pump, if !pumped => pumped = true,
                    }
                };
                // Processes the worker left behind may still hold its
                // stdout/stderr open; the run ends with the worker itself.
                if !pumped && tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut pump).await.is_err() {
                    warn!(
                        "Output of run {} still open {:?} after worker exit, detaching",
                        run_id, OUTPUT_DRAIN_TIMEOUT
                    );
                    for reader in &readers {
                        reader.abort();
                    }
                }
                status
            };
            match status {
                Ok(status) => match status.code() {
                    Some(0) => (Some(0), None),
                    Some(code) => (Some(code), Some(format!("Worker exited with code {}", code))),
                    None => (None, Some(describe_signal_exit(&status))),
                },
                Err(e) => (None, Some(format!("Failed to wait for worker: {}", e))),
            }
        }
    };

    let current = store.read();
    let stop_recorded = current.is_running_run(&run_id) && current.stop_requested;
    let ended_elsewhere = !current.is_running() && current.last_run_id.as_deref() == Some(&run_id);
    let stopped = stop_requested.load(Ordering::SeqCst) || stop_recorded || ended_elsewhere;
    if stopped {
        error_message = Some(STOPPED_MESSAGE.to_string());
    }

    let ended_at = Utc::now();
    log.write_line(&format!(
        "=== Run {} ended at {} (exit code {}) ===",
        run_id,
        ended_at.to_rfc3339(),
        exit_code.map_or_else(|| "none".to_string(), |c| c.to_string())
    ))
    .await;
    log.close().await;

    if current.is_running() && current.run_id.as_deref() != Some(&run_id) {
        // A newer run owns the state file now.
        debug!("Not recording end of run {}: state belongs to another run", run_id);
    } else {
        let state = RunState::finished(&run_id, exit_code, error_message.clone(), ended_at);
        if let Err(e) = store.write(&state) {
            error!("Failed to record end of run {}: {}", run_id, e);
        }
    }
    drop(lock);

    let removed = prune_logs(&logs_dir, log_retention);
    if removed > 0 {
        debug!("Pruned {} old run logs", removed);
    }

    match &error_message {
        None => info!("Run {} completed", run_id),
        Some(message) => warn!("Run {} ended: {}", run_id, message),
    }

    RunOutcome {
        run_id,
        exit_code,
        error_message,
        stopped,
    }
}

#[cfg(unix)]
fn describe_signal_exit(status: &std::process::ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => format!("Worker terminated by signal {}", signal),
        None => "Worker exited without a status code".to_string(),
    }
}

#[cfg(not(unix))]
fn describe_signal_exit(_status: &std::process::ExitStatus) -> String {
    "Worker exited without a status code".to_string()
}
