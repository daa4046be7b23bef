//! Device scans: a single-flight runner and an interval scheduler.
//!
//! What a scan looks for is up to the [`Scanner`]; this module only records
//! scans, forwards their progress and keeps at most one running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use sentinel_store::{Persistence, ScanStatus, ScanUpdate};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::error::ScanError;
use crate::event::{UiEvent, UiEvents};

/// Shortest allowed interval between scheduled scans, in minutes.
pub const MIN_INTERVAL_MINUTES: f64 = 5.0;

/// What a scan found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanFindings {
    /// Processes that look malicious.
    pub suspicious_processes: Vec<String>,

    /// Files that look malicious.
    pub suspicious_files: Vec<String>,

    /// Advice for the user.
    pub recommendations: Vec<String>,

    /// Overall threat estimate in `[0, 1]`.
    pub threat_score: f32,
}

/// Reports scan progress to the presentation layer.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    events: UiEvents,
}

impl ProgressSink {
    /// Report that `fraction` of the scan is done, now at step `label`.
    pub fn report(&self, fraction: f32, label: impl Into<String>) {
        self.events.emit(UiEvent::ScanProgress {
            fraction: fraction.clamp(0.0, 1.0),
            label: label.into(),
        });
    }
}

/// Trait for device scanners.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Scan the device, reporting progress along the way.
    async fn scan(&self, progress: ProgressSink) -> ScanFindings;
}

struct RunnerInner {
    scanner: Arc<dyn Scanner>,
    store: Arc<dyn Persistence>,
    events: UiEvents,
    running: AtomicBool,
    tasks: TaskTracker,
}

/// Runs scans in the background, one at a time.
#[derive(Clone)]
pub struct ScanRunner {
    inner: Arc<RunnerInner>,
}

impl ScanRunner {
    /// Create a runner that records scans in `store`.
    pub fn new(scanner: Arc<dyn Scanner>, store: Arc<dyn Persistence>, events: UiEvents) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                scanner,
                store,
                events,
                running: AtomicBool::new(false),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Whether a scan is in progress.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Start a scan in the background and return its log id.
    pub fn start(&self) -> Result<i64, ScanError> {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ScanError::AlreadyRunning);
        }

        let scan_id = match self
            .inner
            .store
            .add_scan_log(ScanStatus::Running, serde_json::json!({ "progress": 0 }))
        {
            Ok(id) => id,
            Err(e) => {
                self.inner.running.store(false, Ordering::Release);
                return Err(e.into());
            }
        };
        info!("Scan {scan_id} started");

        let inner = Arc::clone(&self.inner);
        self.inner.tasks.spawn(async move {
            inner.run(scan_id).await;
            inner.running.store(false, Ordering::Release);
        });
        Ok(scan_id)
    }

    /// Wait for the running scan, if any, and refuse new ones.
    pub async fn shutdown(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
    }
}

impl RunnerInner {
    async fn run(&self, scan_id: i64) {
        let progress = ProgressSink {
            events: self.events.clone(),
        };
        let scanner = Arc::clone(&self.scanner);

        // A panicking scanner marks the scan failed instead of wedging the runner
        let outcome = tokio::spawn(async move { scanner.scan(progress).await }).await;

        let update = match &outcome {
            Ok(findings) => match serde_json::to_value(findings) {
                Ok(value) => ScanUpdate::finished(ScanStatus::Completed, value),
                Err(e) => {
                    error!("Failed to encode scan findings: {e}");
                    ScanUpdate::finished(ScanStatus::Failed, serde_json::json!({}))
                }
            },
            Err(e) => {
                error!("Scan {scan_id} aborted: {e}");
                ScanUpdate::finished(ScanStatus::Failed, serde_json::json!({ "error": e.to_string() }))
            }
        };

        if let Err(e) = self.store.update_scan_log(scan_id, update) {
            warn!("Failed to record scan {scan_id}: {e}");
        }

        match outcome {
            Ok(findings) => {
                info!(
                    "Scan {scan_id} completed, threat score {:.2}",
                    findings.threat_score
                );
                self.events.emit(UiEvent::ScanCompleted { scan_id, findings });
            }
            Err(_) => self.events.notify("Scan failed"),
        }
    }
}

/// Starts scans on a fixed interval.
pub struct ScanScheduler {
    runner: ScanRunner,

    /// Interval in minutes; zero when disabled.
    minutes: StdMutex<f64>,

    task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl ScanScheduler {
    /// Create a stopped scheduler.
    pub fn new(runner: ScanRunner, minutes: f64) -> Self {
        Self {
            runner,
            minutes: StdMutex::new(clamp_minutes(minutes)),
            task: Mutex::new(None),
        }
    }

    /// Interval a scheduler set to `minutes` would use; `None` when that
    /// disables scheduling.
    pub fn effective_interval(minutes: f64) -> Option<Duration> {
        let minutes = clamp_minutes(minutes);
        (minutes > 0.0).then(|| Duration::from_secs_f64(minutes * 60.0))
    }

    /// Current interval; `None` when scheduling is disabled.
    pub fn interval(&self) -> Option<Duration> {
        Self::effective_interval(*self.minutes.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Change the interval.
    ///
    /// Zero or less stops and disables the scheduler. Positive values are
    /// raised to at least [`MIN_INTERVAL_MINUTES`]; a running scheduler
    /// restarts on the new interval.
    pub async fn set_interval_minutes(&self, minutes: f64) {
        let minutes = clamp_minutes(minutes);
        *self.minutes.lock().unwrap_or_else(PoisonError::into_inner) = minutes;

        if minutes <= 0.0 {
            self.stop().await;
            return;
        }
        if self.is_running().await {
            self.stop().await;
            self.start().await;
        }
    }

    /// Start scheduling. Returns `false` if disabled or already running.
    pub async fn start(&self) -> bool {
        let Some(period) = self.interval() else {
            return false;
        };

        let mut task = self.task.lock().await;
        if task.is_some() {
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tick(self.runner.clone(), period, cancel.clone()));
        *task = Some((cancel, handle));
        info!("Scan scheduler started: every {period:?}");
        true
    }

    /// Stop scheduling. A scan already running is left to finish.
    pub async fn stop(&self) {
        let Some((cancel, handle)) = self.task.lock().await.take() else {
            return;
        };
        cancel.cancel();
        if let Err(e) = handle.await {
            error!("Scan scheduler task ended abnormally: {e}");
        }
        info!("Scan scheduler stopped");
    }

    /// Whether the scheduler is active.
    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }
}

fn clamp_minutes(minutes: f64) -> f64 {
    if minutes <= 0.0 || minutes.is_nan() {
        0.0
    } else {
        minutes.max(MIN_INTERVAL_MINUTES)
    }
}

async fn tick(runner: ScanRunner, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if runner.is_running() {
            debug!("Scheduled scan skipped: previous scan still running");
            continue;
        }
        match runner.start() {
            Ok(scan_id) => debug!("Scheduled scan {scan_id} started"),
            Err(ScanError::AlreadyRunning) => debug!("Scheduled scan skipped"),
            Err(e) => warn!("Scheduled scan failed to start: {e}"),
        }
    }
}
