//! Connectivity monitor implementation.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{DEFAULT_INTERVAL_SECS, MonitorConfig};
use crate::error::{ConnectivityError, Result};
use crate::probe::{HttpProbe, Probe};

/// Last known reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectivityState {
    /// The monitor has not probed yet.
    Unknown = 0,

    /// The last probe reached the network.
    Online = 1,

    /// The last probe reached no endpoint.
    Offline = 2,
}

impl ConnectivityState {
    fn from_reachable(reachable: bool) -> Self {
        if reachable { Self::Online } else { Self::Offline }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Online,
            2 => Self::Offline,
            _ => Self::Unknown,
        }
    }
}

/// Polls a [`Probe`] and reports state flips to a callback.
pub struct ConnectivityMonitor {
    /// Reachability check.
    probe: Arc<dyn Probe>,

    /// Time between polls.
    interval: Duration,

    /// Current state, shared with the poll task.
    state: Arc<AtomicU8>,

    /// Poll task and its cancellation token while running.
    task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl ConnectivityMonitor {
    /// Create a monitor around an arbitrary probe.
    ///
    /// A zero interval falls back to [`DEFAULT_INTERVAL_SECS`].
    pub fn new(probe: Arc<dyn Probe>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            warn!("Zero connectivity poll interval, using {DEFAULT_INTERVAL_SECS}s");
            Duration::from_secs(DEFAULT_INTERVAL_SECS)
        } else {
            interval
        };
        Self {
            probe,
            interval,
            state: Arc::new(AtomicU8::new(ConnectivityState::Unknown as u8)),
            task: Mutex::new(None),
        }
    }

    /// Create a monitor that probes the configured HTTP endpoints.
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        let probe = HttpProbe::from_config(config)?;
        Ok(Self::new(Arc::new(probe), config.interval()))
    }

    /// Time between polls.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current state.
    pub fn state(&self) -> ConnectivityState {
        ConnectivityState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the last probe found the network.
    pub fn is_online(&self) -> bool {
        self.state() == ConnectivityState::Online
    }

    /// Probe once to set the initial state, then poll in the background.
    ///
    /// The initial probe never invokes `callback`; afterwards it runs once
    /// per flip with the new reachability. A panicking callback is logged and
    /// polling continues.
    pub async fn start<F>(&self, callback: F) -> Result<ConnectivityState>
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Err(ConnectivityError::AlreadyStarted);
        }

        let initial = ConnectivityState::from_reachable(self.probe.is_reachable().await);
        self.state.store(initial as u8, Ordering::Release);
        info!("Connectivity monitor started: {initial:?}");

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll(
            Arc::clone(&self.probe),
            Arc::clone(&self.state),
            self.interval,
            cancel.clone(),
            callback,
        ));
        *task = Some((cancel, handle));

        Ok(initial)
    }

    /// Stop polling. No callback runs once this returns.
    pub async fn stop(&self) {
        let Some((cancel, handle)) = self.task.lock().await.take() else {
            return;
        };

        cancel.cancel();
        if let Err(e) = handle.await {
            error!("Connectivity poll task ended abnormally: {e}");
        }
        info!("Connectivity monitor stopped");
    }

    /// Whether the poll task is running.
    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }
}

async fn poll<F>(
    probe: Arc<dyn Probe>,
    state: Arc<AtomicU8>,
    interval: Duration,
    cancel: CancellationToken,
    callback: F,
) where
    F: Fn(bool) + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let reachable = tokio::select! {
            _ = cancel.cancelled() => break,
            reachable = probe.is_reachable() => reachable,
        };

        let next = ConnectivityState::from_reachable(reachable);
        let previous = ConnectivityState::from_u8(state.swap(next as u8, Ordering::AcqRel));
        if previous == next {
            debug!("Connectivity unchanged: {next:?}");
            continue;
        }

        info!("Connectivity changed: {previous:?} -> {next:?}");
        if catch_unwind(AssertUnwindSafe(|| callback(reachable))).is_err() {
            error!("Connectivity callback panicked; polling continues");
        }
    }
}
