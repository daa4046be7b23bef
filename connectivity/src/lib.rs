//! # Connectivity
//!
//! Reachability monitoring for Sentinel. A [`ConnectivityMonitor`] probes a
//! couple of well-known endpoints on a fixed interval and reports only the
//! transitions between online and offline.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Connectivity Monitor                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  MonitorConfig ──► Probe ──► ConnectivityState ──► callback     │
//! │                      │              │             (on flip)     │
//! │                      ▼              ▼                           │
//! │                 HttpProbe      AtomicU8 (readers)               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod monitor;
pub mod probe;

pub use config::MonitorConfig;
pub use error::{ConnectivityError, Result};
pub use monitor::{ConnectivityMonitor, ConnectivityState};
pub use probe::{FixedProbe, HttpProbe, Probe};
