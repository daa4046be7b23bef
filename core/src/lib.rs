//! # Sentinel Core
//!
//! Ties connectivity, providers and persistence together into an assistant
//! that keeps answering without a network and catches up once it is back.
//!
//! ## Features
//!
//! - **Answering**: online providers when reachable, the local chain otherwise
//! - **Reconciliation**: questions answered offline are queued and re-asked
//!   online after reconnecting; the answers are stored, shown and learned
//! - **Background work**: bounded question workers and single-flight scans,
//!   all owned by task groups that shut down cleanly
//! - **Configuration**: one TOML file, every field defaulted
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     AnsweringOrchestrator                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ask ──► online? ──► ProviderRouter::answer_online              │
//! │             │                    │ none                         │
//! │             └────────────────────┴──► answer_offline            │
//! │                                          │ offline?             │
//! │                                          └──► UnansweredQueue   │
//! │                                                                 │
//! │  reconnect ──► drain_queue ──► answer_online ──► learn + post   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  AppContext: SentinelConfig · ConnectivityMonitor · Persistence │
//! └─────────────────────────────────────────────────────────────────┘
//!            │ UiEvent (mpsc)
//!            ▼
//!     presentation layer
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sentinel_core::{AnsweringOrchestrator, AppContext, SentinelConfig, UiEvents};
//!
//! let context = Arc::new(AppContext::open(SentinelConfig::default())?);
//! let router = context.build_router().await;
//! let (events, mut rx) = UiEvents::channel();
//! let orchestrator = AnsweringOrchestrator::new(Arc::clone(&context), router, events);
//!
//! context.monitor().start(orchestrator.connectivity_callback()).await?;
//! let outcome = orchestrator.ask("how do I spot phishing").await?;
//! println!("{}", outcome.text);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod orchestrator;
pub mod postprocess;
pub mod queue;
pub mod scan;

pub use config::{DEFAULT_SESSION, ProvidersConfig, SentinelConfig};
pub use context::{AppContext, SCAN_INTERVAL_SETTING};
pub use error::{ConfigError, OrchestratorError, Result, ScanError};
pub use event::{UiEvent, UiEvents};
pub use orchestrator::{AnswerOutcome, AnswerState, AnsweringOrchestrator, ReconcileReport};
pub use postprocess::normalize;
pub use queue::UnansweredQueue;
pub use scan::{MIN_INTERVAL_MINUTES, ProgressSink, ScanFindings, ScanRunner, ScanScheduler, Scanner};
