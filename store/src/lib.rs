//! # Store
//!
//! Everything Sentinel persists between runs: the chat log, the queue of
//! questions answered offline, scan records and user settings.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Persistence                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  chats ─────── append / recent / history                        │
//! │  unanswered ── enqueue / pending / mark answered                │
//! │  scans ─────── add / update / recent                            │
//! │  settings ──── get / set (JSON values)                          │
//! ├────────────────────────────┬────────────────────────────────────┤
//! │        MemoryStore         │            SqliteStore             │
//! └────────────────────────────┴────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod model;
pub mod persistence;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use model::{
    ChatMessage, Metadata, ScanLog, ScanStatus, ScanUpdate, Sender, UnansweredQuestion,
    UnansweredStatus,
};
pub use persistence::Persistence;
pub use sqlite::SqliteStore;
