//! # Knowledge
//!
//! Offline question answering for Sentinel. A [`KnowledgeStore`] holds
//! question/answer pairs built from a bundled default set plus a
//! user-writable overlay, answers questions by token overlap, and learns new
//! pairs as reconciled online answers come in.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Knowledge Store                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  bundled JSON ──┐                                               │
//! │                 ├──► [QaPair] ──► search ──► similarity::score  │
//! │  overlay JSON ──┘        ▲                                      │
//! │                          └──── learn ──► overlay JSON           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod similarity;
pub mod store;

pub use error::{KnowledgeError, Result};
pub use similarity::score;
pub use store::{KnowledgeConfig, KnowledgeMatch, KnowledgeStore, QaPair};

/// Minimum similarity a stored question must reach to be returned as a match.
pub const MATCH_THRESHOLD: f32 = 0.2;

/// Knowledge base compiled into the crate, used when no bundled path is configured.
pub const BUNDLED_KNOWLEDGE: &str = include_str!("../data/default_knowledge.json");
