//! Questions waiting for an online answer.

use std::sync::Arc;

use sentinel_store::{Persistence, Result, UnansweredQuestion};
use tracing::{debug, info};

/// Persisted queue of questions answered offline.
///
/// Items go from pending to answered and are never removed.
#[derive(Clone)]
pub struct UnansweredQueue {
    store: Arc<dyn Persistence>,
}

impl UnansweredQueue {
    /// Create a queue over `store`.
    pub fn new(store: Arc<dyn Persistence>) -> Self {
        Self { store }
    }

    /// Queue `question` and return its id.
    pub fn enqueue(&self, question: &str) -> Result<i64> {
        let id = self.store.enqueue_unanswered(question)?;
        info!("Queued question {id} for reconciliation");
        Ok(id)
    }

    /// Up to `limit` pending questions, oldest first.
    pub fn list_pending(&self, limit: usize) -> Result<Vec<UnansweredQuestion>> {
        let pending = self.store.list_pending_unanswered(limit)?;
        debug!("{} pending questions", pending.len());
        Ok(pending)
    }

    /// Record the answer of question `id`.
    pub fn mark_answered(&self, id: i64, answer: &str) -> Result<()> {
        self.store.mark_unanswered_answered(id, answer)
    }
}
