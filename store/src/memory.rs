//! In-memory persistence for tests and throwaway sessions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::model::{
    ChatMessage, Metadata, ScanLog, ScanStatus, ScanUpdate, Sender, UnansweredQuestion,
    UnansweredStatus,
};
use crate::persistence::Persistence;

#[derive(Debug, Default)]
struct State {
    chats: Vec<ChatMessage>,
    unanswered: Vec<UnansweredQuestion>,
    scans: Vec<ScanLog>,
    settings: HashMap<String, Value>,
}

/// Persistence that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn next_id(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX - 1) + 1
}

impl Persistence for MemoryStore {
    fn append_chat_message(
        &self,
        session_id: &str,
        sender: Sender,
        text: &str,
        metadata: Metadata,
    ) -> Result<ChatMessage> {
        let mut state = self.state();
        let message = ChatMessage {
            id: next_id(state.chats.len()),
            timestamp: Utc::now(),
            session_id: session_id.to_string(),
            sender,
            text: text.to_string(),
            metadata,
        };
        state.chats.push(message.clone());
        Ok(message)
    }

    fn list_recent_chats(&self, limit: usize) -> Result<Vec<ChatMessage>> {
        Ok(self.state().chats.iter().rev().take(limit).cloned().collect())
    }

    fn chat_history(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let state = self.state();
        let session: Vec<&ChatMessage> =
            state.chats.iter().filter(|m| m.session_id == session_id).collect();
        let skip = session.len().saturating_sub(limit);
        Ok(session.into_iter().skip(skip).cloned().collect())
    }

    fn enqueue_unanswered(&self, question: &str) -> Result<i64> {
        let mut state = self.state();
        let id = next_id(state.unanswered.len());
        state.unanswered.push(UnansweredQuestion {
            id,
            created_at: Utc::now(),
            question: question.to_string(),
            status: UnansweredStatus::Pending,
            answer: None,
        });
        Ok(id)
    }

    fn list_pending_unanswered(&self, limit: usize) -> Result<Vec<UnansweredQuestion>> {
        Ok(self
            .state()
            .unanswered
            .iter()
            .filter(|q| q.status == UnansweredStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    fn mark_unanswered_answered(&self, id: i64, answer: &str) -> Result<()> {
        let mut state = self.state();
        let item = state
            .unanswered
            .iter_mut()
            .find(|q| q.id == id && q.status == UnansweredStatus::Pending)
            .ok_or(StoreError::NotFound {
                kind: "pending question",
                id,
            })?;
        item.status = UnansweredStatus::Answered;
        item.answer = Some(answer.to_string());
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.state().settings.get(key).cloned())
    }

    fn set_setting(&self, key: &str, value: Value) -> Result<()> {
        self.state().settings.insert(key.to_string(), value);
        Ok(())
    }

    fn add_scan_log(&self, status: ScanStatus, findings: Value) -> Result<i64> {
        let mut state = self.state();
        let id = next_id(state.scans.len());
        state.scans.push(ScanLog {
            id,
            started_at: Utc::now(),
            ended_at: None,
            status,
            findings,
        });
        Ok(id)
    }

    fn update_scan_log(&self, id: i64, update: ScanUpdate) -> Result<()> {
        let mut state = self.state();
        let scan = state
            .scans
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::NotFound { kind: "scan", id })?;
        if let Some(status) = update.status {
            scan.status = status;
        }
        if let Some(findings) = update.findings {
            scan.findings = findings;
        }
        if let Some(ended_at) = update.ended_at {
            scan.ended_at = Some(ended_at);
        }
        Ok(())
    }

    fn recent_scans(&self, limit: usize) -> Result<Vec<ScanLog>> {
        Ok(self.state().scans.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pending_excludes_answered() {
        let store = MemoryStore::new();
        let first = store.enqueue_unanswered("first").unwrap();
        let second = store.enqueue_unanswered("second").unwrap();
        store.mark_unanswered_answered(first, "done").unwrap();

        let pending = store.list_pending_unanswered(10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second);
    }

    #[test]
    fn test_mark_unknown_id() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.mark_unanswered_answered(7, "x"),
            Err(StoreError::NotFound { id: 7, .. })
        ));
    }

    #[test]
    fn test_chat_ordering() {
        let store = MemoryStore::new();
        store.append_chat_message("a", Sender::User, "one", Metadata::new()).unwrap();
        store.append_chat_message("b", Sender::User, "two", Metadata::new()).unwrap();
        store.append_chat_message("a", Sender::Bot, "three", Metadata::new()).unwrap();

        let recent: Vec<_> = store
            .list_recent_chats(2)
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(recent, vec!["three", "two"]);

        let history: Vec<_> = store
            .chat_history("a", 10)
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(history, vec!["one", "three"]);
    }

    #[test]
    fn test_setting_helpers() {
        let store = MemoryStore::new();
        assert_eq!(
            store.get_setting_or("scan_interval", Value::from(60)).unwrap(),
            Value::from(60)
        );
        store.set_setting("scan_interval", Value::from(15)).unwrap();
        assert_eq!(store.get_setting_string("scan_interval").unwrap().as_deref(), Some("15"));
    }
}
