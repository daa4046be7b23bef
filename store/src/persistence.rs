//! The persistence trait shared by every backend.

use serde_json::Value;

use crate::error::Result;
use crate::model::{
    ChatMessage, Metadata, ScanLog, ScanStatus, ScanUpdate, Sender, UnansweredQuestion,
};

/// Storage for chats, queued questions, scan logs and settings.
///
/// Calls are synchronous and short; implementations serialize their own
/// writes and are safe to share across tasks.
pub trait Persistence: Send + Sync {
    /// Append a chat message and return it as stored.
    fn append_chat_message(
        &self,
        session_id: &str,
        sender: Sender,
        text: &str,
        metadata: Metadata,
    ) -> Result<ChatMessage>;

    /// Most recent messages across all sessions, newest first.
    fn list_recent_chats(&self, limit: usize) -> Result<Vec<ChatMessage>>;

    /// The last `limit` messages of one session, oldest first.
    fn chat_history(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>>;

    /// Queue a question as pending and return its id.
    fn enqueue_unanswered(&self, question: &str) -> Result<i64>;

    /// Pending questions, oldest first.
    fn list_pending_unanswered(&self, limit: usize) -> Result<Vec<UnansweredQuestion>>;

    /// Record the answer of a pending question.
    ///
    /// Answered questions are never re-opened; marking one again, or an
    /// unknown id, is [`crate::StoreError::NotFound`].
    fn mark_unanswered_answered(&self, id: i64, answer: &str) -> Result<()>;

    /// Stored value of a setting.
    fn get_setting(&self, key: &str) -> Result<Option<Value>>;

    /// Store a setting, replacing any previous value.
    fn set_setting(&self, key: &str, value: Value) -> Result<()>;

    /// Start a scan record and return its id.
    fn add_scan_log(&self, status: ScanStatus, findings: Value) -> Result<i64>;

    /// Update fields of a scan record.
    fn update_scan_log(&self, id: i64, update: ScanUpdate) -> Result<()>;

    /// Most recent scan records, newest first.
    fn recent_scans(&self, limit: usize) -> Result<Vec<ScanLog>>;

    /// Stored value of a setting, or `default` when unset.
    fn get_setting_or(&self, key: &str, default: Value) -> Result<Value> {
        Ok(self.get_setting(key)?.unwrap_or(default))
    }

    /// Setting rendered as a string; `None` when unset or null.
    fn get_setting_string(&self, key: &str) -> Result<Option<String>> {
        Ok(match self.get_setting(key)? {
            None | Some(Value::Null) => None,
            Some(Value::String(value)) => Some(value),
            Some(other) => Some(other.to_string()),
        })
    }
}
