//! Persisted record types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form metadata stored next to a chat message.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person asking.
    User,

    /// The assistant.
    Bot,
}

impl Sender {
    /// Stored form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }

    /// Parse the stored form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "bot" => Some(Self::Bot),
            _ => None,
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of a chat session. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Row id, increasing in insertion order.
    pub id: i64,

    /// When the message was stored.
    pub timestamp: DateTime<Utc>,

    /// Session the message belongs to.
    pub session_id: String,

    /// Author.
    pub sender: Sender,

    /// Message text.
    pub text: String,

    /// Provider information for bot messages.
    #[serde(default)]
    pub metadata: Metadata,
}

/// Lifecycle of a queued question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnansweredStatus {
    /// Waiting for an online answer.
    Pending,

    /// Answered by reconciliation. Terminal.
    Answered,
}

impl UnansweredStatus {
    /// Stored form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Answered => "answered",
        }
    }

    /// Parse the stored form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "answered" => Some(Self::Answered),
            _ => None,
        }
    }
}

/// A question answered offline, kept for a better answer once online.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnansweredQuestion {
    /// Row id; pending items are processed in id order.
    pub id: i64,

    /// When the question was queued.
    pub created_at: DateTime<Utc>,

    /// The question as asked.
    pub question: String,

    /// Lifecycle state.
    pub status: UnansweredStatus,

    /// The reconciled answer once answered.
    pub answer: Option<String>,
}

/// Lifecycle of a device scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// The scanner is working.
    Running,

    /// Findings are recorded.
    Completed,

    /// The scan ended without findings.
    Failed,
}

impl ScanStatus {
    /// Stored form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse the stored form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Record of one device scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanLog {
    /// Row id.
    pub id: i64,

    /// When the scan started.
    pub started_at: DateTime<Utc>,

    /// When the scan ended, if it has.
    pub ended_at: Option<DateTime<Utc>>,

    /// Lifecycle state.
    pub status: ScanStatus,

    /// Scanner output as JSON.
    pub findings: serde_json::Value,
}

/// Changes applied by [`crate::Persistence::update_scan_log`].
///
/// `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanUpdate {
    /// New status.
    pub status: Option<ScanStatus>,

    /// New findings.
    pub findings: Option<serde_json::Value>,

    /// End time.
    pub ended_at: Option<DateTime<Utc>>,
}

impl ScanUpdate {
    /// Mark the scan finished now with `status` and `findings`.
    pub fn finished(status: ScanStatus, findings: serde_json::Value) -> Self {
        Self {
            status: Some(status),
            findings: Some(findings),
            ended_at: Some(Utc::now()),
        }
    }
}
