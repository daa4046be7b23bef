//! Plain-text rendering of events and stored records.

use sentinel_core::UiEvent;
use sentinel_store::{ChatMessage, Metadata, ScanLog, Sender, UnansweredQuestion};
use serde_json::Value;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Line to print for `event`, or `None` when there is nothing to show.
///
/// User messages are skipped since the user just typed them.
pub fn event_line(event: &UiEvent) -> Option<String> {
    match event {
        UiEvent::ChatMessage(message) if message.sender == Sender::User => None,
        UiEvent::ChatMessage(message) => Some(answer_line(message)),
        UiEvent::ScanProgress { fraction, label } => {
            Some(format!("[scan {:>3.0}%] {label}", fraction * 100.0))
        }
        UiEvent::ScanCompleted { scan_id, findings } => Some(format!(
            "[scan #{scan_id}] done: threat {:.2}, {} suspicious processes, {} suspicious files",
            findings.threat_score,
            findings.suspicious_processes.len(),
            findings.suspicious_files.len()
        )),
        UiEvent::Connectivity { online: true } => Some("(back online)".to_string()),
        UiEvent::Connectivity { online: false } => Some("(offline)".to_string()),
        UiEvent::Notification(text) => Some(format!("! {text}")),
    }
}

/// An assistant answer with its source.
pub fn answer_line(message: &ChatMessage) -> String {
    let source = source_label(&message.metadata);
    match metadata_str(&message.metadata, "question") {
        Some(question) => format!("sentinel [{source}] re \"{question}\": {}", message.text),
        None => format!("sentinel [{source}]: {}", message.text),
    }
}

/// A chat log entry for history listings.
pub fn history_line(message: &ChatMessage) -> String {
    let when = message.timestamp.format(TIME_FORMAT);
    match message.sender {
        Sender::User => format!("{when} you: {}", message.text),
        Sender::Bot => format!("{when} {}", answer_line(message)),
    }
}

/// A queued question.
pub fn pending_line(item: &UnansweredQuestion) -> String {
    format!(
        "#{} {} {}",
        item.id,
        item.created_at.format(TIME_FORMAT),
        item.question
    )
}

/// A scan log entry.
pub fn scan_line(scan: &ScanLog) -> String {
    let threat = scan
        .findings
        .get("threat_score")
        .and_then(Value::as_f64)
        .map(|score| format!(" threat {score:.2}"))
        .unwrap_or_default();
    let ended = scan
        .ended_at
        .map(|at| format!(" -> {}", at.format(TIME_FORMAT)))
        .unwrap_or_default();
    format!(
        "#{} {}{ended} {}{threat}",
        scan.id,
        scan.started_at.format(TIME_FORMAT),
        scan.status.as_str()
    )
}

/// `provider/model`, with the answering path and reconcile flag when set.
fn source_label(metadata: &Metadata) -> String {
    let mut label = metadata_str(metadata, "provider").unwrap_or("unknown").to_string();
    if let Some(model) = metadata_str(metadata, "model") {
        label.push('/');
        label.push_str(model);
    }
    if metadata.get("reconciled") == Some(&Value::Bool(true)) {
        label.push_str(", reconciled");
    }
    label
}

fn metadata_str<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(Value::as_str)
}
