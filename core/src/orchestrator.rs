//! Question answering and offline reconciliation.

use std::sync::Arc;

use chrono::Utc;
use sentinel_providers::{Provenance, ProviderRouter, RoutedAnswer};
use sentinel_store::{Metadata, Sender};
use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_SESSION;
use crate::context::AppContext;
use crate::error::{OrchestratorError, Result};
use crate::event::{UiEvent, UiEvents};
use crate::postprocess::normalize;
use crate::queue::UnansweredQueue;

/// Where a question ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerState {
    /// A remote provider answered.
    AnsweredOnline,

    /// Answered locally while the network was up.
    AnsweredOffline,

    /// Answered locally while offline and queued for a better answer.
    QueuedForReconcile,
}

/// Result of [`AnsweringOrchestrator::ask`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    /// Final state of the question.
    pub state: AnswerState,

    /// Normalized answer text, as stored and shown.
    pub text: String,

    /// Provider and model of the answer.
    pub provenance: Provenance,

    /// Chat message id of the answer.
    pub message_id: i64,

    /// Queue id when the question was queued.
    pub queued_id: Option<i64>,
}

/// Summary of one reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Pending questions looked at.
    pub attempted: usize,

    /// Questions that got an online answer.
    pub answered: usize,

    /// Questions left pending.
    pub still_pending: usize,
}

struct Inner {
    context: Arc<AppContext>,
    router: ProviderRouter,
    queue: UnansweredQueue,
    events: UiEvents,
    tasks: TaskTracker,
    cancel: CancellationToken,
    workers: Semaphore,

    /// One reconciliation sweep at a time.
    sweep: Mutex<()>,
}

/// Answers questions through the provider chain and reconciles queued ones.
///
/// Cloning is cheap; clones share the same task group.
#[derive(Clone)]
pub struct AnsweringOrchestrator {
    inner: Arc<Inner>,
}

impl AnsweringOrchestrator {
    /// Create an orchestrator.
    pub fn new(context: Arc<AppContext>, router: ProviderRouter, events: UiEvents) -> Self {
        let workers = context.config().max_workers.max(1);
        let queue = UnansweredQueue::new(Arc::clone(context.store()));
        Self {
            inner: Arc::new(Inner {
                context,
                router,
                queue,
                events,
                tasks: TaskTracker::new(),
                cancel: CancellationToken::new(),
                workers: Semaphore::new(workers),
                sweep: Mutex::new(()),
            }),
        }
    }

    /// Shared context.
    pub fn context(&self) -> &Arc<AppContext> {
        &self.inner.context
    }

    /// Provider chain.
    pub fn router(&self) -> &ProviderRouter {
        &self.inner.router
    }

    /// Answer `question` in the configured session.
    pub async fn ask(&self, question: &str) -> Result<AnswerOutcome> {
        self.inner.ask(question).await
    }

    /// Answer `question` in the background.
    ///
    /// At most `max_workers` questions run at once. Failures reach the UI as
    /// a notification.
    pub fn spawn_question(&self, question: impl Into<String>) {
        let question = question.into();
        let inner = Arc::clone(&self.inner);
        self.inner.tasks.spawn(async move {
            let _permit = tokio::select! {
                _ = inner.cancel.cancelled() => return,
                permit = inner.workers.acquire() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };

            tokio::select! {
                _ = inner.cancel.cancelled() => debug!("Question cancelled by shutdown"),
                result = inner.ask(&question) => {
                    if let Err(e) = result {
                        error!("Failed to answer question: {e}");
                        inner.events.notify(format!("Error: {e}"));
                    }
                }
            }
        });
    }

    /// Try to answer pending questions online.
    pub async fn drain_queue(&self) -> Result<ReconcileReport> {
        self.inner.drain_queue().await
    }

    /// React to a connectivity flip: tell the UI and, when back online,
    /// reconcile in the background.
    pub fn on_connectivity_change(&self, online: bool) {
        self.inner.events.emit(UiEvent::Connectivity { online });
        if !online {
            return;
        }

        let inner = Arc::clone(&self.inner);
        self.inner.tasks.spawn(async move {
            tokio::select! {
                _ = inner.cancel.cancelled() => debug!("Reconciliation cancelled by shutdown"),
                result = inner.drain_queue() => {
                    if let Err(e) = result {
                        error!("Reconciliation failed: {e}");
                        inner.events.notify(format!("Error: {e}"));
                    }
                }
            }
        });
    }

    /// Callback for [`sentinel_connectivity::ConnectivityMonitor::start`].
    pub fn connectivity_callback(&self) -> impl Fn(bool) + Send + Sync + 'static {
        let orchestrator = self.clone();
        move |online| orchestrator.on_connectivity_change(online)
    }

    /// Wait until every spawned question and sweep has finished.
    pub async fn wait_idle(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }

    /// Cancel outstanding work and wait for it to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        info!("Orchestrator stopped");
    }
}

impl Inner {
    async fn ask(&self, question: &str) -> Result<AnswerOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(OrchestratorError::EmptyQuestion);
        }
        let session_id = self.context.config().session_id.as_str();

        let mut user_meta = Metadata::new();
        user_meta.insert("ts".to_string(), Value::from(Utc::now().to_rfc3339()));
        self.append(session_id, Sender::User, question, user_meta)?;

        let answer = if self.context.is_online() {
            let credentials = self.context.credentials();
            self.router.answer_online(question, &credentials).await
        } else {
            None
        };

        let mut queued_id = None;
        let (answer, state) = match answer {
            Some(answer) => (answer, AnswerState::AnsweredOnline),
            None => {
                let answer = self.router.answer_offline(question).await;
                if self.context.is_online() {
                    (answer, AnswerState::AnsweredOffline)
                } else {
                    queued_id = Some(self.queue.enqueue(question)?);
                    (answer, AnswerState::QueuedForReconcile)
                }
            }
        };

        let RoutedAnswer {
            text, provenance, ..
        } = answer;
        let text = normalize(&text);

        let metadata = answer_metadata(&provenance, state == AnswerState::AnsweredOnline, false);
        let message_id = self.append(session_id, Sender::Bot, &text, metadata)?;
        debug!("Question answered: {state:?} via {}", provenance.provider);

        Ok(AnswerOutcome {
            state,
            text,
            provenance,
            message_id,
            queued_id,
        })
    }

    async fn drain_queue(&self) -> Result<ReconcileReport> {
        let _sweep = self.sweep.lock().await;

        let pending = self.queue.list_pending(self.context.config().reconcile_batch)?;
        let mut report = ReconcileReport {
            attempted: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            return Ok(report);
        }

        let credentials = self.context.credentials();
        info!("Reconciling {} pending questions", pending.len());

        for item in pending {
            if self.cancel.is_cancelled() {
                report.still_pending += 1;
                continue;
            }

            let Some(answer) = self.router.answer_online(&item.question, &credentials).await else {
                debug!("Question {} still has no online answer", item.id);
                report.still_pending += 1;
                continue;
            };

            let text = normalize(&answer.text);
            if text.is_empty() {
                report.still_pending += 1;
                continue;
            }
            if let Err(e) = self.queue.mark_answered(item.id, &text) {
                warn!("Failed to mark question {} answered: {e}", item.id);
                report.still_pending += 1;
                continue;
            }

            self.router.knowledge().learn(item.question.as_str(), text.as_str()).await;

            let mut metadata = answer_metadata(&answer.provenance, true, true);
            metadata.insert("question".to_string(), Value::from(item.question.as_str()));
            if let Err(e) = self.append(DEFAULT_SESSION, Sender::Bot, &text, metadata) {
                warn!("Failed to post reconciled answer {}: {e}", item.id);
            }
            report.answered += 1;
        }

        info!(
            "Reconciliation done: {} answered, {} still pending",
            report.answered, report.still_pending
        );
        Ok(report)
    }

    /// Persist a chat message and show it.
    fn append(&self, session_id: &str, sender: Sender, text: &str, metadata: Metadata) -> Result<i64> {
        let message = self
            .context
            .store()
            .append_chat_message(session_id, sender, text, metadata)?;
        let id = message.id;
        self.events.emit(UiEvent::ChatMessage(message));
        Ok(id)
    }
}

fn answer_metadata(provenance: &Provenance, online: bool, reconciled: bool) -> Metadata {
    let mut metadata = provenance.to_metadata();
    let path = if online { "online" } else { "offline" };
    metadata.insert("path".to_string(), Value::from(path));
    if reconciled {
        metadata.insert("reconciled".to_string(), Value::Bool(true));
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SentinelConfig;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use sentinel_connectivity::{ConnectivityMonitor, FixedProbe};
    use sentinel_knowledge::{KnowledgeStore, QaPair};
    use sentinel_providers::{CANNED_GUIDANCE, OPENAI_API_KEY, OnlineProvider, ProviderAnswer};
    use sentinel_store::{MemoryStore, Persistence};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubProvider {
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OnlineProvider for StubProvider {
        fn name(&self) -> &str {
            "openai"
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        fn credential_key(&self) -> &str {
            OPENAI_API_KEY
        }

        async fn answer(
            &self,
            _credential: &str,
            question: &str,
        ) -> sentinel_providers::Result<ProviderAnswer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Some(reply) => Ok(ProviderAnswer {
                    text: format!("{reply} ({question})"),
                    provenance: Provenance::new("openai").with_model("stub-model"),
                }),
                None => Err(sentinel_providers::ProviderError::InvalidResponse("down".to_string())),
            }
        }
    }

    struct Harness {
        orchestrator: AnsweringOrchestrator,
        store: Arc<MemoryStore>,
        probe: Arc<FixedProbe>,
        provider: Arc<StubProvider>,
        events: tokio::sync::mpsc::UnboundedReceiver<UiEvent>,
    }

    async fn harness(online: bool, reply: Option<&'static str>) -> Harness {
        harness_with(SentinelConfig::new("/tmp/sentinel-orchestrator-test"), online, reply).await
    }

    async fn harness_with(
        config: SentinelConfig,
        online: bool,
        reply: Option<&'static str>,
    ) -> Harness {
        let store = Arc::new(MemoryStore::new());
        store.set_setting(OPENAI_API_KEY, Value::from("sk-test")).unwrap();

        let probe = Arc::new(FixedProbe::new(online));
        let monitor = Arc::new(ConnectivityMonitor::new(probe.clone(), Duration::from_secs(3600)));
        monitor.start(|_| {}).await.unwrap();

        let context = Arc::new(AppContext::new(config, monitor, store.clone()));
        let provider = Arc::new(StubProvider {
            reply,
            calls: AtomicUsize::new(0),
        });
        let knowledge = Arc::new(KnowledgeStore::from_pairs(vec![QaPair::new(
            "how do I spot phishing emails",
            "Check the sender address",
        )]));
        let router = ProviderRouter::new(knowledge).with_provider(provider.clone());
        let (ui, events) = UiEvents::channel();

        Harness {
            orchestrator: AnsweringOrchestrator::new(context, router, ui),
            store,
            probe,
            provider,
            events,
        }
    }

    #[tokio::test]
    async fn test_online_answer() {
        let mut h = harness(true, Some("Use a VPN")).await;
        let outcome = h.orchestrator.ask("is hotel wifi safe").await.unwrap();

        assert_eq!(outcome.state, AnswerState::AnsweredOnline);
        assert_eq!(outcome.text, "Use a VPN (is hotel wifi safe).");
        assert_eq!(outcome.queued_id, None);

        let history = h.store.chat_history(DEFAULT_SESSION, 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender, Sender::User);
        assert_eq!(history[1].metadata.get("provider"), Some(&Value::from("openai")));
        assert_eq!(history[1].metadata.get("path"), Some(&Value::from("online")));

        // Events carry the stored rows, timestamps included
        let mut shown = Vec::new();
        while let Ok(event) = h.events.try_recv() {
            if let UiEvent::ChatMessage(message) = event {
                shown.push(message);
            }
        }
        assert_eq!(shown, history);
        h.monitor_stop().await;
    }

    #[tokio::test]
    async fn test_online_failure_answers_offline_without_queueing() {
        let h = harness(true, None).await;
        let outcome = h.orchestrator.ask("how to spot phishing").await.unwrap();

        assert_eq!(outcome.state, AnswerState::AnsweredOffline);
        assert_eq!(outcome.text, "Check the sender address.");
        assert_eq!(outcome.provenance, Provenance::new("local_kb"));
        assert!(h.store.list_pending_unanswered(10).unwrap().is_empty());
        h.monitor_stop().await;
    }

    #[tokio::test]
    async fn test_offline_queues_question() {
        let h = harness(false, Some("unused")).await;
        let outcome = h.orchestrator.ask("  explain zero trust  ").await.unwrap();

        assert_eq!(outcome.state, AnswerState::QueuedForReconcile);
        assert_eq!(outcome.text, normalize(CANNED_GUIDANCE));
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);

        let pending = h.store.list_pending_unanswered(10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(Some(pending[0].id), outcome.queued_id);
        assert_eq!(pending[0].question, "explain zero trust");
        h.monitor_stop().await;
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let h = harness(true, Some("x")).await;
        assert!(matches!(
            h.orchestrator.ask("   ").await,
            Err(OrchestratorError::EmptyQuestion)
        ));
        assert!(h.store.list_recent_chats(10).unwrap().is_empty());
        h.monitor_stop().await;
    }

    #[tokio::test]
    async fn test_drain_answers_and_learns() {
        let h = harness(false, Some("Segment the network")).await;
        h.orchestrator.ask("explain zero trust").await.unwrap();

        let report = h.orchestrator.drain_queue().await.unwrap();
        assert_eq!(
            report,
            ReconcileReport {
                attempted: 1,
                answered: 1,
                still_pending: 0
            }
        );
        assert!(h.store.list_pending_unanswered(10).unwrap().is_empty());
        assert_eq!(
            h.orchestrator.router().knowledge().search("explain zero trust").as_deref(),
            Some("Segment the network (explain zero trust).")
        );

        let last = &h.store.list_recent_chats(1).unwrap()[0];
        assert_eq!(last.session_id, DEFAULT_SESSION);
        assert_eq!(last.metadata.get("reconciled"), Some(&Value::Bool(true)));
        assert_eq!(last.metadata.get("model"), Some(&Value::from("stub-model")));
        h.monitor_stop().await;
    }

    #[tokio::test]
    async fn test_drain_is_bounded_by_batch() {
        let mut config = SentinelConfig::new("/tmp/sentinel-orchestrator-test");
        config.reconcile_batch = 2;
        let h = harness_with(config, false, Some("Rotate the key")).await;
        for question in ["first", "second", "third"] {
            h.orchestrator.ask(question).await.unwrap();
        }

        let report = h.orchestrator.drain_queue().await.unwrap();
        assert_eq!(
            report,
            ReconcileReport {
                attempted: 2,
                answered: 2,
                still_pending: 0
            }
        );
        let pending = h.store.list_pending_unanswered(10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].question, "third");

        // The next sweep picks up what is left
        let report = h.orchestrator.drain_queue().await.unwrap();
        assert_eq!(report.answered, 1);
        assert!(h.store.list_pending_unanswered(10).unwrap().is_empty());
        h.monitor_stop().await;
    }

    #[tokio::test]
    async fn test_drain_failure_keeps_pending() {
        let h = harness(false, None).await;
        h.orchestrator.ask("first").await.unwrap();
        h.orchestrator.ask("second").await.unwrap();

        let report = h.orchestrator.drain_queue().await.unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.still_pending, 2);
        assert_eq!(h.store.list_pending_unanswered(10).unwrap().len(), 2);
        h.monitor_stop().await;
    }

    #[tokio::test]
    async fn test_spawned_questions_and_events() {
        let mut h = harness(true, Some("ok")).await;
        for i in 0..6 {
            h.orchestrator.spawn_question(format!("question {i}"));
        }
        h.orchestrator.wait_idle().await;

        // Six user messages and six answers, in any order
        let mut chat_events = 0;
        while let Ok(event) = h.events.try_recv() {
            if matches!(event, UiEvent::ChatMessage(_)) {
                chat_events += 1;
            }
        }
        assert_eq!(chat_events, 12);
        assert_eq!(h.store.list_recent_chats(100).unwrap().len(), 12);
        h.monitor_stop().await;
    }

    #[tokio::test]
    async fn test_reconnect_triggers_drain() {
        let mut h = harness(false, Some("Patch it")).await;
        h.orchestrator.ask("old router firmware").await.unwrap();

        h.probe.set(true);
        h.orchestrator.on_connectivity_change(true);
        h.orchestrator.wait_idle().await;

        assert!(h.store.list_pending_unanswered(10).unwrap().is_empty());
        let mut saw_flip = false;
        while let Ok(event) = h.events.try_recv() {
            saw_flip |= event == UiEvent::Connectivity { online: true };
        }
        assert!(saw_flip);
        h.monitor_stop().await;
    }

    struct HangingProvider;

    #[async_trait]
    impl OnlineProvider for HangingProvider {
        fn name(&self) -> &str {
            "openai"
        }

        fn model(&self) -> &str {
            "slow"
        }

        fn credential_key(&self) -> &str {
            OPENAI_API_KEY
        }

        async fn answer(
            &self,
            _credential: &str,
            _question: &str,
        ) -> sentinel_providers::Result<ProviderAnswer> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_questions() {
        let h = harness(true, None).await;
        let router = ProviderRouter::new(Arc::new(KnowledgeStore::from_pairs(Vec::new())))
            .with_provider(Arc::new(HangingProvider));
        let orchestrator = AnsweringOrchestrator::new(
            Arc::clone(h.orchestrator.context()),
            router,
            UiEvents::discard(),
        );

        orchestrator.spawn_question("never answered");
        tokio::time::timeout(Duration::from_secs(5), orchestrator.shutdown())
            .await
            .unwrap();

        // No answer was stored
        let chats = h.store.list_recent_chats(10).unwrap();
        assert!(chats.iter().all(|m| m.sender == Sender::User));
        h.monitor_stop().await;
    }

    impl Harness {
        async fn monitor_stop(&self) {
            self.orchestrator.context().monitor().stop().await;
        }
    }
}
