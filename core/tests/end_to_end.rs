//! End-to-end answering against mock providers and an on-disk store.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sentinel_connectivity::{ConnectivityMonitor, FixedProbe};
use sentinel_core::{
    AnswerState, AnsweringOrchestrator, AppContext, ProvidersConfig, SentinelConfig, UiEvent,
    UiEvents, normalize,
};
use sentinel_knowledge::KnowledgeConfig;
use sentinel_providers::{CANNED_GUIDANCE, HUGGINGFACE_API_KEY, OPENAI_API_KEY};
use sentinel_store::{Persistence, SqliteStore, UnansweredStatus};
use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct App {
    _temp_dir: TempDir,
    probe: Arc<FixedProbe>,
    store: Arc<SqliteStore>,
    orchestrator: AnsweringOrchestrator,
    events: tokio::sync::mpsc::UnboundedReceiver<UiEvent>,
}

async fn app(online: bool, openai: &MockServer, hf: &MockServer) -> App {
    let temp_dir = TempDir::new().unwrap();
    let mut config = SentinelConfig::new(temp_dir.path());

    // Start with no knowledge so only learned pairs can match
    let bundled = temp_dir.path().join("bundled.json");
    std::fs::write(&bundled, "[]").unwrap();
    config.knowledge = KnowledgeConfig::default().with_bundled(bundled);
    config.providers = ProvidersConfig {
        openai_base_url: openai.uri(),
        huggingface_base_url: hf.uri(),
        huggingface_model: "acme/guard".to_string(),
        ..ProvidersConfig::default()
    };

    let store = Arc::new(SqliteStore::open(config.database_path()).unwrap());
    let probe = Arc::new(FixedProbe::new(online));
    let monitor = Arc::new(ConnectivityMonitor::new(probe.clone(), Duration::from_millis(20)));
    let context = Arc::new(AppContext::new(config, Arc::clone(&monitor), store.clone()));

    let router = context.build_router().await;
    let (ui, events) = UiEvents::channel();
    let orchestrator = AnsweringOrchestrator::new(context, router, ui);
    monitor.start(orchestrator.connectivity_callback()).await.unwrap();

    App {
        _temp_dir: temp_dir,
        probe,
        store,
        orchestrator,
        events,
    }
}

impl App {
    async fn stop(&self) {
        self.orchestrator.context().monitor().stop().await;
        self.orchestrator.shutdown().await;
    }
}

#[tokio::test]
async fn test_offline_question_gets_canned_answer_and_is_queued() {
    let openai = MockServer::start().await;
    let hf = MockServer::start().await;
    for server in [&openai, &hf] {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
    }

    let app = app(false, &openai, &hf).await;
    app.store.set_setting(OPENAI_API_KEY, Value::from("sk-test")).unwrap();

    let outcome = app.orchestrator.ask("how do I stay safe online").await.unwrap();

    assert_eq!(outcome.state, AnswerState::QueuedForReconcile);
    assert_eq!(outcome.text, normalize(CANNED_GUIDANCE));
    assert_eq!(outcome.provenance.provider, "local_fallback");

    let pending = app.store.list_pending_unanswered(20).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].question, "how do I stay safe online");
    assert_eq!(pending[0].status, UnansweredStatus::Pending);
    app.stop().await;
}

#[tokio::test]
async fn test_online_with_only_huggingface_key() {
    let openai = MockServer::start().await;
    let hf = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/acme/guard"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{ "generated_text": "Turn on automatic updates" }])),
        )
        .expect(1)
        .mount(&hf)
        .await;

    let app = app(true, &openai, &hf).await;
    app.store.set_setting(HUGGINGFACE_API_KEY, Value::from("hf_test")).unwrap();

    let outcome = app.orchestrator.ask("should I update my phone").await.unwrap();

    assert_eq!(outcome.state, AnswerState::AnsweredOnline);
    assert_eq!(outcome.text, "Turn on automatic updates.");
    assert_eq!(outcome.provenance.provider, "huggingface");
    assert!(app.store.list_pending_unanswered(20).unwrap().is_empty());
    app.stop().await;
}

#[tokio::test]
async fn test_reconnect_reconciles_and_learns() {
    let openai = MockServer::start().await;
    let hf = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "Treat every device as untrusted" } }]
        })))
        .expect(1)
        .mount(&openai)
        .await;

    let mut app = app(false, &openai, &hf).await;
    app.store.set_setting(OPENAI_API_KEY, Value::from("sk-test")).unwrap();

    let question = "what does zero trust mean for my home lab";
    let outcome = app.orchestrator.ask(question).await.unwrap();
    let queued_id = outcome.queued_id.unwrap();

    // The monitor notices the network and reconciles in the background
    app.probe.set(true);
    tokio::time::timeout(Duration::from_secs(5), async {
        while !app.store.list_pending_unanswered(20).unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    app.orchestrator.wait_idle().await;

    let expected = "Treat every device as untrusted.";
    assert_eq!(
        app.orchestrator.router().knowledge().search(question).as_deref(),
        Some(expected)
    );
    assert_eq!(
        app.orchestrator
            .router()
            .knowledge()
            .search("what does zero trust mean at home")
            .as_deref(),
        Some(expected)
    );

    let last = &app.store.list_recent_chats(1).unwrap()[0];
    assert_eq!(last.text, expected);
    assert_eq!(last.metadata.get("reconciled"), Some(&Value::Bool(true)));
    assert_eq!(last.metadata.get("provider"), Some(&Value::from("openai")));

    let mut saw_online = false;
    while let Ok(event) = app.events.try_recv() {
        saw_online |= event == UiEvent::Connectivity { online: true };
    }
    assert!(saw_online);

    // The learned pair survives a restart through the overlay file
    let overlay = app
        .orchestrator
        .context()
        .config()
        .knowledge_config()
        .overlay_path
        .unwrap();
    let saved = std::fs::read_to_string(overlay).unwrap();
    assert!(saved.contains(question));
    assert!(queued_id > 0);
    app.stop().await;
}
