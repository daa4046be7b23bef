//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sentinel_core::{
    AnswerState, AnsweringOrchestrator, AppContext, SCAN_INTERVAL_SETTING, ScanScheduler,
    SentinelConfig, UiEvent, UiEvents,
};
use sentinel_providers::{HUGGINGFACE_API_KEY, OPENAI_API_KEY};
use sentinel_store::{Persistence, SqliteStore};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::render;

/// Online provider whose key `set-key` stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderKey {
    /// Chat completion API.
    Openai,

    /// Text generation API.
    Huggingface,
}

impl ProviderKey {
    /// Setting the secret is stored under.
    pub fn setting(self) -> &'static str {
        match self {
            Self::Openai => OPENAI_API_KEY,
            Self::Huggingface => HUGGINGFACE_API_KEY,
        }
    }
}

/// Running assistant: context, orchestrator and the event stream.
pub struct Runtime {
    orchestrator: AnsweringOrchestrator,
    events: UnboundedReceiver<UiEvent>,
}

impl Runtime {
    /// Open the database, load knowledge and start watching connectivity.
    pub async fn start(config: SentinelConfig, offline: bool) -> Result<Self> {
        let context = if offline {
            AppContext::open_offline(config)
        } else {
            AppContext::open(config)
        }
        .context("failed to open the assistant")?;
        let context = Arc::new(context);

        let router = context.build_router().await;
        let (ui, events) = UiEvents::channel();
        let orchestrator = AnsweringOrchestrator::new(Arc::clone(&context), router, ui);

        let initial = context
            .monitor()
            .start(orchestrator.connectivity_callback())
            .await
            .context("failed to start the connectivity monitor")?;
        info!("Starting {initial:?}");

        Ok(Self {
            orchestrator,
            events,
        })
    }

    /// Stop background work.
    pub async fn stop(&self) {
        self.orchestrator.context().monitor().stop().await;
        self.orchestrator.shutdown().await;
    }

    fn context(&self) -> &Arc<AppContext> {
        self.orchestrator.context()
    }

    fn print_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            if let Some(line) = render::event_line(&event) {
                println!("{line}");
            }
        }
    }
}

/// Write the configuration file and create the database.
pub fn init(config_path: &Path, config: &SentinelConfig) -> Result<()> {
    config
        .save(config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    SqliteStore::open(config.database_path()).context("failed to create the database")?;

    println!("Configuration: {}", config_path.display());
    println!("Database:      {}", config.database_path().display());
    Ok(())
}

/// Answer one question and print the outcome.
pub async fn ask(runtime: &mut Runtime, question: &str) -> Result<()> {
    let outcome = runtime.orchestrator.ask(question).await?;
    let note = match outcome.state {
        AnswerState::AnsweredOnline => "",
        AnswerState::AnsweredOffline => " (answered locally)",
        AnswerState::QueuedForReconcile => " (offline, queued for a better answer)",
    };
    println!("{}{note}", outcome.text);
    Ok(())
}

/// Interactive chat until end of input, `/quit` or Ctrl-C.
pub async fn chat(runtime: &mut Runtime) -> Result<()> {
    let online = if runtime.context().is_online() { "online" } else { "offline" };
    println!("Sentinel is {online}. Type a question, /reconcile or /quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    break;
                };
                match line.trim() {
                    "" => {}
                    "/quit" | "/exit" => break,
                    "/reconcile" => reconcile_now(runtime).await?,
                    question => runtime.orchestrator.spawn_question(question),
                }
            }
            Some(event) = runtime.events.recv() => {
                if let Some(line) = render::event_line(&event) {
                    println!("{line}");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    runtime.orchestrator.wait_idle().await;
    runtime.print_events();
    Ok(())
}

/// Re-ask pending questions online now.
pub async fn reconcile(runtime: &mut Runtime) -> Result<()> {
    if !runtime.context().is_online() {
        println!("Offline; pending questions stay queued.");
        return Ok(());
    }
    reconcile_now(runtime).await?;
    runtime.print_events();
    Ok(())
}

async fn reconcile_now(runtime: &Runtime) -> Result<()> {
    let report = runtime.orchestrator.drain_queue().await?;
    println!(
        "Reconciled {} of {} pending questions ({} still pending)",
        report.answered, report.attempted, report.still_pending
    );
    Ok(())
}

/// Connectivity, providers, knowledge and queue at a glance.
pub fn status(runtime: &Runtime) -> Result<()> {
    let context = runtime.context();
    let credentials = context.credentials();
    let configured: Vec<&str> = [ProviderKey::Openai, ProviderKey::Huggingface]
        .into_iter()
        .filter(|key| credentials.get(key.setting()).is_some())
        .map(|key| match key {
            ProviderKey::Openai => "openai",
            ProviderKey::Huggingface => "huggingface",
        })
        .collect();
    let pending = context.store().list_pending_unanswered(usize::MAX)?.len();

    println!("Connectivity:  {:?}", context.monitor().state());
    if configured.is_empty() {
        println!("Providers:     none configured");
    } else {
        println!("Providers:     {}", configured.join(", "));
    }
    println!("Knowledge:     {} pairs", runtime.orchestrator.router().knowledge().len());
    println!("Pending:       {pending}");
    match ScanScheduler::effective_interval(context.scan_interval_minutes()) {
        Some(interval) => println!("Scan interval: {} min", interval.as_secs_f64() / 60.0),
        None => println!("Scan interval: disabled"),
    }
    Ok(())
}

/// Print the last `limit` messages of `session`, oldest first.
pub fn history(store: &dyn Persistence, session: &str, limit: usize) -> Result<()> {
    for message in store.chat_history(session, limit)? {
        println!("{}", render::history_line(&message));
    }
    Ok(())
}

/// Print queued questions, oldest first.
pub fn pending(store: &dyn Persistence, limit: usize) -> Result<()> {
    let items = store.list_pending_unanswered(limit)?;
    if items.is_empty() {
        println!("No pending questions.");
    }
    for item in items {
        println!("{}", render::pending_line(&item));
    }
    Ok(())
}

/// Print recent scans, newest first.
pub fn scans(store: &dyn Persistence, limit: usize) -> Result<()> {
    for scan in store.recent_scans(limit)? {
        println!("{}", render::scan_line(&scan));
    }
    Ok(())
}

/// Store a provider secret in the settings table.
pub fn set_key(store: &dyn Persistence, provider: ProviderKey, secret: &str) -> Result<()> {
    let secret = secret.trim();
    anyhow::ensure!(!secret.is_empty(), "the key must not be empty");
    store.set_setting(provider.setting(), Value::from(secret))?;
    println!("Saved {}", provider.setting());
    Ok(())
}

/// Store the scan interval override, in minutes.
pub fn set_scan_interval(store: &dyn Persistence, minutes: f64) -> Result<()> {
    store.set_setting(SCAN_INTERVAL_SETTING, Value::from(minutes))?;
    match ScanScheduler::effective_interval(minutes) {
        Some(interval) => println!("Scans every {} min", interval.as_secs_f64() / 60.0),
        None => println!("Scheduled scans disabled"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sentinel_store::MemoryStore;

    #[test]
    fn test_set_key_stores_trimmed_secret() {
        let store = MemoryStore::new();
        set_key(&store, ProviderKey::Huggingface, "  hf_abc \n").unwrap();
        assert_eq!(
            store.get_setting_string(HUGGINGFACE_API_KEY).unwrap().as_deref(),
            Some("hf_abc")
        );
        assert!(set_key(&store, ProviderKey::Openai, "   ").is_err());
        assert_eq!(store.get_setting(OPENAI_API_KEY).unwrap(), None);
    }

    #[test]
    fn test_set_scan_interval_is_a_number() {
        let store = MemoryStore::new();
        set_scan_interval(&store, 15.0).unwrap();
        assert_eq!(
            store.get_setting(SCAN_INTERVAL_SETTING).unwrap(),
            Some(Value::from(15.0))
        );
    }
}
