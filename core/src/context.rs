//! Shared handles passed to the orchestrator at construction.

use std::sync::Arc;
use std::time::Duration;

use sentinel_connectivity::{ConnectivityMonitor, ConnectivityState, FixedProbe};
use sentinel_knowledge::KnowledgeStore;
use sentinel_providers::{
    HUGGINGFACE_API_KEY, HuggingFaceProvider, OPENAI_API_KEY, OllamaModel, OpenAiProvider, Persona,
    ProviderCredentials, ProviderRouter,
};
use sentinel_store::{Persistence, SqliteStore};
use tracing::{debug, warn};

use crate::config::SentinelConfig;
use crate::error::Result;

/// Setting key overriding the configured scan interval.
pub const SCAN_INTERVAL_SETTING: &str = "SCAN_INTERVAL_MIN";

/// Configuration, connectivity and persistence, owned together.
pub struct AppContext {
    config: SentinelConfig,
    monitor: Arc<ConnectivityMonitor>,
    store: Arc<dyn Persistence>,
}

impl AppContext {
    /// Assemble a context from existing parts.
    pub fn new(
        config: SentinelConfig,
        monitor: Arc<ConnectivityMonitor>,
        store: Arc<dyn Persistence>,
    ) -> Self {
        Self {
            config,
            monitor,
            store,
        }
    }

    /// Open the configured database and build an HTTP connectivity monitor.
    pub fn open(config: SentinelConfig) -> Result<Self> {
        let store = SqliteStore::open(config.database_path())?;
        let monitor = ConnectivityMonitor::from_config(&config.connectivity)?;
        Ok(Self::new(config, Arc::new(monitor), Arc::new(store)))
    }

    /// Open the configured database with connectivity pinned offline.
    pub fn open_offline(config: SentinelConfig) -> Result<Self> {
        let store = SqliteStore::open(config.database_path())?;
        let monitor = ConnectivityMonitor::new(
            Arc::new(FixedProbe::new(false)),
            Duration::from_secs(3600),
        );
        Ok(Self::new(config, Arc::new(monitor), Arc::new(store)))
    }

    /// Configuration.
    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    /// Connectivity monitor.
    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    /// Persistence.
    pub fn store(&self) -> &Arc<dyn Persistence> {
        &self.store
    }

    /// Whether the monitor last saw the network.
    ///
    /// A monitor that has not probed yet counts as offline.
    pub fn is_online(&self) -> bool {
        self.monitor.state() == ConnectivityState::Online
    }

    /// Provider credentials from settings, with the environment as fallback.
    pub fn credentials(&self) -> ProviderCredentials {
        let mut stored = ProviderCredentials::new();
        for key in [OPENAI_API_KEY, HUGGINGFACE_API_KEY] {
            match self.store.get_setting_string(key) {
                Ok(Some(secret)) => stored.insert(key, secret),
                Ok(None) => {}
                Err(e) => warn!("Failed to read {key}: {e}"),
            }
        }
        let credentials = stored.or(ProviderCredentials::from_env());
        debug!("Provider credentials: {credentials:?}");
        credentials
    }

    /// Scan interval in minutes; the stored setting wins over the file.
    pub fn scan_interval_minutes(&self) -> f64 {
        match self.store.get_setting(SCAN_INTERVAL_SETTING) {
            Ok(Some(value)) => value
                .as_f64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
                .unwrap_or(self.config.scan_interval_minutes),
            Ok(None) => self.config.scan_interval_minutes,
            Err(e) => {
                warn!("Failed to read {SCAN_INTERVAL_SETTING}: {e}");
                self.config.scan_interval_minutes
            }
        }
    }

    /// The persona addressing the configured user.
    pub fn persona(&self) -> Persona {
        Persona::new(&self.config.user_name)
    }

    /// Load the knowledge base and build the provider chain from configuration.
    pub async fn build_router(&self) -> ProviderRouter {
        let knowledge = KnowledgeStore::open(self.config.knowledge_config()).await;
        let providers = &self.config.providers;
        let persona = self.persona();

        let mut router = ProviderRouter::new(Arc::new(knowledge))
            .with_provider(Arc::new(
                OpenAiProvider::new()
                    .with_base_url(&providers.openai_base_url)
                    .with_model(&providers.openai_model)
                    .with_timeout(Duration::from_secs(providers.openai_timeout_secs))
                    .with_persona(persona.clone()),
            ))
            .with_provider(Arc::new(
                HuggingFaceProvider::new()
                    .with_base_url(&providers.huggingface_base_url)
                    .with_model(&providers.huggingface_model)
                    .with_timeout(Duration::from_secs(providers.huggingface_timeout_secs))
                    .with_persona(persona.clone()),
            ))
            .with_persona(persona)
            .with_styled_offline(self.config.style_offline_answers);

        if let Some(model) = &providers.local_model {
            router = router.with_local_model(Arc::new(
                OllamaModel::new(model).with_base_url(&providers.local_model_url),
            ));
        }
        router
    }
}
