//! Ordered fallback chain across online and offline answering sources.

use std::sync::Arc;

use sentinel_knowledge::KnowledgeStore;
use tracing::{debug, info, warn};

use crate::credentials::ProviderCredentials;
use crate::local::{CANNED_GUIDANCE, LocalModel};
use crate::persona::Persona;
use crate::provider::{OnlineProvider, Provenance};

/// Provider id of knowledge-base answers.
pub const LOCAL_KB: &str = "local_kb";

/// Provider id of local model answers.
pub const LOCAL_MODEL: &str = "local_model";

/// Provider id of the canned guidance.
pub const LOCAL_FALLBACK: &str = "local_fallback";

/// Which kind of source produced a [`RoutedAnswer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    /// A remote provider.
    Online,

    /// The local knowledge base.
    KnowledgeBase,

    /// The on-device model.
    LocalModel,

    /// The canned guidance.
    Canned,
}

impl AnswerSource {
    /// Whether the answer came from a remote provider.
    pub fn is_online(self) -> bool {
        self == Self::Online
    }
}

/// An answer plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedAnswer {
    /// Answer text, before post-processing.
    pub text: String,

    /// Provider and model.
    pub provenance: Provenance,

    /// Kind of source.
    pub source: AnswerSource,
}

/// Routes a question through the configured answering sources.
pub struct ProviderRouter {
    /// Online providers in priority order.
    providers: Vec<Arc<dyn OnlineProvider>>,

    /// Local knowledge base.
    knowledge: Arc<KnowledgeStore>,

    /// Optional on-device model.
    local_model: Option<Arc<dyn LocalModel>>,

    /// Persona for local prompts and styled offline answers.
    persona: Persona,

    /// Prefix knowledge-base and canned answers with the persona.
    style_offline: bool,
}

impl ProviderRouter {
    /// Create a router with no online providers and no local model.
    pub fn new(knowledge: Arc<KnowledgeStore>) -> Self {
        Self {
            providers: Vec::new(),
            knowledge,
            local_model: None,
            persona: Persona::default(),
            style_offline: false,
        }
    }

    /// Append an online provider; earlier providers are tried first.
    pub fn with_provider(mut self, provider: Arc<dyn OnlineProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Install a local model.
    pub fn with_local_model(mut self, model: Arc<dyn LocalModel>) -> Self {
        self.local_model = Some(model);
        self
    }

    /// Set the persona.
    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    /// Prefix knowledge-base and canned answers with the persona.
    pub fn with_styled_offline(mut self, enabled: bool) -> Self {
        self.style_offline = enabled;
        self
    }

    /// The knowledge store consulted offline and taught by reconciliation.
    pub fn knowledge(&self) -> &Arc<KnowledgeStore> {
        &self.knowledge
    }

    /// Names of the online providers, in priority order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// First answer from a configured online provider.
    ///
    /// Providers without a credential are skipped without a request. A
    /// failing provider is logged and the next one is tried. `None` when no
    /// provider is configured or all of them failed.
    pub async fn answer_online(
        &self,
        question: &str,
        credentials: &ProviderCredentials,
    ) -> Option<RoutedAnswer> {
        for provider in &self.providers {
            let Some(credential) = credentials.get(provider.credential_key()) else {
                debug!("Skipping {}: no {}", provider.name(), provider.credential_key());
                continue;
            };

            debug!("Asking {} ({})", provider.name(), provider.model());
            match provider.answer(credential, question).await {
                Ok(answer) => {
                    info!("Answered online by {}", provider.name());
                    return Some(RoutedAnswer {
                        text: answer.text,
                        provenance: answer.provenance,
                        source: AnswerSource::Online,
                    });
                }
                Err(e) if e.is_transient() => {
                    warn!("Provider {} temporarily unavailable: {e}", provider.name());
                }
                Err(e) => warn!("Provider {} failed: {e}", provider.name()),
            }
        }
        None
    }

    /// Best offline answer: knowledge base, then local model, then canned
    /// guidance. Never fails.
    pub async fn answer_offline(&self, question: &str) -> RoutedAnswer {
        if let Some(answer) = self.knowledge.search(question) {
            debug!("Answered from knowledge base");
            return RoutedAnswer {
                text: self.styled(&answer),
                provenance: Provenance::new(LOCAL_KB),
                source: AnswerSource::KnowledgeBase,
            };
        }

        if let Some(model) = &self.local_model {
            match model.generate(&self.persona.compose(question)).await {
                Ok(Some(text)) => {
                    debug!("Answered by local model {}", model.name());
                    return RoutedAnswer {
                        text,
                        provenance: Provenance::new(LOCAL_MODEL).with_model(model.name()),
                        source: AnswerSource::LocalModel,
                    };
                }
                Ok(None) => debug!("Local model {} had no answer", model.name()),
                Err(e) => warn!("Local model {} failed: {e}", model.name()),
            }
        }

        RoutedAnswer {
            text: self.styled(CANNED_GUIDANCE),
            provenance: Provenance::new(LOCAL_FALLBACK),
            source: AnswerSource::Canned,
        }
    }

    fn styled(&self, answer: &str) -> String {
        if self.style_offline {
            self.persona.style(answer)
        } else {
            answer.to_string()
        }
    }
}
