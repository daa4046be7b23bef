//! # Providers
//!
//! The answering sources Sentinel can route a question to, and the
//! [`ProviderRouter`] that picks between them.
//!
//! ## Features
//!
//! - **Online chain**: OpenAI-style chat completion first, then
//!   Hugging-Face-style text generation, each only when its credential is set
//! - **Offline path**: local knowledge base, then an optional local model,
//!   then canned safety guidance
//! - **Provenance**: every answer records which provider and model produced it
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Provider Router                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  online:  OpenAiProvider ──► HuggingFaceProvider ──► None       │
//! │              (credential?)        (credential?)                 │
//! │                                                                 │
//! │  offline: KnowledgeStore ──► LocalModel ──► canned guidance     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod credentials;
pub mod error;
pub mod huggingface;
pub mod local;
pub mod openai;
pub mod persona;
pub mod provider;
pub mod router;

pub use credentials::{HUGGINGFACE_API_KEY, OPENAI_API_KEY, ProviderCredentials};
pub use error::{ProviderError, Result};
pub use huggingface::HuggingFaceProvider;
pub use local::{CANNED_GUIDANCE, LocalModel, OllamaModel};
pub use openai::OpenAiProvider;
pub use persona::Persona;
pub use provider::{OnlineProvider, Provenance, ProviderAnswer};
pub use router::{AnswerSource, LOCAL_FALLBACK, LOCAL_KB, LOCAL_MODEL, ProviderRouter, RoutedAnswer};
