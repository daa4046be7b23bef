//! Question/answer storage, fuzzy lookup, and learning.
//!
//! The `KnowledgeStore` keeps its pairs behind an `Arc` snapshot so lookups
//! never wait on a writer's disk I/O. Writers serialize on a store-scoped
//! mutex and rewrite the whole overlay file through a temp file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{KnowledgeError, Result};
use crate::similarity::{jaccard, tokens};
use crate::{BUNDLED_KNOWLEDGE, MATCH_THRESHOLD};

/// A single question and its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    /// The question as it was asked.
    #[serde(rename = "q", default)]
    pub question: String,

    /// The answer to return when a similar question is asked.
    #[serde(rename = "a", default)]
    pub answer: String,
}

impl QaPair {
    /// Create a new pair.
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Where the store loads from and learns into.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Read-only default knowledge. `None` uses the knowledge compiled into the crate.
    pub bundled_path: Option<PathBuf>,

    /// User-writable overlay. `None` keeps learned pairs in memory only.
    pub overlay_path: Option<PathBuf>,
}

impl KnowledgeConfig {
    /// Set the overlay path.
    pub fn with_overlay(mut self, path: impl Into<PathBuf>) -> Self {
        self.overlay_path = Some(path.into());
        self
    }

    /// Set the bundled path.
    pub fn with_bundled(mut self, path: impl Into<PathBuf>) -> Self {
        self.bundled_path = Some(path.into());
        self
    }
}

/// The best stored pair for a question, with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeMatch {
    /// The stored question that matched.
    pub question: String,

    /// The stored answer.
    pub answer: String,

    /// Jaccard score of the stored question against the asked one.
    pub score: f32,
}

/// Question/answer store seeded from bundled defaults plus a user overlay.
pub struct KnowledgeStore {
    /// Current pairs; bundled first, then overlay, then learned.
    pairs: RwLock<Arc<Vec<QaPair>>>,

    /// Overlay file that `learn` rewrites.
    overlay_path: Option<PathBuf>,

    /// Serializes learners and their overlay writes.
    writer: Mutex<()>,
}

impl KnowledgeStore {
    /// Create a store from an explicit list of pairs, without an overlay file.
    pub fn from_pairs(pairs: Vec<QaPair>) -> Self {
        Self {
            pairs: RwLock::new(Arc::new(pairs)),
            overlay_path: None,
            writer: Mutex::new(()),
        }
    }

    /// Load the bundled defaults and the overlay.
    ///
    /// A source that is missing or unreadable contributes no pairs; opening
    /// never fails.
    pub async fn open(config: KnowledgeConfig) -> Self {
        let bundled = match &config.bundled_path {
            Some(path) => load_file(path).await,
            None => parse(BUNDLED_KNOWLEDGE),
        }
        .unwrap_or_else(|e| {
            warn!("Failed to load bundled knowledge: {e}");
            Vec::new()
        });

        let overlay = match &config.overlay_path {
            Some(path) if path.exists() => load_file(path).await.unwrap_or_else(|e| {
                warn!("Failed to load knowledge overlay: {e}");
                Vec::new()
            }),
            _ => Vec::new(),
        };

        info!(
            "Loaded {} bundled and {} learned knowledge pairs",
            bundled.len(),
            overlay.len()
        );

        let mut pairs = bundled;
        pairs.extend(overlay);

        Self {
            pairs: RwLock::new(Arc::new(pairs)),
            overlay_path: config.overlay_path,
            writer: Mutex::new(()),
        }
    }

    /// Current snapshot of all pairs.
    pub fn pairs(&self) -> Arc<Vec<QaPair>> {
        let guard = self.pairs.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.pairs().len()
    }

    /// Whether the store holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs().is_empty()
    }

    /// Path of the overlay file, if any.
    pub fn overlay_path(&self) -> Option<&Path> {
        self.overlay_path.as_deref()
    }

    /// Answer for the stored question most similar to `question`, if it
    /// scores at least [`MATCH_THRESHOLD`].
    pub fn search(&self, question: &str) -> Option<String> {
        self.search_scored(question).map(|m| m.answer)
    }

    /// Like [`KnowledgeStore::search`], keeping the matched question and score.
    ///
    /// On equal scores the earlier pair wins, so bundled answers shadow
    /// learned ones unless a learned question scores strictly higher.
    pub fn search_scored(&self, question: &str) -> Option<KnowledgeMatch> {
        let asked = tokens(question);
        let pairs = self.pairs();

        let mut best: Option<(&QaPair, f32)> = None;
        for pair in pairs.iter() {
            let score = jaccard(&asked, &tokens(&pair.question));
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((pair, score));
            }
        }

        let (pair, score) = best?;
        if score < MATCH_THRESHOLD || pair.answer.is_empty() {
            debug!("No knowledge match (best score {score:.2})");
            return None;
        }

        debug!("Knowledge match {score:.2} for {:?}", pair.question);
        Some(KnowledgeMatch {
            question: pair.question.clone(),
            answer: pair.answer.clone(),
            score,
        })
    }

    /// Append a pair and rewrite the overlay with every pair in memory.
    ///
    /// Write failures are logged and dropped; the pair stays learned for the
    /// rest of the session either way.
    pub async fn learn(&self, question: impl Into<String>, answer: impl Into<String>) {
        let pair = QaPair::new(question, answer);
        let _writer = self.writer.lock().await;

        let snapshot = {
            let mut guard = self.pairs.write().unwrap_or_else(PoisonError::into_inner);
            Arc::make_mut(&mut *guard).push(pair);
            Arc::clone(&*guard)
        };
        info!("Learned knowledge pair ({} total)", snapshot.len());

        if let Some(path) = &self.overlay_path {
            if let Err(e) = save_file(path, &snapshot).await {
                warn!("Failed to persist learned knowledge: {e}");
            }
        }
    }
}

fn parse(content: &str) -> Result<Vec<QaPair>> {
    Ok(serde_json::from_str(content)?)
}

async fn load_file(path: &Path) -> Result<Vec<QaPair>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| KnowledgeError::Read {
            path: path.display().to_string(),
            source,
        })?;
    parse(&content)
}

async fn save_file(path: &Path, pairs: &[QaPair]) -> Result<()> {
    let write_err = |source| KnowledgeError::Write {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let content = serde_json::to_string_pretty(pairs)?;

    // Write atomically using a temp file
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &content).await.map_err(write_err)?;
    fs::rename(&temp_path, path).await.map_err(write_err)?;

    debug!("Saved {} knowledge pairs to {}", pairs.len(), path.display());
    Ok(())
}
