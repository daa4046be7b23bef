//! Configuration for the assistant.

use std::path::{Path, PathBuf};

use sentinel_connectivity::MonitorConfig;
use sentinel_knowledge::KnowledgeConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Session that reconciled answers are posted to.
pub const DEFAULT_SESSION: &str = "default";

/// Top-level configuration. Every field has a default, so an empty or
/// partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Directory holding the database and the learned knowledge.
    pub data_dir: PathBuf,

    /// Chat session new questions belong to.
    pub session_id: String,

    /// Name the persona addresses the user by.
    pub user_name: String,

    /// Prefix knowledge-base and canned answers with the persona.
    pub style_offline_answers: bool,

    /// Pending questions handled per reconciliation sweep.
    pub reconcile_batch: usize,

    /// Questions answered concurrently in the background.
    pub max_workers: usize,

    /// Minutes between scheduled scans; zero or less disables them.
    pub scan_interval_minutes: f64,

    /// Knowledge base locations.
    pub knowledge: KnowledgeConfig,

    /// Connectivity probing.
    pub connectivity: MonitorConfig,

    /// Answering providers.
    pub providers: ProvidersConfig,
}

impl SentinelConfig {
    /// Create a configuration rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            session_id: DEFAULT_SESSION.to_string(),
            user_name: "Analyst".to_string(),
            style_offline_answers: false,
            reconcile_batch: 20,
            max_workers: 4,
            scan_interval_minutes: 60.0,
            knowledge: KnowledgeConfig::default(),
            connectivity: MonitorConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }

    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join("sentinel")
            .join("config.toml")
    }

    /// Load the configuration at `path`, or the defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write the configuration to `path` as TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_err)?;
        Ok(())
    }

    /// SQLite database path.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("sentinel.db")
    }

    /// Knowledge locations with the overlay defaulted into the data directory.
    pub fn knowledge_config(&self) -> KnowledgeConfig {
        let mut knowledge = self.knowledge.clone();
        if knowledge.overlay_path.is_none() {
            knowledge.overlay_path = Some(self.data_dir.join("kb.json"));
        }
        knowledge
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the user name.
    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = name.into();
        self
    }
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self::new(dirs::data_dir().unwrap_or_default().join("sentinel"))
    }
}

/// Endpoints, models and timeouts of the answering providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Chat completion API base URL.
    pub openai_base_url: String,

    /// Chat completion model.
    pub openai_model: String,

    /// Chat completion timeout, in seconds.
    pub openai_timeout_secs: u64,

    /// Text generation API base URL.
    pub huggingface_base_url: String,

    /// Text generation model.
    pub huggingface_model: String,

    /// Text generation timeout, in seconds.
    pub huggingface_timeout_secs: u64,

    /// Local model tag; unset disables the local model.
    pub local_model: Option<String>,

    /// Local model server URL.
    pub local_model_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            openai_timeout_secs: 30,
            huggingface_base_url: "https://api-inference.huggingface.co".to_string(),
            huggingface_model: "meta-llama/Meta-Llama-3-8B-Instruct".to_string(),
            huggingface_timeout_secs: 60,
            local_model: None,
            local_model_url: "http://localhost:11434".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "user_name = \"Dana\"\nreconcile_batch = 5\n\n[connectivity]\ninterval_secs = 30\n",
        )
        .unwrap();

        let config = SentinelConfig::load(&path).unwrap();
        assert_eq!(config.user_name, "Dana");
        assert_eq!(config.reconcile_batch, 5);
        assert_eq!(config.connectivity.interval_secs, 30);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.session_id, DEFAULT_SESSION);
        assert_eq!(config.providers.openai_timeout_secs, 30);
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = SentinelConfig::load(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.reconcile_batch, 20);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let config = SentinelConfig::new(temp_dir.path()).with_user_name("Lee");
        config.save(&path).unwrap();

        let loaded = SentinelConfig::load(&path).unwrap();
        assert_eq!(loaded.user_name, "Lee");
        assert_eq!(loaded.data_dir, temp_dir.path());
        assert_eq!(loaded.providers, ProvidersConfig::default());
    }

    #[test]
    fn test_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "max_workers = \"many\"").unwrap();
        assert!(matches!(SentinelConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_overlay_defaults_into_data_dir() {
        let config = SentinelConfig::new("/var/lib/sentinel");
        assert_eq!(
            config.knowledge_config().overlay_path,
            Some(PathBuf::from("/var/lib/sentinel/kb.json"))
        );
        assert_eq!(config.database_path(), PathBuf::from("/var/lib/sentinel/sentinel.db"));
    }
}
