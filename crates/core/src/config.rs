//! Configuration management for the opsdiag service.
//!
//! Configuration is merged from three layers, later layers winning:
//! - Built-in defaults
//! - Optional YAML config file (`opsdiag.yaml`)
//! - Environment variables and CLI flags
//!
//! All state lives under a single data directory: the SQLite knowledge and
//! case databases plus the LanceDB index directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Name of the vector index collection. One record per knowledge entry.
pub const INDEX_COLLECTION: &str = "fault_knowledge";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the SQLite databases and the vector index
    pub data_dir: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Embedding model settings
    pub embedding: EmbeddingSettings,

    /// Generation engine settings
    pub engine: EngineSettings,

    /// Bind address for the HTTP server
    pub bind_addr: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Settings for the embedding model used by retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider identifier ("ollama", "trigram")
    pub provider: String,

    /// Model identifier (e.g. "nomic-embed-text")
    pub model: String,

    /// Provider endpoint override
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Embedding vector dimension
    pub dimension: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            endpoint: None,
            dimension: 768,
        }
    }
}

/// Settings for the generation engine used to produce diagnoses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Provider identifier ("dashscope", "ollama")
    pub provider: String,

    /// Model identifier (e.g. "qwen-max", "llama3.2")
    pub model: String,

    /// Provider endpoint override
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the API credential
    #[serde(rename = "apiKeyEnv")]
    pub api_key_env: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Nucleus sampling parameter
    pub top_p: f32,

    /// Request timeout for the engine call, in seconds
    pub timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            provider: "dashscope".to_string(),
            model: "qwen-max".to_string(),
            endpoint: None,
            api_key_env: "DASHSCOPE_API_KEY".to_string(),
            max_tokens: 1500,
            temperature: 0.7,
            top_p: 0.8,
            timeout_secs: 60,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    embedding: Option<EmbeddingSettings>,
    engine: Option<EngineSettings>,
    server: Option<ServerConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerConfig {
    bind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            config_file: None,
            embedding: EmbeddingSettings::default(),
            engine: EngineSettings::default(),
            bind_addr: "127.0.0.1:8000".to_string(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment variables.
    ///
    /// Environment variables:
    /// - `OPSDIAG_DATA_DIR`: Override data directory
    /// - `OPSDIAG_CONFIG`: Path to config file
    /// - `OPSDIAG_PROVIDER`: Generation engine provider
    /// - `OPSDIAG_MODEL`: Generation model identifier
    /// - `OPSDIAG_BIND`: HTTP bind address
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(data_dir) = std::env::var("OPSDIAG_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(config_file) = std::env::var("OPSDIAG_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        let config_path = if let Some(ref cf) = config.config_file {
            cf.clone()
        } else {
            PathBuf::from("opsdiag.yaml")
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("OPSDIAG_PROVIDER") {
            config.engine.provider = provider;
        }

        if let Ok(model) = std::env::var("OPSDIAG_MODEL") {
            config.engine.model = model;
        }

        if let Ok(bind) = std::env::var("OPSDIAG_BIND") {
            config.bind_addr = bind;
        }

        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(data_dir) = config_file.data_dir {
            result.data_dir = data_dir;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(engine) = config_file.engine {
            result.engine = engine;
        }

        if let Some(server) = config_file.server {
            if let Some(bind) = server.bind {
                result.bind_addr = bind;
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides, giving precedence to flags over everything else.
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.engine.provider = provider;
        }

        if let Some(model) = model {
            self.engine.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the LanceDB index directory.
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }

    /// Path to the knowledge store database.
    pub fn knowledge_db_path(&self) -> PathBuf {
        self.data_dir.join("knowledge.db")
    }

    /// Path to the diagnosis case database.
    pub fn cases_db_path(&self) -> PathBuf {
        self.data_dir.join("cases.db")
    }

    /// Ensure the data directory exists.
    pub fn ensure_data_dir(&self) -> AppResult<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir).map_err(|e| {
                AppError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolve the generation engine API key from the configured env var.
    ///
    /// Returns `Ok(None)` when the variable is unset; callers that require a
    /// credential turn that into a `Config` error via [`AppConfig::validate`].
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.engine.api_key_env).ok()
    }

    /// Validate configuration for the active providers.
    pub fn validate(&self) -> AppResult<()> {
        let known_engines = ["dashscope", "ollama"];
        if !known_engines.contains(&self.engine.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown engine provider: {}. Supported: {}",
                self.engine.provider,
                known_engines.join(", ")
            )));
        }

        let known_embedders = ["ollama", "trigram"];
        if !known_embedders.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                known_embedders.join(", ")
            )));
        }

        // DashScope requires a credential; absence is a configuration error,
        // not a crash at request time.
        if self.engine.provider == "dashscope" && self.resolve_api_key().is_none() {
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                self.engine.api_key_env
            )));
        }

        if self.embedding.dimension == 0 {
            return Err(AppError::Config(
                "Embedding dimension must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.engine.provider, "dashscope");
        assert_eq!(config.engine.model, "qwen-max");
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.engine.max_tokens, 1500);
        assert!(!config.verbose);
    }

    #[test]
    fn test_data_paths() {
        let config = AppConfig::default();
        assert!(config.index_dir().ends_with("index"));
        assert!(config.knowledge_db_path().ends_with("knowledge.db"));
        assert!(config.cases_db_path().ends_with("cases.db"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.engine.provider, "ollama");
        assert_eq!(overridden.engine.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_engine() {
        let mut config = AppConfig::default();
        config.engine.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama_needs_no_key() {
        let mut config = AppConfig::default();
        config.engine.provider = "ollama".to_string();
        config.embedding.provider = "trigram".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opsdiag.yaml");
        std::fs::write(
            &path,
            r#"
data_dir: /var/lib/opsdiag
engine:
  provider: ollama
  model: llama3.2
  apiKeyEnv: UNUSED
  max_tokens: 800
  temperature: 0.5
  top_p: 0.9
  timeout_secs: 30
server:
  bind: "0.0.0.0:9000"
"#,
        )
        .unwrap();

        let mut config = AppConfig::default();
        let merged = config.merge_yaml(&path).unwrap();
        assert_eq!(merged.data_dir, PathBuf::from("/var/lib/opsdiag"));
        assert_eq!(merged.engine.model, "llama3.2");
        assert_eq!(merged.engine.max_tokens, 800);
        assert_eq!(merged.bind_addr, "0.0.0.0:9000");
        // Untouched sections keep defaults
        assert_eq!(merged.embedding.dimension, 768);
    }
}
