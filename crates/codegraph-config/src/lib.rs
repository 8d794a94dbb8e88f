//! Configuration management for the codegraph code-graph engine.
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.codegraph/config.toml`
//! - Local config: `.codegraph/config.toml` (in the indexed workspace)
//! - CLI/environment overrides via [`ConfigOverrides`]
//!
//! Configuration is merged in order: global -> local -> overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration for the engine.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Storage Engine / Graph Store configuration
    pub storage: StorageConfig,

    /// Vector Index configuration
    pub vector: VectorConfig,

    /// Parser and analyzer configuration
    pub parser: ParserConfig,

    /// Indexer configuration
    pub indexer: IndexerConfig,

    /// Agent Coordinator configuration
    pub coordinator: CoordinatorConfig,

    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Storage Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for engine data (default: `.codegraph`)
    pub data_dir: PathBuf,

    /// Database file name within `data_dir`
    pub db_file: String,

    /// Enable WAL journaling (should always be true outside tests)
    pub wal: bool,

    /// Memory-map window size in bytes
    pub mmap_size_bytes: u64,

    /// Page cache size, in pages
    pub cache_pages: u32,

    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".codegraph"),
            db_file: "graph.db".to_string(),
            wal: true,
            mmap_size_bytes: 256 * 1024 * 1024,
            cache_pages: 10_000,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StorageConfig {
    /// Resolve the engine data directory for a workspace root.
    pub fn resolve_data_dir(&self, workspace_root: &std::path::Path) -> PathBuf {
        if self.data_dir.is_absolute() {
            self.data_dir.clone()
        } else {
            workspace_root.join(&self.data_dir)
        }
    }

    /// Resolve the database file path for a workspace root.
    pub fn resolve_db_path(&self, workspace_root: &std::path::Path) -> PathBuf {
        self.resolve_data_dir(workspace_root).join(&self.db_file)
    }
}

/// Vector Index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Vector dimension (must match the embedding provider's output)
    pub dimension: u32,

    /// Attempt to load the `sqlite-vec` extension; fall back to the
    /// BLOB + cosine-scan backend when unavailable
    pub use_extension: bool,

    /// Size of the LRU cache for recently embedded query vectors (fallback backend)
    pub query_cache_size: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dimension: 768,
            use_extension: true,
            query_cache_size: 256,
        }
    }
}

/// Parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum file size to parse with caching enabled, in bytes
    pub max_cached_file_size_bytes: u64,

    /// Maximum tree-sitter recursion depth before the circuit breaker trips
    pub max_recursion_depth: usize,

    /// Per-file wall-clock parse timeout
    pub file_timeout_ms: u64,

    /// Parse-result cache capacity (entries)
    pub parse_cache_size: usize,

    /// Per-language enable/disable and override switches
    pub languages: HashMap<String, LanguageConfig>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_cached_file_size_bytes: 1024 * 1024,
            max_recursion_depth: 50,
            file_timeout_ms: 5_000,
            parse_cache_size: 4_096,
            languages: HashMap::new(),
        }
    }
}

/// Language-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LanguageConfig {
    /// Enable this language's analyzer
    pub enabled: bool,
}

/// Indexer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Default batch size for graph-store writes
    pub batch_size: usize,

    /// Minimum batch size the adaptive adapter will shrink to
    pub min_batch_size: usize,

    /// Maximum batch size the adaptive adapter will grow to
    pub max_batch_size: usize,

    /// Target elapsed time per batch, in milliseconds
    pub target_batch_ms: u64,

    /// File patterns excluded from indexing
    pub exclude_patterns: Vec<String>,

    /// File count above which "large codebase" heuristics kick in
    pub large_codebase_file_threshold: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: 1_000,
            min_batch_size: 100,
            max_batch_size: 5_000,
            target_batch_ms: 100,
            exclude_patterns: vec![
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
                "**/.git/**".to_string(),
                "**/vendor/**".to_string(),
                "**/__pycache__/**".to_string(),
                "**/dist/**".to_string(),
                "**/build/**".to_string(),
            ],
            large_codebase_file_threshold: 20_000,
        }
    }
}

/// Agent Coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Worker pool size for the parser agent type
    pub parser_workers: usize,
    /// Worker pool size for the indexer agent type
    pub indexer_workers: usize,
    /// Worker pool size for the query agent type
    pub query_workers: usize,
    /// Worker pool size for the semantic agent type
    pub semantic_workers: usize,
    /// Hard cap on queued tasks before `Backpressure` is returned
    pub queue_capacity: usize,
    /// Default interactive task deadline, in milliseconds
    pub default_deadline_ms: u64,
    /// Indexing task deadline, in milliseconds
    pub indexing_deadline_ms: u64,
    /// Stuck-task watchdog threshold, in milliseconds
    pub stuck_task_threshold_ms: u64,
    /// Resource sample interval, in milliseconds
    pub resource_sample_interval_ms: u64,
    /// Memory high watermark, as a fraction of total system memory
    pub memory_high_watermark: f32,
    /// Memory low watermark, as a fraction of total system memory
    pub memory_low_watermark: f32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            parser_workers: 4,
            indexer_workers: 2,
            query_workers: 10,
            semantic_workers: 5,
            queue_capacity: 100,
            default_deadline_ms: 20_000,
            indexing_deadline_ms: 300_000,
            stuck_task_threshold_ms: 60_000,
            resource_sample_interval_ms: 2_000,
            memory_high_watermark: 0.85,
            memory_low_watermark: 0.60,
        }
    }
}

/// Embedding provider configuration.
///
/// Controls which provider generates embeddings for semantic search.
///
/// # Example TOML
///
/// ```toml
/// [embedding]
/// provider = "local"  # or "azure-ml" or "openai"
///
/// [embedding.azure_ml]
/// endpoint = "https://..."
///
/// [embedding.openai]
/// url = "https://api.openai.com/v1"
/// api_key_env = "OPENAI_API_KEY"
/// semantic_model = "text-embedding-3-small"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which embedding provider to use
    pub provider: EmbeddingProviderType,

    /// Azure ML provider settings (required when provider = "azure-ml")
    pub azure_ml: Option<AzureMLSettings>,

    /// OpenAI-compatible provider settings (required when provider = "openai")
    pub openai: Option<OpenAISettings>,

    /// Consecutive-failure threshold before the circuit breaker opens
    pub breaker_failure_threshold: u32,

    /// Circuit breaker cool-down, in seconds
    pub breaker_cooldown_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::default(),
            azure_ml: None,
            openai: None,
            breaker_failure_threshold: DEFAULT_BREAKER_FAILURE_THRESHOLD,
            breaker_cooldown_secs: DEFAULT_BREAKER_COOLDOWN_SECS,
        }
    }
}

impl EmbeddingConfig {
    /// Validate that required settings exist for the selected provider.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.provider {
            EmbeddingProviderType::Local => Ok(()),
            EmbeddingProviderType::AzureMl => {
                let settings = self.azure_ml.as_ref().ok_or_else(|| {
                    ConfigError::ValidationError(
                        "embedding.provider is 'azure-ml' but [embedding.azure_ml] section is missing".to_string(),
                    )
                })?;
                if settings.endpoint.is_empty() {
                    return Err(ConfigError::ValidationError(
                        "embedding.azure_ml.endpoint is required".to_string(),
                    ));
                }
                Ok(())
            }
            EmbeddingProviderType::Openai => {
                let settings = self.openai.as_ref().ok_or_else(|| {
                    ConfigError::ValidationError(
                        "embedding.provider is 'openai' but [embedding.openai] section is missing"
                            .to_string(),
                    )
                })?;
                if settings.url.is_empty() {
                    return Err(ConfigError::ValidationError(
                        "embedding.openai.url is required".to_string(),
                    ));
                }
                if settings.semantic_model.is_empty() {
                    return Err(ConfigError::ValidationError(
                        "embedding.openai.semantic_model is required".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Default consecutive-failure threshold for the embedding circuit breaker.
pub const DEFAULT_BREAKER_FAILURE_THRESHOLD: u32 = 5;
/// Default circuit-breaker cool-down, in seconds.
pub const DEFAULT_BREAKER_COOLDOWN_SECS: u64 = 60;

/// Embedding provider type selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProviderType {
    /// Local provider using a Candle-hosted model (default)
    #[default]
    Local,
    /// Azure ML Online Endpoints
    AzureMl,
    /// OpenAI-compatible API (OpenAI, Azure OpenAI, Ollama, etc.)
    Openai,
}

impl std::fmt::Display for EmbeddingProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::AzureMl => write!(f, "azure-ml"),
            Self::Openai => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "azure-ml" | "azureml" | "azure_ml" => Ok(Self::AzureMl),
            "openai" => Ok(Self::Openai),
            _ => Err(ConfigError::ValidationError(format!(
                "Unknown embedding provider: '{}'. Valid values: local, azure-ml, openai",
                s
            ))),
        }
    }
}

/// Azure ML provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureMLSettings {
    pub endpoint: String,
    pub auth_key_env: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for AzureMLSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            auth_key_env: Some("CODEGRAPH_AZURE_ML_API_KEY".to_string()),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// OpenAI-compatible provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    pub url: String,
    pub api_key_env: Option<String>,
    pub semantic_model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            semantic_model: "text-embedding-3-small".to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (text, json)
    pub format: LogFormat,
    /// Log file path (optional; rotation is handled externally)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// CLI/environment overrides for configuration values.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workspace_root: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub embedding_provider: Option<EmbeddingProviderType>,
    pub log_level: Option<String>,
    pub queue_capacity: Option<usize>,
}

impl EngineConfig {
    /// Apply CLI/environment overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref dir) = overrides.data_dir {
            self.storage.data_dir = dir.clone();
        }
        if let Some(provider) = overrides.embedding_provider {
            self.embedding.provider = provider;
        }
        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
        if let Some(cap) = overrides.queue_capacity {
            self.coordinator.queue_capacity = cap;
        }
    }

    /// Apply `CODEGRAPH_*` environment variable overrides.
    ///
    /// Recognized variables: `CODEGRAPH_LOG_LEVEL`, `CODEGRAPH_DATA_DIR`,
    /// `CODEGRAPH_EMBEDDING_PROVIDER`, `CODEGRAPH_QUEUE_CAPACITY`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(level) = std::env::var("CODEGRAPH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(dir) = std::env::var("CODEGRAPH_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Ok(provider) = std::env::var("CODEGRAPH_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider.parse()?;
        }
        if let Ok(cap) = std::env::var("CODEGRAPH_QUEUE_CAPACITY") {
            self.coordinator.queue_capacity = cap.parse().map_err(|_| {
                ConfigError::invalid_value("CODEGRAPH_QUEUE_CAPACITY", "must be an integer")
            })?;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.storage.data_dir, PathBuf::from(".codegraph"));
        assert_eq!(config.storage.db_file, "graph.db");
        assert_eq!(config.coordinator.parser_workers, 4);
        assert_eq!(config.coordinator.query_workers, 10);
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = EngineConfig::default();
        let overrides = ConfigOverrides {
            data_dir: Some(PathBuf::from("/custom/dir")),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        config.apply_overrides(&overrides);
        assert_eq!(config.storage.data_dir, PathBuf::from("/custom/dir"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_resolve_db_path_relative() {
        let config = StorageConfig::default();
        let workspace = PathBuf::from("/home/user/project");
        assert_eq!(
            config.resolve_db_path(&workspace),
            PathBuf::from("/home/user/project/.codegraph/graph.db")
        );
    }

    #[test]
    fn test_resolve_db_path_absolute() {
        let mut config = StorageConfig::default();
        config.data_dir = PathBuf::from("/absolute/.codegraph");
        let workspace = PathBuf::from("/home/user/project");
        assert_eq!(
            config.resolve_db_path(&workspace),
            PathBuf::from("/absolute/.codegraph/graph.db")
        );
    }

    #[test]
    fn test_embedding_provider_type_roundtrip() {
        assert_eq!(EmbeddingProviderType::Local.to_string(), "local");
        assert_eq!(
            "azure-ml".parse::<EmbeddingProviderType>().unwrap(),
            EmbeddingProviderType::AzureMl
        );
        assert!("unknown".parse::<EmbeddingProviderType>().is_err());
    }

    #[test]
    fn test_embedding_config_validate_azure_ml_missing() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderType::AzureMl,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("azure_ml"));
    }

    #[test]
    fn test_embedding_config_validate_openai_valid() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderType::Openai,
            openai: Some(OpenAISettings::default()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.storage.db_file, config.storage.db_file);
        assert_eq!(
            parsed.coordinator.parser_workers,
            config.coordinator.parser_workers
        );
    }
}
