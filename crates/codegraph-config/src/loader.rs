//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.codegraph/config.toml`
//! 2. Local config: `.codegraph/config.toml` (in workspace)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{ConfigOverrides, EngineConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".codegraph";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".codegraph";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.codegraph`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<EngineConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.codegraph`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a workspace.
    pub fn local_config_path(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a workspace with optional CLI overrides.
    ///
    /// Merges config in order: global -> local -> overrides.
    pub fn load(
        &mut self,
        workspace_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<EngineConfig, ConfigError> {
        let mut config = EngineConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(workspace_root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<EngineConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a workspace.
    pub fn load_local(&self, workspace_root: &Path) -> Result<Option<EngineConfig>, ConfigError> {
        let local_path = self.local_config_path(workspace_root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the global config file.
    pub fn save_global(&self, config: &EngineConfig) -> Result<(), ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        let global_path = global_dir.join(CONFIG_FILE_NAME);
        save_config_file(&global_path, config)
    }

    /// Save configuration to the local config file for a workspace.
    pub fn save_local(
        &self,
        workspace_root: &Path,
        config: &EngineConfig,
    ) -> Result<(), ConfigError> {
        let local_path = self.local_config_path(workspace_root);
        save_config_file(&local_path, config)
    }

    /// Initialize global configuration directory.
    ///
    /// Creates `~/.codegraph/config.toml` with default configuration.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        if !global_dir.exists() {
            std::fs::create_dir_all(global_dir)
                .map_err(|e| ConfigError::create_dir(global_dir, e))?;
        }

        let config_path = global_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            let default_config = EngineConfig::default();
            save_config_file(&config_path, &default_config)?;
        }

        Ok(config_path)
    }

    /// Initialize local configuration for a workspace.
    ///
    /// Creates `.codegraph/config.toml` with default configuration.
    pub fn init_local(&self, workspace_root: &Path) -> Result<PathBuf, ConfigError> {
        let local_dir = workspace_root.join(LOCAL_CONFIG_DIR);

        if !local_dir.exists() {
            std::fs::create_dir_all(&local_dir)
                .map_err(|e| ConfigError::create_dir(&local_dir, e))?;
        }

        let config_path = local_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            let default_config = EngineConfig::default();
            save_config_file(&config_path, &default_config)?;
        }

        Ok(config_path)
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &EngineConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// This performs a field-by-field merge, allowing partial configs.
fn merge_configs(base: EngineConfig, overlay: EngineConfig) -> EngineConfig {
    EngineConfig {
        storage: merge_storage(base.storage, overlay.storage),
        vector: merge_vector(base.vector, overlay.vector),
        parser: merge_parser(base.parser, overlay.parser),
        indexer: merge_indexer(base.indexer, overlay.indexer),
        coordinator: merge_coordinator(base.coordinator, overlay.coordinator),
        embedding: merge_embedding(base.embedding, overlay.embedding),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

/// Merge storage config, overlay values override base.
fn merge_storage(
    base: crate::StorageConfig,
    overlay: crate::StorageConfig,
) -> crate::StorageConfig {
    let default = crate::StorageConfig::default();
    crate::StorageConfig {
        data_dir: if overlay.data_dir != default.data_dir {
            overlay.data_dir
        } else {
            base.data_dir
        },
        db_file: if overlay.db_file != default.db_file {
            overlay.db_file
        } else {
            base.db_file
        },
        wal: overlay.wal,
        mmap_size_bytes: if overlay.mmap_size_bytes != default.mmap_size_bytes {
            overlay.mmap_size_bytes
        } else {
            base.mmap_size_bytes
        },
        cache_pages: if overlay.cache_pages != default.cache_pages {
            overlay.cache_pages
        } else {
            base.cache_pages
        },
        busy_timeout_ms: if overlay.busy_timeout_ms != default.busy_timeout_ms {
            overlay.busy_timeout_ms
        } else {
            base.busy_timeout_ms
        },
    }
}

/// Merge vector index config.
fn merge_vector(base: crate::VectorConfig, overlay: crate::VectorConfig) -> crate::VectorConfig {
    let default = crate::VectorConfig::default();
    crate::VectorConfig {
        dimension: if overlay.dimension != default.dimension {
            overlay.dimension
        } else {
            base.dimension
        },
        use_extension: overlay.use_extension,
        query_cache_size: if overlay.query_cache_size != default.query_cache_size {
            overlay.query_cache_size
        } else {
            base.query_cache_size
        },
    }
}

/// Merge parser config.
fn merge_parser(base: crate::ParserConfig, overlay: crate::ParserConfig) -> crate::ParserConfig {
    let default = crate::ParserConfig::default();
    crate::ParserConfig {
        max_cached_file_size_bytes: if overlay.max_cached_file_size_bytes
            != default.max_cached_file_size_bytes
        {
            overlay.max_cached_file_size_bytes
        } else {
            base.max_cached_file_size_bytes
        },
        max_recursion_depth: if overlay.max_recursion_depth != default.max_recursion_depth {
            overlay.max_recursion_depth
        } else {
            base.max_recursion_depth
        },
        file_timeout_ms: if overlay.file_timeout_ms != default.file_timeout_ms {
            overlay.file_timeout_ms
        } else {
            base.file_timeout_ms
        },
        parse_cache_size: if overlay.parse_cache_size != default.parse_cache_size {
            overlay.parse_cache_size
        } else {
            base.parse_cache_size
        },
        languages: {
            let mut langs = base.languages;
            langs.extend(overlay.languages);
            langs
        },
    }
}

/// Merge indexer config.
fn merge_indexer(
    base: crate::IndexerConfig,
    overlay: crate::IndexerConfig,
) -> crate::IndexerConfig {
    let default = crate::IndexerConfig::default();
    crate::IndexerConfig {
        batch_size: if overlay.batch_size != default.batch_size {
            overlay.batch_size
        } else {
            base.batch_size
        },
        min_batch_size: if overlay.min_batch_size != default.min_batch_size {
            overlay.min_batch_size
        } else {
            base.min_batch_size
        },
        max_batch_size: if overlay.max_batch_size != default.max_batch_size {
            overlay.max_batch_size
        } else {
            base.max_batch_size
        },
        target_batch_ms: if overlay.target_batch_ms != default.target_batch_ms {
            overlay.target_batch_ms
        } else {
            base.target_batch_ms
        },
        exclude_patterns: if overlay.exclude_patterns.is_empty() {
            base.exclude_patterns
        } else {
            let mut patterns = base.exclude_patterns;
            for pattern in overlay.exclude_patterns {
                if !patterns.contains(&pattern) {
                    patterns.push(pattern);
                }
            }
            patterns
        },
        large_codebase_file_threshold: if overlay.large_codebase_file_threshold
            != default.large_codebase_file_threshold
        {
            overlay.large_codebase_file_threshold
        } else {
            base.large_codebase_file_threshold
        },
    }
}

/// Merge agent coordinator config.
fn merge_coordinator(
    base: crate::CoordinatorConfig,
    overlay: crate::CoordinatorConfig,
) -> crate::CoordinatorConfig {
    let default = crate::CoordinatorConfig::default();
    crate::CoordinatorConfig {
        parser_workers: if overlay.parser_workers != default.parser_workers {
            overlay.parser_workers
        } else {
            base.parser_workers
        },
        indexer_workers: if overlay.indexer_workers != default.indexer_workers {
            overlay.indexer_workers
        } else {
            base.indexer_workers
        },
        query_workers: if overlay.query_workers != default.query_workers {
            overlay.query_workers
        } else {
            base.query_workers
        },
        semantic_workers: if overlay.semantic_workers != default.semantic_workers {
            overlay.semantic_workers
        } else {
            base.semantic_workers
        },
        queue_capacity: if overlay.queue_capacity != default.queue_capacity {
            overlay.queue_capacity
        } else {
            base.queue_capacity
        },
        default_deadline_ms: if overlay.default_deadline_ms != default.default_deadline_ms {
            overlay.default_deadline_ms
        } else {
            base.default_deadline_ms
        },
        indexing_deadline_ms: if overlay.indexing_deadline_ms != default.indexing_deadline_ms {
            overlay.indexing_deadline_ms
        } else {
            base.indexing_deadline_ms
        },
        stuck_task_threshold_ms: if overlay.stuck_task_threshold_ms
            != default.stuck_task_threshold_ms
        {
            overlay.stuck_task_threshold_ms
        } else {
            base.stuck_task_threshold_ms
        },
        resource_sample_interval_ms: if overlay.resource_sample_interval_ms
            != default.resource_sample_interval_ms
        {
            overlay.resource_sample_interval_ms
        } else {
            base.resource_sample_interval_ms
        },
        memory_high_watermark: if overlay.memory_high_watermark != default.memory_high_watermark {
            overlay.memory_high_watermark
        } else {
            base.memory_high_watermark
        },
        memory_low_watermark: if overlay.memory_low_watermark != default.memory_low_watermark {
            overlay.memory_low_watermark
        } else {
            base.memory_low_watermark
        },
    }
}

/// Merge embedding config.
fn merge_embedding(
    base: crate::EmbeddingConfig,
    overlay: crate::EmbeddingConfig,
) -> crate::EmbeddingConfig {
    crate::EmbeddingConfig {
        provider: if overlay.provider != crate::EmbeddingProviderType::Local {
            overlay.provider
        } else {
            base.provider
        },
        azure_ml: overlay.azure_ml.or(base.azure_ml),
        openai: overlay.openai.or(base.openai),
        breaker_failure_threshold: if overlay.breaker_failure_threshold
            != crate::DEFAULT_BREAKER_FAILURE_THRESHOLD
        {
            overlay.breaker_failure_threshold
        } else {
            base.breaker_failure_threshold
        },
        breaker_cooldown_secs: if overlay.breaker_cooldown_secs
            != crate::DEFAULT_BREAKER_COOLDOWN_SECS
        {
            overlay.breaker_cooldown_secs
        } else {
            base.breaker_cooldown_secs
        },
    }
}

/// Merge logging config.
fn merge_logging(base: crate::LoggingConfig, overlay: crate::LoggingConfig) -> crate::LoggingConfig {
    crate::LoggingConfig {
        level: if overlay.level != "info" {
            overlay.level
        } else {
            base.level
        },
        format: overlay.format,
        file: overlay.file.or(base.file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config(content: &str, dir: &Path, filename: &str) -> PathBuf {
        let config_dir = dir.join(".codegraph");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join(filename);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.storage.data_dir, PathBuf::from(".codegraph"));
        assert_eq!(config.storage.db_file, "graph.db");
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_test_config(
            r#"
            [storage]
            data_dir = ".custom-codegraph"

            [coordinator]
            query_workers = 20
            "#,
            temp.path(),
            "config.toml",
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.storage.data_dir, PathBuf::from(".custom-codegraph"));
        assert_eq!(config.coordinator.query_workers, 20);
    }

    #[test]
    fn test_global_overrides_default() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            r#"
            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            r#"
            [logging]
            level = "debug"

            [coordinator]
            query_workers = 15
            "#,
        )
        .unwrap();

        create_test_config(
            r#"
            [coordinator]
            query_workers = 25
            "#,
            temp.path(),
            "config.toml",
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.coordinator.query_workers, 25);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_all() {
        let temp = TempDir::new().unwrap();

        create_test_config(
            r#"
            [logging]
            level = "info"
            "#,
            temp.path(),
            "config.toml",
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let overrides = ConfigOverrides {
            log_level: Some("trace".to_string()),
            queue_capacity: Some(50),
            ..Default::default()
        };

        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.coordinator.queue_capacity, 50);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let mut config = EngineConfig::default();
        config.logging.level = "warn".to_string();
        config.coordinator.query_workers = 42;

        loader.save_local(temp.path(), &config).unwrap();

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let loaded = loader.load(temp.path(), None).unwrap();

        assert_eq!(loaded.logging.level, "warn");
        assert_eq!(loaded.coordinator.query_workers, 42);
    }

    #[test]
    fn test_init_local_creates_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config_path = loader.init_local(temp.path()).unwrap();

        assert!(config_path.exists());
        assert!(config_path.ends_with(".codegraph/config.toml"));

        let content = std::fs::read_to_string(&config_path).unwrap();
        let _: EngineConfig = toml::from_str(&content).unwrap();
    }

    #[test]
    fn test_exclude_patterns_merge() {
        let base = crate::IndexerConfig {
            exclude_patterns: vec!["**/node_modules/**".to_string()],
            ..Default::default()
        };

        let overlay = crate::IndexerConfig {
            exclude_patterns: vec!["**/custom/**".to_string()],
            ..Default::default()
        };

        let merged = merge_indexer(base, overlay);

        assert!(merged
            .exclude_patterns
            .contains(&"**/node_modules/**".to_string()));
        assert!(merged.exclude_patterns.contains(&"**/custom/**".to_string()));
    }

    #[test]
    fn test_language_config_merge() {
        let mut base_langs = std::collections::HashMap::new();
        base_langs.insert("rust".to_string(), crate::LanguageConfig { enabled: true });

        let mut overlay_langs = std::collections::HashMap::new();
        overlay_langs.insert("vba".to_string(), crate::LanguageConfig { enabled: false });

        let base = crate::ParserConfig {
            languages: base_langs,
            ..Default::default()
        };

        let overlay = crate::ParserConfig {
            languages: overlay_langs,
            ..Default::default()
        };

        let merged = merge_parser(base, overlay);

        assert!(merged.languages.contains_key("rust"));
        assert!(merged.languages.contains_key("vba"));
    }

    #[test]
    fn test_cache_clearing() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            r#"
            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let mut loader = ConfigLoader::with_global_dir(&global_dir);

        let _ = loader.load_global().unwrap();
        assert!(loader.global_config.is_some());

        loader.clear_cache();
        assert!(loader.global_config.is_none());
    }
}
