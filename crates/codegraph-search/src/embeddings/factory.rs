//! Constructs the configured [`EmbeddingProvider`] from [`EmbeddingConfig`].

use std::sync::Arc;

use codegraph_config::{EmbeddingConfig, EmbeddingProviderType};
use tracing::info;

use super::azure_ml::AzureMLProvider;
use super::local::LocalProvider;
use super::openai::OpenAIProvider;
use super::provider::EmbeddingProvider;
use crate::error::{Result, SearchError};

/// Build the provider selected by `config.provider`, validating its
/// reported dimension against `expected_dim` where it can be known upfront
/// (OpenAI-compatible dimensions are only known after the first response,
/// so validation there is skipped).
pub fn create(config: &EmbeddingConfig, expected_dim: usize) -> Result<Arc<dyn EmbeddingProvider>> {
    config.validate().map_err(|e| SearchError::InvalidConfig(e.to_string()))?;

    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingProviderType::Local => {
            info!("Using local embedding provider");
            Arc::new(LocalProvider::new()?)
        }
        EmbeddingProviderType::AzureMl => {
            info!("Using Azure ML embedding provider");
            let settings = config
                .azure_ml
                .as_ref()
                .ok_or_else(|| SearchError::InvalidConfig("embedding.azure_ml section is missing".to_string()))?;
            Arc::new(AzureMLProvider::new(settings)?)
        }
        EmbeddingProviderType::Openai => {
            info!("Using OpenAI-compatible embedding provider");
            let settings = config
                .openai
                .as_ref()
                .ok_or_else(|| SearchError::InvalidConfig("embedding.openai section is missing".to_string()))?;
            Arc::new(OpenAIProvider::new(settings)?)
        }
    };

    if !matches!(config.provider, EmbeddingProviderType::Openai) {
        validate_dimension(provider.as_ref(), expected_dim)?;
    }

    Ok(provider)
}

/// Check that a provider's declared dimension matches the graph's vector
/// index dimension; a mismatch would silently corrupt stored vectors.
pub fn validate_dimension(provider: &dyn EmbeddingProvider, expected_dim: usize) -> Result<()> {
    let actual = provider.embedding_dim();
    if actual != expected_dim {
        return Err(SearchError::DimensionMismatch { expected: expected_dim, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_config::{AzureMLSettings, OpenAISettings};

    #[test]
    fn create_local_provider() {
        let config = EmbeddingConfig { provider: EmbeddingProviderType::Local, ..Default::default() };
        let provider = create(&config, 768).unwrap();
        assert_eq!(provider.provider_type(), EmbeddingProviderType::Local);
    }

    #[test]
    fn create_local_provider_dimension_mismatch() {
        let config = EmbeddingConfig { provider: EmbeddingProviderType::Local, ..Default::default() };
        let err = create(&config, 1536).unwrap_err();
        assert!(matches!(err, SearchError::DimensionMismatch { .. }));
    }

    #[test]
    fn create_azure_ml_requires_section() {
        let config = EmbeddingConfig { provider: EmbeddingProviderType::AzureMl, azure_ml: None, ..Default::default() };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("azure_ml"));
    }

    #[test]
    fn create_azure_ml_provider() {
        unsafe {
            std::env::set_var("CODEGRAPH_TEST_FACTORY_AZURE_KEY", "dummy");
        }
        let config = EmbeddingConfig {
            provider: EmbeddingProviderType::AzureMl,
            azure_ml: Some(AzureMLSettings {
                endpoint: "https://example.invalid/score".to_string(),
                auth_key_env: Some("CODEGRAPH_TEST_FACTORY_AZURE_KEY".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let provider = create(&config, 768).unwrap();
        assert_eq!(provider.provider_type(), EmbeddingProviderType::AzureMl);
        unsafe {
            std::env::remove_var("CODEGRAPH_TEST_FACTORY_AZURE_KEY");
        }
    }

    #[test]
    fn create_openai_provider_skips_dimension_check() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderType::Openai,
            openai: Some(OpenAISettings { url: "https://api.openai.com/v1".to_string(), ..Default::default() }),
            ..Default::default()
        };
        let provider = create(&config, 1).unwrap();
        assert_eq!(provider.provider_type(), EmbeddingProviderType::Openai);
    }
}
