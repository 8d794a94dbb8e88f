//! Azure ML Online Endpoint embedding provider.
//!
//! Calls a deployed embedding model behind an Azure ML managed online
//! endpoint. The endpoint is expected to accept `{"inputs": [...]}` and
//! return `{"embeddings": [[...]], "dimension": N}`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use codegraph_config::{AzureMLSettings, EmbeddingProviderType};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::local::EMBEDDING_DIM;
use super::provider::{EmbeddingProvider, ProviderStatus};
use crate::error::{Result, SearchError};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    dimension: Option<usize>,
}

pub struct AzureMLProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    max_retries: u32,
}

impl AzureMLProvider {
    pub fn new(settings: &AzureMLSettings) -> Result<Self> {
        if settings.endpoint.is_empty() {
            return Err(SearchError::InvalidConfig("Azure ML endpoint is not configured".to_string()));
        }
        let api_key = settings
            .auth_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .ok_or_else(|| SearchError::InvalidConfig("Azure ML API key environment variable is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(SearchError::Http)?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key,
            max_retries: settings.max_retries,
        })
    }

    pub fn from_env() -> Result<Self> {
        let settings = AzureMLSettings {
            endpoint: std::env::var("CODEGRAPH_AZURE_ML_ENDPOINT").unwrap_or_default(),
            auth_key_env: Some("CODEGRAPH_AZURE_ML_API_KEY".to_string()),
            ..Default::default()
        };
        Self::new(&settings)
    }

    async fn post_with_retries(&self, body: &EmbeddingRequest<'_>) -> Result<EmbeddingResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status() == reqwest::StatusCode::UNAUTHORIZED => {
                    return Err(SearchError::AzureMLAuth("invalid or expired API key".to_string()));
                }
                Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok());
                    if attempt > self.max_retries {
                        return Err(SearchError::AzureMLRateLimit { retry_after });
                    }
                    warn!("Azure ML rate limited, retrying (attempt {})", attempt);
                    tokio::time::sleep(Duration::from_secs(retry_after.unwrap_or(2))).await;
                    continue;
                }
                Ok(resp) if resp.status().is_success() => {
                    return resp.json::<EmbeddingResponse>().await.map_err(SearchError::Http);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    if attempt > self.max_retries {
                        return Err(SearchError::Embedding(format!("Azure ML returned {}: {}", status, text)));
                    }
                    warn!("Azure ML request failed ({}), retrying (attempt {})", status, attempt);
                    tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
                }
                Err(e) if e.is_timeout() => {
                    if attempt > self.max_retries {
                        return Err(SearchError::AzureMLTimeout);
                    }
                    warn!("Azure ML request timed out, retrying (attempt {})", attempt);
                }
                Err(e) => return Err(SearchError::Http(e)),
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for AzureMLProvider {
    async fn encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        debug!("Encoding {} texts via Azure ML endpoint", texts.len());
        let request = EmbeddingRequest { inputs: &texts };
        let response = self.post_with_retries(&request).await?;

        if let Some(dim) = response.dimension {
            if dim != self.embedding_dim() {
                return Err(SearchError::DimensionMismatch {
                    expected: self.embedding_dim(),
                    actual: dim,
                });
            }
        }
        Ok(response.embeddings)
    }

    async fn check_status(&self) -> Result<ProviderStatus> {
        let start = Instant::now();
        match self.encode(vec!["status check".to_string()]).await {
            Ok(_) => Ok(ProviderStatus::healthy(EmbeddingProviderType::AzureMl, "Remote")
                .with_latency(start.elapsed().as_millis() as u64)),
            Err(e) => Ok(ProviderStatus::unavailable(EmbeddingProviderType::AzureMl, e.to_string())),
        }
    }

    async fn warmup(&self) -> Result<()> {
        self.encode(vec!["warmup".to_string()]).await?;
        Ok(())
    }

    fn embedding_dim(&self) -> usize {
        EMBEDDING_DIM
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::AzureMl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_empty_endpoint() {
        let settings = AzureMLSettings::default();
        let err = AzureMLProvider::new(&settings).unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfig(_)));
    }

    #[test]
    fn new_rejects_missing_api_key() {
        let settings = AzureMLSettings {
            endpoint: "https://example.invalid/score".to_string(),
            auth_key_env: Some("CODEGRAPH_TEST_UNSET_AZURE_KEY_XYZ".to_string()),
            ..Default::default()
        };
        let err = AzureMLProvider::new(&settings).unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfig(_)));
    }

    #[test]
    fn provider_type_is_azure_ml() {
        unsafe {
            std::env::set_var("CODEGRAPH_TEST_AZURE_KEY", "dummy-key");
        }
        let settings = AzureMLSettings {
            endpoint: "https://example.invalid/score".to_string(),
            auth_key_env: Some("CODEGRAPH_TEST_AZURE_KEY".to_string()),
            ..Default::default()
        };
        let provider = AzureMLProvider::new(&settings).unwrap();
        assert_eq!(provider.provider_type(), EmbeddingProviderType::AzureMl);
        assert_eq!(provider.embedding_dim(), EMBEDDING_DIM);
        unsafe {
            std::env::remove_var("CODEGRAPH_TEST_AZURE_KEY");
        }
    }
}
