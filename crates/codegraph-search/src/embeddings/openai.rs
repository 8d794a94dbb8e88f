//! OpenAI-compatible embedding provider.
//!
//! Works against OpenAI, Azure OpenAI, Ollama, and other servers that speak
//! the `/v1/embeddings` wire format.
//!
//! - POST `{base_url}/v1/embeddings`
//! - Request: `{"model": "...", "input": ["text1", "text2", ...]}`
//! - Response: `{"data": [{"embedding": [...], "index": 0}, ...], ...}`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use codegraph_config::{EmbeddingProviderType, OpenAISettings};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::provider::{EmbeddingProvider, ProviderStatus};
use crate::error::{Result, SearchError};

const RETRY_BASE_DELAY_MS: u64 = 500;

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[allow(dead_code)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
    #[allow(dead_code)]
    model: Option<String>,
}

/// OpenAI-compatible embedding provider. The embedding dimension is
/// unknown until the first successful response and cached from then on.
pub struct OpenAIProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
    azure_mode: bool,
    dimension: AtomicUsize,
}

impl Clone for OpenAIProvider {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            max_retries: self.max_retries,
            azure_mode: self.azure_mode,
            dimension: AtomicUsize::new(self.dimension.load(Ordering::Relaxed)),
        }
    }
}

impl OpenAIProvider {
    pub fn new(settings: &OpenAISettings) -> Result<Self> {
        if settings.url.is_empty() {
            return Err(SearchError::InvalidConfig("OpenAI-compatible base URL is not configured".to_string()));
        }
        let api_key = settings.api_key_env.as_deref().and_then(|var| std::env::var(var).ok());
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(SearchError::Http)?;

        Ok(Self {
            client,
            base_url: settings.url.clone(),
            api_key,
            model: settings.semantic_model.clone(),
            max_retries: settings.max_retries,
            azure_mode: false,
            dimension: AtomicUsize::new(0),
        })
    }

    pub fn from_env() -> Result<Self> {
        let settings = OpenAISettings {
            url: std::env::var("CODEGRAPH_OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            semantic_model: std::env::var("CODEGRAPH_OPENAI_MODEL").unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            ..Default::default()
        };
        Self::new(&settings)
    }

    fn embeddings_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/embeddings", base)
        } else {
            format!("{}/v1/embeddings", base)
        }
    }

    fn default_dimension(&self) -> usize {
        match self.model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            "nomic-embed-text" => 768,
            _ => 768,
        }
    }

    async fn send_request(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let url = self.embeddings_url();
        let body = EmbeddingsRequest {
            model: self.model.clone(),
            input: texts,
        };

        let mut request = self.client.post(&url).header("Content-Type", "application/json").json(&body);
        if let Some(ref key) = self.api_key {
            request = if self.azure_mode {
                request.header("api-key", key)
            } else {
                request.header("Authorization", format!("Bearer {}", key))
            };
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::ProviderUnavailable("request timed out".to_string())
            } else {
                SearchError::ProviderUnavailable(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let parsed: EmbeddingsResponse = response
                    .json()
                    .await
                    .map_err(|e| SearchError::ProviderUnavailable(format!("invalid response: {}", e)))?;
                let embeddings: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();

                if let Some(first) = embeddings.first() {
                    let dim = first.len();
                    let cached = self.dimension.load(Ordering::Relaxed);
                    if cached == 0 {
                        self.dimension.store(dim, Ordering::Relaxed);
                    } else if cached != dim {
                        return Err(SearchError::DimensionMismatch { expected: cached, actual: dim });
                    }
                }
                Ok(embeddings)
            }
            StatusCode::UNAUTHORIZED => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::OpenAIAuth(body))
            }
            StatusCode::NOT_FOUND => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::OpenAIInvalidModel(body))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());
                Err(SearchError::OpenAIRateLimit { retry_after })
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::ProviderUnavailable(format!("request failed with status {}: {}", status, body)))
            }
        }
    }

    async fn request_with_retry(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut retry_delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match self.send_request(texts.clone()).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) if matches!(e, SearchError::OpenAIAuth(_) | SearchError::OpenAIInvalidModel(_)) => return Err(e),
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(retry_delay).await;
                        retry_delay *= 2;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SearchError::ProviderUnavailable("request failed after retries".to_string())))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    async fn encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.request_with_retry(texts).await
    }

    async fn check_status(&self) -> Result<ProviderStatus> {
        let start = Instant::now();
        match self.encode(vec!["status check".to_string()]).await {
            Ok(_) => Ok(ProviderStatus::healthy(EmbeddingProviderType::Openai, "Remote")
                .with_latency(start.elapsed().as_millis() as u64)),
            Err(e) => Ok(ProviderStatus::unavailable(EmbeddingProviderType::Openai, e.to_string())),
        }
    }

    async fn warmup(&self) -> Result<()> {
        let status = self.check_status().await?;
        if !status.available {
            return Err(SearchError::ProviderUnavailable(status.error.unwrap_or_else(|| "provider not ready".to_string())));
        }
        Ok(())
    }

    fn embedding_dim(&self) -> usize {
        let dim = self.dimension.load(Ordering::Relaxed);
        if dim > 0 {
            dim
        } else {
            self.default_dimension()
        }
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::Openai
    }
}

impl std::fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("azure_mode", &self.azure_mode)
            .finish()
    }
}
