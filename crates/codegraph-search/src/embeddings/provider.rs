//! Embedding provider trait and status types.
//!
//! Generalizes the teacher's dual semantic/code embedding split into a
//! single fixed-dimension `encode` call: the engine embeds one composed
//! semantic text per entity, not two collections per entity.

use async_trait::async_trait;
use codegraph_config::EmbeddingProviderType;

use crate::error::Result;

/// Health/capability snapshot for an embedding provider.
#[derive(Debug, Clone)]
pub struct ProviderStatus {
    pub available: bool,
    pub provider_type: EmbeddingProviderType,
    /// Device/endpoint in use ("CPU", "Metal", "CUDA", "Remote")
    pub device: String,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl ProviderStatus {
    pub fn healthy(provider_type: EmbeddingProviderType, device: impl Into<String>) -> Self {
        Self {
            available: true,
            provider_type,
            device: device.into(),
            latency_ms: None,
            error: None,
        }
    }

    pub fn unavailable(provider_type: EmbeddingProviderType, error: impl Into<String>) -> Self {
        Self {
            available: false,
            provider_type,
            device: "N/A".into(),
            latency_ms: None,
            error: Some(error.into()),
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}

/// Core abstraction for generating embeddings from text. Implementations
/// may use local inference (Candle) or remote APIs (Azure ML, an
/// OpenAI-compatible endpoint). All methods are async so a local provider
/// can run inference via `spawn_blocking` and a remote one can await HTTP.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts. Returns one vector per input, each with
    /// exactly `embedding_dim()` components.
    async fn encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Check provider connectivity and status.
    async fn check_status(&self) -> Result<ProviderStatus>;

    /// Warm up the provider (preload models / probe a remote endpoint).
    async fn warmup(&self) -> Result<()>;

    fn embedding_dim(&self) -> usize;

    fn provider_type(&self) -> EmbeddingProviderType;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_healthy() {
        let status = ProviderStatus::healthy(EmbeddingProviderType::Local, "CPU");
        assert!(status.available);
        assert_eq!(status.device, "CPU");
        assert!(status.error.is_none());
    }

    #[test]
    fn provider_status_unavailable() {
        let status = ProviderStatus::unavailable(EmbeddingProviderType::AzureMl, "timed out");
        assert!(!status.available);
        assert_eq!(status.error, Some("timed out".to_string()));
    }

    #[test]
    fn provider_status_with_latency() {
        let status = ProviderStatus::healthy(EmbeddingProviderType::Openai, "Remote").with_latency(150);
        assert_eq!(status.latency_ms, Some(150));
    }
}
