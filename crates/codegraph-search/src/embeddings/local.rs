//! Local embedding provider using Candle and a Jina BERT model.
//!
//! GPU acceleration via compile-time features:
//! - `--features metal` for macOS Metal/MPS
//! - `--features cuda` for NVIDIA CUDA

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::jina_bert::{BertModel as JinaBertModel, Config as JinaConfig};
use codegraph_config::EmbeddingProviderType;
use hf_hub::{api::sync::Api, Repo, RepoType};
use once_cell::sync::OnceCell;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer};
use tracing::{debug, info};

use super::provider::{EmbeddingProvider, ProviderStatus};
use crate::error::{Result, SearchError};

pub const EMBEDDING_DIM: usize = 768;

const DEFAULT_BATCH_SIZE: usize = 32;
const DTYPE: DType = DType::F32;
const MODEL_ID: &str = "jinaai/jina-embeddings-v2-base-en";

/// Local embedding provider using Candle for inference.
///
/// Uses `Arc<LocalProviderInner>` for interior clonability, required for
/// `spawn_blocking` to move the provider into the blocking task. Thread-safe:
/// the model loads lazily once via `OnceCell`.
#[derive(Clone)]
pub struct LocalProvider {
    inner: Arc<LocalProviderInner>,
}

struct LocalProviderInner {
    model: OnceCell<LoadedModel>,
    device: Device,
    #[allow(dead_code)]
    batch_size: usize,
}

struct LoadedModel {
    model: JinaBertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl LocalProvider {
    /// Device is selected automatically: Metal > CUDA > CPU.
    pub fn new() -> Result<Self> {
        let device = select_device()?;
        Ok(Self {
            inner: Arc::new(LocalProviderInner {
                model: OnceCell::new(),
                device,
                batch_size: DEFAULT_BATCH_SIZE,
            }),
        })
    }

    pub fn with_device(device: Device) -> Self {
        Self {
            inner: Arc::new(LocalProviderInner {
                model: OnceCell::new(),
                device,
                batch_size: DEFAULT_BATCH_SIZE,
            }),
        }
    }

    pub fn device(&self) -> &Device {
        &self.inner.device
    }

    fn device_name(&self) -> String {
        match &self.inner.device {
            Device::Cpu => "CPU".to_string(),
            #[cfg(feature = "metal")]
            Device::Metal(_) => "Metal".to_string(),
            #[cfg(feature = "cuda")]
            Device::Cuda(_) => "CUDA".to_string(),
            #[allow(unreachable_patterns)]
            _ => "Unknown".to_string(),
        }
    }

    fn ensure_model(&self) -> Result<&LoadedModel> {
        self.inner.model.get_or_try_init(|| load_model(&self.inner.device))
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.model.get().is_some()
    }

    fn encode_sync(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
        debug!("Encoding {} texts with local model", texts.len());
        let loaded = self.ensure_model()?;
        encode_with_model(&loaded.model, &loaded.tokenizer, &loaded.device, &texts)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    async fn encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let provider = self.clone();
        tokio::task::spawn_blocking(move || provider.encode_sync(&texts))
            .await
            .map_err(|e| SearchError::Embedding(format!("blocking task panicked: {}", e)))?
    }

    async fn check_status(&self) -> Result<ProviderStatus> {
        let loaded = self.is_loaded();
        let device = self.device_name();
        let available = loaded || check_model_cached(MODEL_ID).is_ok();
        let error = if available {
            None
        } else {
            Some("model not available - download required".to_string())
        };
        Ok(ProviderStatus {
            available,
            provider_type: EmbeddingProviderType::Local,
            device,
            latency_ms: None,
            error,
        })
    }

    async fn warmup(&self) -> Result<()> {
        let provider = self.clone();
        let start = Instant::now();
        tokio::task::spawn_blocking(move || {
            provider.ensure_model()?;
            Ok::<_, SearchError>(())
        })
        .await
        .map_err(|e| SearchError::Embedding(format!("warmup task panicked: {}", e)))??;
        info!("LocalProvider warmup complete in {:?}", start.elapsed());
        Ok(())
    }

    fn embedding_dim(&self) -> usize {
        EMBEDDING_DIM
    }

    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::Local
    }
}

fn select_device() -> Result<Device> {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal/MPS GPU acceleration");
                return Ok(device);
            }
            Err(e) => debug!("Metal not available: {}", e),
        }
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("Using CUDA GPU acceleration");
                return Ok(device);
            }
            Err(e) => debug!("CUDA not available: {}", e),
        }
    }

    info!("Using CPU (no GPU acceleration available)");
    Ok(Device::Cpu)
}

fn check_model_cached(model_id: &str) -> std::result::Result<bool, String> {
    let api = Api::new().map_err(|e| format!("HuggingFace API unavailable: {}", e))?;
    let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, "main".to_string());
    match api.repo(repo).info() {
        Ok(_) => Ok(true),
        Err(e) => Err(format!("model not available: {}", e)),
    }
}

fn download_model_files(model_id: &str) -> Result<(PathBuf, PathBuf, PathBuf)> {
    let api = Api::new().map_err(|e| SearchError::Embedding(format!("failed to create HF API: {}", e)))?;
    let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, "main".to_string());
    let api_repo = api.repo(repo);

    let config = api_repo
        .get("config.json")
        .map_err(|e| SearchError::Embedding(format!("failed to download config.json: {}", e)))?;
    let tokenizer = api_repo
        .get("tokenizer.json")
        .map_err(|e| SearchError::Embedding(format!("failed to download tokenizer.json: {}", e)))?;
    let weights = api_repo
        .get("model.safetensors")
        .map_err(|e| SearchError::Embedding(format!("failed to download model.safetensors: {}", e)))?;

    Ok((config, tokenizer, weights))
}

fn load_model(device: &Device) -> Result<LoadedModel> {
    info!("Loading local embedding model ({})...", MODEL_ID);

    let (config_path, tokenizer_path, weights_path) = download_model_files(MODEL_ID)?;

    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| SearchError::Embedding(format!("failed to read config: {}", e)))?;
    let config: JinaConfig = serde_json::from_str(&config_str)
        .map_err(|e| SearchError::Embedding(format!("failed to parse config: {}", e)))?;

    let tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| SearchError::Embedding(format!("failed to load tokenizer: {}", e)))?;

    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, device)
            .map_err(|e| SearchError::Embedding(format!("failed to load weights: {}", e)))?
    };

    let model = JinaBertModel::new(vb, &config)
        .map_err(|e| SearchError::Embedding(format!("failed to create model: {}", e)))?;

    info!("Local embedding model loaded (dim={})", EMBEDDING_DIM);

    Ok(LoadedModel {
        model,
        tokenizer,
        device: device.clone(),
    })
}

fn normalize_l2(v: &Tensor) -> Result<Tensor> {
    v.broadcast_div(&v.sqr()?.sum_keepdim(1)?.sqrt()?)
        .map_err(|e| SearchError::Embedding(format!("L2 normalization failed: {}", e)))
}

fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let attention_mask_expanded = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
    let sum_mask = attention_mask_expanded.sum(1)?;
    let masked_embeddings = embeddings.broadcast_mul(&attention_mask_expanded)?;
    let summed = masked_embeddings.sum(1)?;
    summed
        .broadcast_div(&sum_mask)
        .map_err(|e| SearchError::Embedding(format!("mean pooling failed: {}", e)))
}

fn encode_with_model(model: &JinaBertModel, tokenizer: &Tokenizer, device: &Device, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
    let mut tokenizer = tokenizer.clone();
    let padding = PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        ..Default::default()
    };
    tokenizer.with_padding(Some(padding));

    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| SearchError::Embedding(format!("tokenization failed: {}", e)))?;

    let token_ids: Vec<Tensor> = encodings
        .iter()
        .map(|enc| Tensor::new(enc.get_ids().to_vec().as_slice(), device))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| SearchError::Embedding(format!("failed to create token tensor: {}", e)))?;

    let attention_masks: Vec<Tensor> = encodings
        .iter()
        .map(|enc| Tensor::new(enc.get_attention_mask().to_vec().as_slice(), device))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| SearchError::Embedding(format!("failed to create attention mask: {}", e)))?;

    let token_ids = Tensor::stack(&token_ids, 0).map_err(|e| SearchError::Embedding(format!("failed to stack tokens: {}", e)))?;
    let attention_mask =
        Tensor::stack(&attention_masks, 0).map_err(|e| SearchError::Embedding(format!("failed to stack masks: {}", e)))?;

    let embeddings = model
        .forward(&token_ids)
        .map_err(|e| SearchError::Embedding(format!("forward pass failed: {}", e)))?;

    let pooled = mean_pool(&embeddings, &attention_mask)?;
    let normalized = normalize_l2(&pooled)?;

    (0..normalized.dim(0)?)
        .map(|i| normalized.get(i)?.to_vec1::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| SearchError::Embedding(format!("failed to convert embeddings: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_provider_creation() {
        assert!(LocalProvider::new().is_ok());
    }

    #[test]
    fn provider_type_is_local() {
        let provider = LocalProvider::new().unwrap();
        assert_eq!(provider.provider_type(), EmbeddingProviderType::Local);
    }

    #[test]
    fn embedding_dim_is_768() {
        let provider = LocalProvider::new().unwrap();
        assert_eq!(provider.embedding_dim(), 768);
    }

    #[test]
    fn empty_input_returns_empty() {
        let provider = LocalProvider::new().unwrap();
        let result = provider.encode_sync(&[]);
        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn check_status_reports_provider_type() {
        let provider = LocalProvider::new().unwrap();
        let status = provider.check_status().await.unwrap();
        assert_eq!(status.provider_type, EmbeddingProviderType::Local);
    }

    #[tokio::test]
    #[ignore] // requires model download
    async fn encoding_produces_fixed_dimension_vectors() {
        let provider = LocalProvider::new().unwrap();
        let embeddings = provider.encode(vec!["hello world".to_string()]).await.unwrap();
        assert_eq!(embeddings[0].len(), EMBEDDING_DIM);
    }
}
