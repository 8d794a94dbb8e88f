//! Embedding generation for semantic code search.
//!
//! One fixed-dimension vector per entity, produced by whichever provider is
//! configured:
//!
//! ```text
//! EmbeddingProvider (trait)
//!     ├── LocalProvider     - Candle + Jina BERT (CPU/Metal/CUDA)
//!     ├── AzureMLProvider   - HTTP client for an Azure ML online endpoint
//!     └── OpenAIProvider    - HTTP client for a /v1/embeddings-compatible API
//! ```

pub mod azure_ml;
pub mod factory;
mod local;
pub mod openai;
mod provider;

pub use provider::{EmbeddingProvider, ProviderStatus};

pub use factory::create as create_provider;

pub use local::LocalProvider;

pub use azure_ml::AzureMLProvider;

pub use openai::OpenAIProvider;

pub use local::EMBEDDING_DIM;
