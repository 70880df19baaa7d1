//! Text embeddings for specialty triage.
//!
//! Everything downstream treats the model as an opaque capability: text in,
//! fixed-length unit vector out. This crate provides that capability behind the
//! [`EmbeddingProvider`] trait and the [`ProviderLoader`] that builds it.
//!
//! Backends, picked by [`SemanticConfig::mode`]:
//!
//! - **`"onnx"`** - local inference with a sentence-transformers export such as
//!   `all-MiniLM-L6-v2`. Needs the `onnx` feature plus model and tokenizer files,
//!   which are downloaded when URLs are configured.
//! - **`"api"`** - a remote feature-extraction endpoint (Hugging Face router,
//!   OpenAI-compatible, or a bare `{"text": ...}` service), retried with backoff.
//! - **`"fast"`** - a deterministic hash-derived stub for tests and offline runs.
//!
//! Without the `onnx` feature the default mode is `"fast"` ([`DEFAULT_MODE`]).
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{load_provider, EmbedOptions, SemanticConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = load_provider(&SemanticConfig::fast()).await.unwrap();
//!     let v = provider.embed("sharp chest pain", EmbedOptions::default()).await.unwrap();
//!     assert_eq!(v.len(), 384);
//! }
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod retry;
pub mod types;

#[doc(hidden)]
pub mod serde_millis;

mod api;
#[cfg(feature = "onnx")]
mod assets;
mod normalize;
#[cfg(feature = "onnx")]
mod onnx;
mod stub;

pub use crate::api::ApiEmbedder;
pub use crate::config::{SemanticConfig, DEFAULT_MODE};
pub use crate::error::SemanticError;
pub use crate::normalize::{l2_normalize_in_place, mean_pool};
#[cfg(feature = "onnx")]
pub use crate::onnx::OnnxEmbedder;
pub use crate::provider::{load_provider, ConfigLoader, EmbeddingProvider, ProviderLoader};
pub use crate::retry::RetryConfig;
pub use crate::stub::StubEmbedder;
pub use crate::types::{EmbedOptions, EmbeddingVector, PoolingStrategy};
