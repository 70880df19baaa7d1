//! Provider seam: the opaque text → vector capability and the (possibly slow)
//! step that constructs it.

use async_trait::async_trait;
use std::sync::Arc;

use crate::api::ApiEmbedder;
use crate::stub::StubEmbedder;
use crate::types::{EmbedOptions, EmbeddingVector};
use crate::{SemanticConfig, SemanticError};

/// Turns text into a fixed-dimension vector.
///
/// Implementations must return vectors of one consistent dimension across calls.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(
        &self,
        text: &str,
        options: EmbedOptions,
    ) -> Result<EmbeddingVector, SemanticError>;

    /// Label used in logs.
    fn model_name(&self) -> &str;
}

/// Builds an [`EmbeddingProvider`]. Called once per successful model load.
#[async_trait]
pub trait ProviderLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>, SemanticError>;
}

/// [`ProviderLoader`] that selects a backend from [`SemanticConfig::mode`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    cfg: SemanticConfig,
}

impl ConfigLoader {
    pub fn new(cfg: SemanticConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &SemanticConfig {
        &self.cfg
    }
}

#[async_trait]
impl ProviderLoader for ConfigLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>, SemanticError> {
        load_provider(&self.cfg).await
    }
}

/// Constructs the provider named by `cfg.mode`.
pub async fn load_provider(
    cfg: &SemanticConfig,
) -> Result<Arc<dyn EmbeddingProvider>, SemanticError> {
    tracing::info!(mode = %cfg.mode, model = %cfg.model_name, "loading embedding provider");
    match cfg.mode.as_str() {
        "fast" => {
            tracing::warn!(
                dim = cfg.stub_dim,
                "using deterministic stub embeddings; predictions carry no clinical meaning"
            );
            Ok(Arc::new(StubEmbedder::new(&cfg.model_name, cfg.stub_dim)))
        }
        "api" => Ok(Arc::new(ApiEmbedder::new(cfg.clone())?)),
        "onnx" => load_onnx(cfg).await,
        other => Err(SemanticError::InvalidConfig(format!(
            "unknown embedding mode '{other}'"
        ))),
    }
}

#[cfg(feature = "onnx")]
async fn load_onnx(cfg: &SemanticConfig) -> Result<Arc<dyn EmbeddingProvider>, SemanticError> {
    let embedder = crate::onnx::OnnxEmbedder::load(cfg).await?;
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "onnx"))]
async fn load_onnx(_cfg: &SemanticConfig) -> Result<Arc<dyn EmbeddingProvider>, SemanticError> {
    Err(SemanticError::InvalidConfig(
        "mode 'onnx' requires the `onnx` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fast_mode_builds_stub() {
        let provider = load_provider(&SemanticConfig::fast()).await.unwrap();
        assert_eq!(provider.model_name(), "stub");
        let v = provider
            .embed("chest pain", EmbedOptions::default())
            .await
            .unwrap();
        assert_eq!(v.len(), 384);
    }

    #[tokio::test]
    async fn unknown_mode_is_invalid_config() {
        let cfg = SemanticConfig {
            mode: "gpu".into(),
            ..SemanticConfig::default()
        };
        let err = load_provider(&cfg).await.err().expect("must fail");
        assert!(matches!(err, SemanticError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn api_mode_requires_url() {
        let cfg = SemanticConfig {
            mode: "api".into(),
            api_url: None,
            ..SemanticConfig::default()
        };
        let err = load_provider(&cfg).await.err().expect("must fail");
        assert!(matches!(err, SemanticError::InvalidConfig(_)));
    }

    #[cfg(not(feature = "onnx"))]
    #[tokio::test]
    async fn onnx_mode_without_feature_fails_cleanly() {
        let cfg = SemanticConfig {
            mode: "onnx".into(),
            ..SemanticConfig::default()
        };
        let err = load_provider(&cfg)
            .await
            .err()
            .expect("must fail");
        assert!(err.to_string().contains("onnx"));
    }

    #[tokio::test]
    async fn default_config_loads_a_provider() {
        let provider = load_provider(&SemanticConfig::default()).await;
        if cfg!(feature = "onnx") {
            // local inference needs model files that tests do not ship
            return;
        }
        let v = provider
            .unwrap()
            .embed("sharp chest pain", EmbedOptions::default())
            .await
            .unwrap();
        assert_eq!(v.len(), 384);
    }

    #[tokio::test]
    async fn config_loader_delegates_to_mode() {
        let loader = ConfigLoader::new(SemanticConfig::fast());
        assert_eq!(loader.config().mode, "fast");
        let provider = loader.load().await.unwrap();
        assert_eq!(provider.model_name(), "stub");
    }
}
