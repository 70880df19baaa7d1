use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::retry::RetryConfig;
use crate::types::{EmbedOptions, PoolingStrategy};

/// Backend used when no mode is configured: local inference when it is compiled
/// in, the deterministic stub otherwise.
pub const DEFAULT_MODE: &str = if cfg!(feature = "onnx") { "onnx" } else { "fast" };

/// Runtime configuration describing which embedding backend to build and how to
/// post-process its vectors.
///
/// # Example
/// ```
/// use semantic::SemanticConfig;
///
/// let cfg = SemanticConfig {
///     mode: "api".into(),
///     api_url: Some("https://router.huggingface.co/hf-inference/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction".into()),
///     api_auth_header: Some("Bearer hf_xxx".into()),
///     api_provider: Some("hf".into()),
///     ..Default::default()
/// };
/// assert!(cfg.normalize);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    /// Backend selector: `"onnx"` (local), `"api"` (remote HTTP), or `"fast"` (deterministic stub).
    pub mode: String,
    /// Friendly label for logs.
    pub model_name: String,
    /// Local path where the ONNX file should live (also the download target when
    /// [`model_url`](Self::model_url) is set).
    pub model_path: PathBuf,
    /// Optional HTTPS URL downloaded when [`model_path`](Self::model_path) is missing.
    pub model_url: Option<String>,
    /// Path to `tokenizer.json`. When absent and [`tokenizer_url`](Self::tokenizer_url) is set the
    /// file is placed next to the model.
    pub tokenizer_path: Option<PathBuf>,
    /// Optional HTTPS URL for fetching the tokenizer on demand.
    pub tokenizer_url: Option<String>,
    /// Inference endpoint when [`mode`](Self::mode) is `"api"`.
    pub api_url: Option<String>,
    /// Authorization header (e.g., `"Bearer hf_xxx"`).
    pub api_auth_header: Option<String>,
    /// Remote provider hint: `"hf"`, `"openai"`, or `"custom"` (default).
    pub api_provider: Option<String>,
    /// Per-request API timeout in seconds.
    pub api_timeout_secs: Option<u64>,
    /// Tokens kept per input; longer inputs are truncated.
    pub max_sequence_length: usize,
    /// How token states are reduced to one sentence vector.
    pub pooling: PoolingStrategy,
    /// Normalize the resulting vector to unit length.
    pub normalize: bool,
    /// Dimension of stub vectors in `"fast"` mode.
    pub stub_dim: usize,
    /// Retry policy for API calls. `None` uses [`RetryConfig::default`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_config: Option<RetryConfig>,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            mode: DEFAULT_MODE.into(),
            model_name: "all-MiniLM-L6-v2".into(),
            model_path: PathBuf::from("./models/all-MiniLM-L6-v2/onnx/model.onnx"),
            model_url: None,
            tokenizer_path: Some(PathBuf::from("./models/all-MiniLM-L6-v2/tokenizer.json")),
            tokenizer_url: None,
            api_url: None,
            api_auth_header: None,
            api_provider: None,
            api_timeout_secs: Some(30),
            max_sequence_length: 256,
            pooling: PoolingStrategy::Mean,
            normalize: true,
            stub_dim: 384,
            retry_config: None,
        }
    }
}

impl SemanticConfig {
    /// Deterministic stub configuration, handy for tests and offline runs.
    pub fn fast() -> Self {
        Self {
            mode: "fast".into(),
            model_name: "stub".into(),
            ..Self::default()
        }
    }

    /// Per-call options derived from [`pooling`](Self::pooling) and [`normalize`](Self::normalize).
    pub fn embed_options(&self) -> EmbedOptions {
        EmbedOptions {
            pooling: self.pooling,
            normalize: self.normalize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = SemanticConfig::default();
        assert_eq!(cfg.mode, DEFAULT_MODE);
        assert_eq!(cfg.model_name, "all-MiniLM-L6-v2");
        assert_eq!(
            cfg.model_path,
            PathBuf::from("./models/all-MiniLM-L6-v2/onnx/model.onnx")
        );
        assert_eq!(cfg.pooling, PoolingStrategy::Mean);
        assert!(cfg.normalize);
        assert_eq!(cfg.max_sequence_length, 256);
        assert_eq!(cfg.stub_dim, 384);
        assert_eq!(cfg.api_timeout_secs, Some(30));
    }

    #[test]
    fn config_partial_json_fills_defaults() {
        let cfg: SemanticConfig =
            serde_json::from_str(r#"{"mode":"api","api_url":"http://localhost:9000/embed"}"#)
                .unwrap();
        assert_eq!(cfg.mode, "api");
        assert_eq!(cfg.api_url.as_deref(), Some("http://localhost:9000/embed"));
        assert_eq!(cfg.model_name, "all-MiniLM-L6-v2");
        assert!(cfg.normalize);
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = SemanticConfig {
            mode: "api".into(),
            api_provider: Some("openai".into()),
            retry_config: Some(RetryConfig::default().with_max_retries(1)),
            ..SemanticConfig::default()
        };

        let serialized = serde_json::to_string(&cfg).unwrap();
        let deserialized: SemanticConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(cfg, deserialized);
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn default_mode_is_stub_without_local_inference() {
        assert_eq!(SemanticConfig::default().mode, "fast");
    }

    #[test]
    fn fast_preset_selects_stub() {
        let cfg = SemanticConfig::fast();
        assert_eq!(cfg.mode, "fast");
        assert_eq!(cfg.stub_dim, 384);
    }
}
