use serde::{Deserialize, Serialize};

/// Dense sentence embedding. Unit length when produced with `normalize: true`.
pub type EmbeddingVector = Vec<f32>;

/// Reduction applied to token-level model output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PoolingStrategy {
    /// Attention-mask weighted mean over tokens.
    #[default]
    Mean,
    /// First token (`[CLS]`) state.
    Cls,
}

/// Per-call options mirroring the provider contract: `{pooling, normalize}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmbedOptions {
    pub pooling: PoolingStrategy,
    pub normalize: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            pooling: PoolingStrategy::Mean,
            normalize: true,
        }
    }
}
