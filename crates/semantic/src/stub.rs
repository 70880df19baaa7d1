use async_trait::async_trait;
use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::provider::EmbeddingProvider;
use crate::types::{EmbedOptions, EmbeddingVector};
use crate::SemanticError;

/// Deterministic stub used in `"fast"` mode. Generates sinusoid values derived from a
/// hash of the input text so identical text always yields the identical vector.
/// The vectors carry no meaning; use it for plumbing tests and offline runs.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    model_name: String,
    dim: usize,
}

impl StubEmbedder {
    pub fn new(model_name: impl Into<String>, dim: usize) -> Self {
        Self {
            model_name: model_name.into(),
            dim: dim.max(1),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn make_vector(&self, text: &str, normalize: bool) -> EmbeddingVector {
        let mut v = vec![0f32; self.dim];
        let h = hash64(text.as_bytes());
        for (idx, value) in v.iter_mut().enumerate() {
            *value = ((h >> (idx % 32)) as f32 * 0.0001).sin();
        }
        if normalize {
            l2_normalize_in_place(&mut v);
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(
        &self,
        text: &str,
        options: EmbedOptions,
    ) -> Result<EmbeddingVector, SemanticError> {
        Ok(self.make_vector(text, options.normalize))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
