use std::sync::Arc;

use semantic::{ProviderLoader, SemanticConfig};
use serde::Serialize;
use tracing::info;

use crate::catalog::SpecialtyCatalog;
use crate::error::{PredictError, Stage};
use crate::lifecycle::{with_deadline, LifecycleConfig, ModelLifecycleManager};
use crate::ranker::rank;

/// Outcome of [`SpecialtyPredictor::predict_detailed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub specialty: String,
    /// Cosine score of the winner; `None` when the fallback was used.
    pub score: Option<f32>,
    pub fallback: bool,
}

/// Maps a free-text problem description to the closest catalog specialty.
#[derive(Clone)]
pub struct SpecialtyPredictor {
    lifecycle: ModelLifecycleManager,
}

impl SpecialtyPredictor {
    pub fn new(lifecycle: ModelLifecycleManager) -> Self {
        Self { lifecycle }
    }

    pub fn with_loader(
        loader: Arc<dyn ProviderLoader>,
        catalog: SpecialtyCatalog,
        config: LifecycleConfig,
    ) -> Self {
        Self::new(ModelLifecycleManager::new(loader, catalog, config))
    }

    pub fn from_semantic_config(
        semantic: SemanticConfig,
        catalog: SpecialtyCatalog,
        config: LifecycleConfig,
    ) -> Self {
        Self::new(ModelLifecycleManager::from_semantic_config(
            semantic, catalog, config,
        ))
    }

    pub fn lifecycle(&self) -> &ModelLifecycleManager {
        &self.lifecycle
    }

    /// Loads the model and catalog vectors ahead of the first request.
    pub async fn warmup(&self) -> Result<(), PredictError> {
        self.lifecycle.ensure_ready().await?;
        Ok(())
    }

    /// Name of the best-matching specialty.
    pub async fn predict(&self, problem: &str) -> Result<String, PredictError> {
        Ok(self.predict_detailed(problem).await?.specialty)
    }

    pub async fn predict_detailed(&self, problem: &str) -> Result<Prediction, PredictError> {
        let model = self.lifecycle.ensure_ready().await?;
        let config = self.lifecycle.config();

        let query = with_deadline(
            config.embed_timeout,
            model.provider().embed(problem, config.embed_options),
        )
        .await
        .ok_or(PredictError::Timeout {
            stage: Stage::Embedding,
            after: config.embed_timeout,
        })??;

        if let Some(expected) = model.index().dimension() {
            if query.len() != expected {
                return Err(PredictError::DimensionMismatch {
                    expected,
                    got: query.len(),
                });
            }
        }

        let outcome = rank(&query, model.index());
        info!(
            problem,
            specialty = %outcome.specialty,
            score = ?outcome.score,
            "predicted specialty"
        );

        Ok(Prediction {
            fallback: outcome.is_fallback(),
            specialty: outcome.specialty,
            score: outcome.score,
        })
    }
}
