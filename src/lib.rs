//! Workspace umbrella crate for specialty triage.
//!
//! Re-exports the embedding ([`semantic`]) and matching ([`matcher`]) layers
//! and offers one optional process-wide predictor for callers that do not want
//! to thread a [`SpecialtyPredictor`] through their code.
//!
//! ```no_run
//! # async fn run() -> Result<(), triage::TriageError> {
//! triage::warmup().await?;
//! let specialty = triage::predict_specialty("blurry vision in one eye").await?;
//! assert!(!specialty.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod config;

pub use config::{ConfigLoadError, TriageConfig};
pub use matcher::{
    cosine_similarity, rank, CatalogError, CatalogVectorIndex, LifecycleConfig, LifecycleError,
    ModelLifecycleManager, ModelState, PredictError, Prediction, RankOutcome, ReadyModel,
    Specialty, SpecialtyCatalog, SpecialtyPredictor, Stage, FALLBACK_SPECIALTY,
};
pub use semantic::{
    load_provider, ConfigLoader, EmbedOptions, EmbeddingProvider, EmbeddingVector,
    PoolingStrategy, ProviderLoader, RetryConfig, SemanticConfig, SemanticError, StubEmbedder,
};

use std::error::Error;
use std::fmt;
use std::sync::OnceLock;

/// Errors from the process-wide helpers.
#[derive(Debug)]
pub enum TriageError {
    Config(ConfigLoadError),
    Predict(PredictError),
}

impl fmt::Display for TriageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriageError::Config(err) => write!(f, "configuration failure: {err}"),
            TriageError::Predict(err) => write!(f, "prediction failure: {err}"),
        }
    }
}

impl Error for TriageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TriageError::Config(err) => Some(err),
            TriageError::Predict(err) => Some(err),
        }
    }
}

impl From<ConfigLoadError> for TriageError {
    fn from(value: ConfigLoadError) -> Self {
        TriageError::Config(value)
    }
}

impl From<PredictError> for TriageError {
    fn from(value: PredictError) -> Self {
        TriageError::Predict(value)
    }
}

static GLOBAL_PREDICTOR: OnceLock<SpecialtyPredictor> = OnceLock::new();

/// Installs the process-wide predictor. Fails (returning it) if one is already set.
pub fn install_predictor(predictor: SpecialtyPredictor) -> Result<(), SpecialtyPredictor> {
    GLOBAL_PREDICTOR.set(predictor)
}

/// Process-wide predictor, built from [`TriageConfig::from_env`] on first use
/// unless [`install_predictor`] ran earlier.
pub fn global_predictor() -> Result<&'static SpecialtyPredictor, TriageError> {
    if let Some(predictor) = GLOBAL_PREDICTOR.get() {
        return Ok(predictor);
    }
    let config = TriageConfig::from_env()?;
    tracing::info!(
        mode = %config.semantic.mode,
        model = %config.semantic.model_name,
        "building process-wide predictor"
    );
    let built = config.build_predictor()?;
    Ok(GLOBAL_PREDICTOR.get_or_init(|| built))
}

/// Loads the model and catalog vectors of the process-wide predictor.
pub async fn warmup() -> Result<(), TriageError> {
    global_predictor()?.warmup().await?;
    Ok(())
}

/// Predicts a specialty with the process-wide predictor.
pub async fn predict_specialty(problem: &str) -> Result<String, TriageError> {
    Ok(global_predictor()?.predict(problem).await?)
}
