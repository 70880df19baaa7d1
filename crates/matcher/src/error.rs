use std::fmt;
use std::time::Duration;

use semantic::SemanticError;
use thiserror::Error;

/// Rejections raised while building a [`SpecialtyCatalog`](crate::SpecialtyCatalog).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("specialty at position {0} has a blank name")]
    BlankName(usize),
    #[error("specialty '{0}' has a blank description")]
    BlankDescription(String),
    #[error("duplicate specialty name '{0}'")]
    DuplicateName(String),
    #[error("invalid catalog document: {0}")]
    Parse(String),
}

/// Problems building the name -> vector index from catalog embeddings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("embedding for '{specialty}' has dimension {got}, expected {expected}")]
    DimensionMismatch {
        specialty: String,
        expected: usize,
        got: usize,
    },
    #[error("embedding for '{0}' is empty")]
    EmptyVector(String),
    #[error("specialty '{0}' indexed twice")]
    Duplicate(String),
}

/// Why the model could not be brought to the ready state.
///
/// Cloneable so a single failed initialization can be handed to every caller
/// that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error("model initialization failed: {0}")]
    Initialization(#[from] SemanticError),
    #[error("specialty vectors could not be indexed: {0}")]
    Index(#[from] IndexError),
    #[error("model initialization timed out after {0:?}")]
    Timeout(Duration),
    #[error("initialization task aborted: {0}")]
    Aborted(String),
}

/// Which step of a prediction ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Initialization,
    Embedding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Initialization => f.write_str("model initialization"),
            Stage::Embedding => f.write_str("query embedding"),
        }
    }
}

/// Errors returned by [`SpecialtyPredictor`](crate::SpecialtyPredictor).
#[derive(Debug, Clone, Error)]
pub enum PredictError {
    #[error("model initialization failed: {0}")]
    ModelInitialization(#[source] LifecycleError),
    #[error("embedding failed: {0}")]
    Embedding(#[from] SemanticError),
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },
    #[error("query embedding has dimension {got}, catalog vectors have {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl From<LifecycleError> for PredictError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Timeout(after) => PredictError::Timeout {
                stage: Stage::Initialization,
                after,
            },
            other => PredictError::ModelInitialization(other),
        }
    }
}
