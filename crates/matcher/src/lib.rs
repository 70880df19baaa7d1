//! # Specialty matcher (`matcher`)
//!
//! Matches a free-text description of a patient's problem to the closest
//! specialty in a fixed catalog by comparing sentence embeddings.
//!
//! ## Core Types
//!
//! - [`SpecialtyCatalog`]: ordered `(name, description)` list. The default is
//!   twelve curated specialties; custom catalogs are validated.
//! - [`ModelLifecycleManager`]: loads the embedding provider once and derives
//!   the [`CatalogVectorIndex`]. Concurrent callers share one initialization;
//!   a failure is retried on a later call after a backoff.
//! - [`rank`] / [`cosine_similarity`]: linear scan in catalog order, strictly
//!   greater score replaces the current best, ties keep the earliest.
//! - [`SpecialtyPredictor`]: ensure ready, embed, rank, return the name.
//!
//! ## Example Usage
//!
//! ```no_run
//! use matcher::{LifecycleConfig, SpecialtyCatalog, SpecialtyPredictor};
//! use semantic::SemanticConfig;
//!
//! # async fn run() -> Result<(), matcher::PredictError> {
//! let predictor = SpecialtyPredictor::from_semantic_config(
//!     SemanticConfig::default(),
//!     SpecialtyCatalog::default(),
//!     LifecycleConfig::default(),
//! );
//! predictor.warmup().await?;
//! let specialty = predictor.predict("sharp chest pain when climbing stairs").await?;
//! println!("see a {specialty}");
//! # Ok(())
//! # }
//! ```

mod catalog;
mod error;
mod lifecycle;
mod predictor;
mod ranker;
mod similarity;

pub use crate::catalog::{Specialty, SpecialtyCatalog, FALLBACK_SPECIALTY};
pub use crate::error::{CatalogError, IndexError, LifecycleError, PredictError, Stage};
pub use crate::lifecycle::{
    default_backoff, LifecycleConfig, ModelLifecycleManager, ModelState, ReadyModel,
};
pub use crate::predictor::{Prediction, SpecialtyPredictor};
pub use crate::ranker::{rank, CatalogVectorIndex, RankOutcome};
pub use crate::similarity::cosine_similarity;
