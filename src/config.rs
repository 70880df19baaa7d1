//! YAML configuration for the triage predictor.
//!
//! One file describes the embedding backend, the lifecycle timeouts and,
//! optionally, a custom specialty catalog. A few environment variables can
//! override the backend without editing the file.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//!
//! semantic:
//!   mode: "api"
//!   model_name: "all-MiniLM-L6-v2"
//!   api_url: "https://router.huggingface.co/hf-inference/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction"
//!   api_provider: "hf"
//!
//! lifecycle:
//!   init_timeout: 60000
//!   embed_timeout: 10000
//!   retry_backoff:
//!     base_delay: 500
//!     max_delay: 30000
//!
//! catalog:
//!   - name: "Dentist"
//!     description: "Teeth, gums, toothache and oral hygiene."
//! ```
//!
//! ## Environment overrides
//!
//! | Variable | Field |
//! |---|---|
//! | `TRIAGE_CONFIG` | path of the YAML file read by [`TriageConfig::from_env`] |
//! | `TRIAGE_SEMANTIC_MODE` | `semantic.mode` |
//! | `TRIAGE_MODEL_PATH` | `semantic.model_path` |
//! | `TRIAGE_TOKENIZER_PATH` | `semantic.tokenizer_path` |
//! | `TRIAGE_API_URL` | `semantic.api_url` |
//! | `TRIAGE_API_AUTH` | `semantic.api_auth_header` |
//! | `TRIAGE_API_PROVIDER` | `semantic.api_provider` |

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use matcher::{
    CatalogError, LifecycleConfig, Specialty, SpecialtyCatalog, SpecialtyPredictor,
};
use semantic::SemanticConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const KNOWN_MODES: [&str; 3] = ["onnx", "api", "fast"];

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Replaces the built-in catalog when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Vec<Specialty>>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            semantic: SemanticConfig::default(),
            lifecycle: LifecycleConfig::default(),
            catalog: None,
        }
    }
}

impl TriageConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: TriageConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// File named by `TRIAGE_CONFIG` (or defaults), then `TRIAGE_*` overrides.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let mut config = match env::var_os("TRIAGE_CONFIG") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies `TRIAGE_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let semantic = &mut self.semantic;
        if let Some(mode) = lookup("TRIAGE_SEMANTIC_MODE") {
            semantic.mode = mode;
        }
        if let Some(path) = lookup("TRIAGE_MODEL_PATH") {
            semantic.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("TRIAGE_TOKENIZER_PATH") {
            semantic.tokenizer_path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup("TRIAGE_API_URL") {
            semantic.api_url = Some(url);
        }
        if let Some(auth) = lookup("TRIAGE_API_AUTH") {
            semantic.api_auth_header = Some(auth);
        }
        if let Some(provider) = lookup("TRIAGE_API_PROVIDER") {
            semantic.api_provider = Some(provider);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        if !KNOWN_MODES.contains(&self.semantic.mode.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "semantic.mode must be one of {KNOWN_MODES:?}, got '{}'",
                self.semantic.mode
            )));
        }
        if self.semantic.mode == "api" && self.semantic.api_url.is_none() {
            return Err(ConfigLoadError::Validation(
                "semantic.api_url is required in api mode".into(),
            ));
        }
        if self.semantic.max_sequence_length == 0 {
            return Err(ConfigLoadError::Validation(
                "semantic.max_sequence_length must be > 0".into(),
            ));
        }
        if let Some(list) = &self.catalog {
            SpecialtyCatalog::new(list.clone())?;
        }
        Ok(())
    }

    /// Catalog described by this config, or the built-in one.
    pub fn catalog(&self) -> Result<SpecialtyCatalog, ConfigLoadError> {
        match &self.catalog {
            Some(list) => Ok(SpecialtyCatalog::new(list.clone())?),
            None => Ok(SpecialtyCatalog::default()),
        }
    }

    /// Predictor wired from this config. Does not load the model.
    pub fn build_predictor(&self) -> Result<SpecialtyPredictor, ConfigLoadError> {
        Ok(SpecialtyPredictor::from_semantic_config(
            self.semantic.clone(),
            self.catalog()?,
            self.lifecycle.clone(),
        ))
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
