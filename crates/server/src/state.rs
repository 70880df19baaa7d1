use crate::config::ServerConfig;
use crate::error::ServerResult;
use matcher::{SpecialtyCatalog, SpecialtyPredictor};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Predictor shared across requests; owns the model lifecycle
    pub predictor: SpecialtyPredictor,

    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl ServerState {
    /// Create new server state from configuration.
    ///
    /// The model is not loaded here; the first request or the startup warmup
    /// triggers it.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let catalog = load_catalog(&config)?;
        tracing::info!(
            specialties = catalog.len(),
            mode = %config.semantic.mode,
            "specialty catalog loaded"
        );

        let predictor = SpecialtyPredictor::from_semantic_config(
            config.semantic.clone(),
            catalog,
            config.lifecycle.clone(),
        );
        Ok(Self::with_predictor(config, predictor))
    }

    /// State around an already-built predictor.
    pub fn with_predictor(config: ServerConfig, predictor: SpecialtyPredictor) -> Self {
        Self {
            config: Arc::new(config),
            predictor,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

fn load_catalog(config: &ServerConfig) -> ServerResult<SpecialtyCatalog> {
    match &config.catalog_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Ok(SpecialtyCatalog::from_json(&raw)?)
        }
        None => Ok(SpecialtyCatalog::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_without_path() {
        let state = ServerState::new(ServerConfig::default()).unwrap();
        assert_eq!(state.predictor.lifecycle().catalog().len(), 12);
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let config = ServerConfig {
            catalog_path: Some("./does/not/exist.json".into()),
            ..ServerConfig::default()
        };
        assert!(ServerState::new(config).is_err());
    }
}
