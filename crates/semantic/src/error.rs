use std::io;
use thiserror::Error;

/// Errors surfaced while loading an embedding provider or embedding text.
#[derive(Debug, Error)]
pub enum SemanticError {
    /// The ONNX model could not be located locally and no download URL was provided.
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    /// The tokenizer JSON is missing and there was no remote URL to fetch it from.
    #[error("tokenizer missing: {0}")]
    TokenizerMissing(String),
    /// Configuration is inconsistent (unknown mode, missing API URL, feature not compiled in).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// Unable to download remote assets or reach the embedding API.
    #[error("download failed: {0}")]
    Download(String),
    /// Low-level IO failures while touching the filesystem.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// ONNX Runtime, tokenizer, or response-shape errors.
    #[error("inference failure: {0}")]
    Inference(String),
}

impl Clone for SemanticError {
    fn clone(&self) -> Self {
        match self {
            SemanticError::ModelNotFound(s) => SemanticError::ModelNotFound(s.clone()),
            SemanticError::TokenizerMissing(s) => SemanticError::TokenizerMissing(s.clone()),
            SemanticError::InvalidConfig(s) => SemanticError::InvalidConfig(s.clone()),
            SemanticError::Download(s) => SemanticError::Download(s.clone()),
            SemanticError::Io(err) => SemanticError::Io(io::Error::new(err.kind(), err.to_string())),
            SemanticError::Inference(s) => SemanticError::Inference(s.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_model_not_found() {
        let err = SemanticError::ModelNotFound("/path/to/model.onnx".into());
        assert!(err.to_string().contains("model file not found"));
        assert!(err.to_string().contains("/path/to/model.onnx"));
    }

    #[test]
    fn error_invalid_config() {
        let err = SemanticError::InvalidConfig("unknown mode 'gpu'".into());
        assert!(err.to_string().contains("invalid semantic config"));
        assert!(err.to_string().contains("unknown mode 'gpu'"));
    }

    #[test]
    fn error_download() {
        let err = SemanticError::Download("network timeout".into());
        assert!(err.to_string().contains("download failed"));
        assert!(err.to_string().contains("network timeout"));
    }

    #[test]
    fn error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: SemanticError = io_err.into();
        assert!(err.to_string().contains("io error"));
    }

    #[test]
    fn clone_keeps_io_kind_and_message() {
        let err: SemanticError = io::Error::new(io::ErrorKind::PermissionDenied, "locked").into();
        match err.clone() {
            SemanticError::Io(cloned) => {
                assert_eq!(cloned.kind(), io::ErrorKind::PermissionDenied);
                assert!(cloned.to_string().contains("locked"));
            }
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn clone_preserves_display() {
        let variants = vec![
            SemanticError::ModelNotFound("a".into()),
            SemanticError::TokenizerMissing("b".into()),
            SemanticError::InvalidConfig("c".into()),
            SemanticError::Download("d".into()),
            SemanticError::Inference("e".into()),
        ];

        for err in variants {
            assert_eq!(err.to_string(), err.clone().to_string());
        }
    }
}
