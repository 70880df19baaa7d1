//! Local model files for the ONNX backend.
//!
//! A file that is missing locally is fetched from its configured URL into a
//! `.part` sibling and renamed into place once complete, so an interrupted
//! download never leaves a truncated model behind for the next load.

use std::path::{Path, PathBuf};

use crate::{SemanticConfig, SemanticError};

const DEFAULT_TOKENIZER_FILE: &str = "tokenizer.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    Model,
    Tokenizer,
}

impl AssetKind {
    fn missing(self, path: &Path) -> SemanticError {
        let shown = path.display().to_string();
        match self {
            AssetKind::Model => SemanticError::ModelNotFound(shown),
            AssetKind::Tokenizer => SemanticError::TokenizerMissing(shown),
        }
    }

    fn label(self) -> &'static str {
        match self {
            AssetKind::Model => "model",
            AssetKind::Tokenizer => "tokenizer",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ModelAssets {
    pub(crate) model_path: PathBuf,
    pub(crate) tokenizer_path: PathBuf,
}

impl ModelAssets {
    /// Paths of the model and tokenizer, fetching whichever is absent and has a URL.
    pub(crate) async fn resolve(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        let model_path = materialize(
            AssetKind::Model,
            &cfg.model_path,
            cfg.model_url.as_deref(),
        )
        .await?;

        let tokenizer_target = tokenizer_target(cfg)?;
        let tokenizer_path = materialize(
            AssetKind::Tokenizer,
            &tokenizer_target,
            cfg.tokenizer_url.as_deref(),
        )
        .await?;

        Ok(Self {
            model_path,
            tokenizer_path,
        })
    }
}

/// Configured tokenizer path, or a file beside the model named after the URL.
fn tokenizer_target(cfg: &SemanticConfig) -> Result<PathBuf, SemanticError> {
    match (&cfg.tokenizer_path, &cfg.tokenizer_url) {
        (Some(path), _) => Ok(path.clone()),
        (None, Some(url)) => {
            let dir = cfg
                .model_path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file = file_name_from_url(url).unwrap_or_else(|| DEFAULT_TOKENIZER_FILE.into());
            Ok(dir.join(file))
        }
        (None, None) => Err(SemanticError::TokenizerMissing(format!(
            "no tokenizer path or URL configured for {}",
            cfg.model_name
        ))),
    }
}

async fn materialize(
    kind: AssetKind,
    target: &Path,
    url: Option<&str>,
) -> Result<PathBuf, SemanticError> {
    if tokio::fs::try_exists(target).await? {
        return Ok(target.to_path_buf());
    }
    let Some(url) = url else {
        return Err(kind.missing(target));
    };

    tracing::info!(asset = kind.label(), url, target = %target.display(), "fetching model asset");
    let bytes = fetch(url).await?;
    if bytes.is_empty() {
        return Err(SemanticError::Download(format!(
            "{} download from {url} was empty",
            kind.label()
        )));
    }
    write_atomically(target, &bytes).await?;
    Ok(target.to_path_buf())
}

async fn fetch(url: &str) -> Result<Vec<u8>, SemanticError> {
    let download = |e: reqwest::Error| SemanticError::Download(format!("{url}: {e}"));
    let response = reqwest::get(url).await.map_err(download)?;
    let status = response.status();
    if !status.is_success() {
        return Err(SemanticError::Download(format!("{url}: HTTP {status}")));
    }
    Ok(response.bytes().await.map_err(download)?.to_vec())
}

async fn write_atomically(target: &Path, bytes: &[u8]) -> Result<(), SemanticError> {
    if let Some(dir) = target.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let partial = partial_path(target);
    tokio::fs::write(&partial, bytes).await?;
    tokio::fs::rename(&partial, target).await?;
    Ok(())
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

/// Last non-empty path segment of `url`, without query or fragment.
fn file_name_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    path.rsplit('/')
        .find(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(str::to_string)
}
