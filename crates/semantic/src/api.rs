use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::normalize::{l2_normalize_in_place, mean_pool};
use crate::provider::EmbeddingProvider;
use crate::retry::{execute_with_retry_async, RetryConfig};
use crate::types::{EmbedOptions, EmbeddingVector, PoolingStrategy};
use crate::{SemanticConfig, SemanticError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiProviderKind {
    HuggingFace,
    OpenAI,
    Custom,
}

/// Remote embedding provider speaking the Hugging Face feature-extraction, OpenAI
/// embeddings, or a minimal `{"text": ...}` JSON protocol.
#[derive(Debug, Clone)]
pub struct ApiEmbedder {
    client: reqwest::Client,
    url: String,
    provider: ApiProviderKind,
    retry: RetryConfig,
    cfg: SemanticConfig,
}

impl ApiEmbedder {
    pub fn new(cfg: SemanticConfig) -> Result<Self, SemanticError> {
        let url = cfg
            .api_url
            .clone()
            .ok_or_else(|| SemanticError::InvalidConfig("api_url is required for api mode".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.api_timeout_secs.unwrap_or(30)))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| SemanticError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self {
            client,
            url,
            provider: api_provider_kind(&cfg),
            retry: cfg.retry_config.unwrap_or_default(),
            cfg,
        })
    }

    async fn send(&self, payload: Value) -> Result<Value, SemanticError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");
        if let Some(header) = self.cfg.api_auth_header.as_deref() {
            request = request.header("Authorization", header);
        }

        let response = request
            .json(&payload)
            .send()
            .await
            .map_err(|e| SemanticError::Download(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SemanticError::Download(format!(
                "HTTP error {status}: {body}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SemanticError::Inference(format!("Invalid JSON response: {e}")))
    }
}

#[async_trait]
impl EmbeddingProvider for ApiEmbedder {
    async fn embed(
        &self,
        text: &str,
        options: EmbedOptions,
    ) -> Result<EmbeddingVector, SemanticError> {
        let payload = build_api_payload(self.provider, text, &self.cfg);

        let outcome = execute_with_retry_async(&self.retry, |attempt| {
            let payload = payload.clone();
            async move {
                if attempt > 0 {
                    tracing::warn!(attempt, url = %self.url, "retrying embedding request");
                }
                self.send(payload).await.map_err(|e| e.to_string())
            }
        })
        .await;

        let response = outcome.into_result().map_err(SemanticError::Download)?;
        let rows = parse_embeddings_from_value(response)?;
        let mut vector = reduce_rows(rows, options.pooling)?;
        if options.normalize {
            l2_normalize_in_place(&mut vector);
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        &self.cfg.model_name
    }
}

fn api_provider_kind(cfg: &SemanticConfig) -> ApiProviderKind {
    let provider = cfg
        .api_provider
        .as_deref()
        .unwrap_or("custom")
        .to_ascii_lowercase();
    match provider.as_str() {
        "hf" | "huggingface" => ApiProviderKind::HuggingFace,
        "openai" | "gpt" => ApiProviderKind::OpenAI,
        _ => ApiProviderKind::Custom,
    }
}

fn build_api_payload(provider: ApiProviderKind, text: &str, cfg: &SemanticConfig) -> Value {
    match provider {
        ApiProviderKind::HuggingFace => {
            json!({ "inputs": text, "options": { "wait_for_model": true } })
        }
        ApiProviderKind::OpenAI => json!({ "input": text, "model": cfg.model_name }),
        ApiProviderKind::Custom => json!({ "text": text }),
    }
}

/// A single input either comes back as one sentence vector or as token-level rows.
fn reduce_rows(
    mut rows: Vec<Vec<f32>>,
    pooling: PoolingStrategy,
) -> Result<EmbeddingVector, SemanticError> {
    if rows.len() <= 1 {
        return rows
            .pop()
            .ok_or_else(|| SemanticError::Inference("API response did not contain embeddings".into()));
    }
    match pooling {
        PoolingStrategy::Cls => Ok(rows.swap_remove(0)),
        PoolingStrategy::Mean => mean_pool(&rows),
    }
}

fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(mut obj) => {
                            let embedding = obj.remove("embedding").ok_or_else(|| {
                                SemanticError::Inference(
                                    "missing `embedding` field in data item".into(),
                                )
                            })?;
                            vectors.push(parse_embedding_vector(embedding)?);
                        }
                        _ => {
                            return Err(SemanticError::Inference(
                                "unexpected entry inside `data` array".into(),
                            ))
                        }
                    }
                }
                return Ok(vectors);
            }

            Err(SemanticError::Inference(
                "unsupported API response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Array(mut items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                // [batch][tokens][hidden]: one input was sent, keep its token rows
                if matches!(items.first(), Some(Value::Array(inner)) if matches!(inner.first(), Some(Value::Array(_))))
                {
                    return parse_embedding_collection(items.swap_remove(0));
                }
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, SemanticError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| SemanticError::Inference("non-finite embedding value".into())),
                other => Err(SemanticError::Inference(format!(
                    "embedding entries must be numbers, got {other:?}"
                ))),
            })
            .collect(),
        other => Err(SemanticError::Inference(format!(
            "embedding vector must be an array, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_config(provider: Option<&str>) -> SemanticConfig {
        SemanticConfig {
            mode: "api".into(),
            api_url: Some("https://api.example.com/embed".into()),
            api_provider: provider.map(str::to_string),
            ..SemanticConfig::default()
        }
    }

    #[test]
    fn provider_kind_from_hint() {
        assert_eq!(
            api_provider_kind(&api_config(Some("HuggingFace"))),
            ApiProviderKind::HuggingFace
        );
        assert_eq!(
            api_provider_kind(&api_config(Some("openai"))),
            ApiProviderKind::OpenAI
        );
        assert_eq!(api_provider_kind(&api_config(None)), ApiProviderKind::Custom);
    }

    #[test]
    fn payload_shapes() {
        let cfg = api_config(None);
        assert_eq!(
            build_api_payload(ApiProviderKind::HuggingFace, "rash", &cfg)["inputs"],
            "rash"
        );
        let openai = build_api_payload(ApiProviderKind::OpenAI, "rash", &cfg);
        assert_eq!(openai["input"], "rash");
        assert_eq!(openai["model"], "all-MiniLM-L6-v2");
        assert_eq!(
            build_api_payload(ApiProviderKind::Custom, "rash", &cfg)["text"],
            "rash"
        );
    }

    #[test]
    fn new_requires_url() {
        let cfg = SemanticConfig {
            api_url: None,
            ..api_config(None)
        };
        assert!(matches!(
            ApiEmbedder::new(cfg),
            Err(SemanticError::InvalidConfig(_))
        ));
    }

    #[test]
    fn parse_flat_and_nested() {
        let flat = parse_embeddings_from_value(json!([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(flat, vec![vec![1.0, 2.0, 3.0]]);

        let nested = parse_embeddings_from_value(json!([[1.0, 2.0], [3.0, 4.0]])).unwrap();
        assert_eq!(nested.len(), 2);

        let batched_tokens =
            parse_embeddings_from_value(json!([[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]])).unwrap();
        assert_eq!(batched_tokens.len(), 3);
        assert_eq!(batched_tokens[2], vec![5.0, 6.0]);
    }

    #[test]
    fn parse_openai_data_shape() {
        let value = json!({ "data": [{ "embedding": [0.5, 0.25] }] });
        assert_eq!(
            parse_embeddings_from_value(value).unwrap(),
            vec![vec![0.5, 0.25]]
        );
    }

    #[test]
    fn parse_rejects_unknown_object() {
        assert!(parse_embeddings_from_value(json!({ "vectors": [] })).is_err());
        assert!(parse_embeddings_from_value(json!(["a", "b"])).is_err());
    }

    #[test]
    fn reduce_rows_mean_pools_token_states() {
        let rows = vec![vec![1.0, 0.0], vec![3.0, 2.0]];
        assert_eq!(
            reduce_rows(rows.clone(), PoolingStrategy::Mean).unwrap(),
            vec![2.0, 1.0]
        );
        assert_eq!(
            reduce_rows(rows, PoolingStrategy::Cls).unwrap(),
            vec![1.0, 0.0]
        );
    }

    #[test]
    fn reduce_rows_empty_is_error() {
        assert!(reduce_rows(Vec::new(), PoolingStrategy::Mean).is_err());
    }

    #[test]
    fn ragged_token_rows_are_an_inference_error() {
        let value = json!([[0.1, 0.2, 0.3], [0.4, 0.5]]);
        let rows = parse_embeddings_from_value(value).unwrap();
        assert!(matches!(
            reduce_rows(rows, PoolingStrategy::Mean),
            Err(SemanticError::Inference(_))
        ));
    }
}
