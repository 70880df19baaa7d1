//! Local inference through ONNX Runtime.
//!
//! The session is not shareable across threads, so it lives on one dedicated
//! worker thread for the provider's lifetime. Callers talk to it over a channel
//! and await a oneshot reply.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use onnxruntime::environment::Environment;
use onnxruntime::ndarray::{Array, Array2};
use onnxruntime::session::Session;
use std::sync::mpsc;
use std::thread;
use tokenizers::Tokenizer;
use tokio::sync::oneshot;

use crate::assets::ModelAssets;
use crate::normalize::{l2_normalize_in_place, masked_mean_pool};
use crate::provider::EmbeddingProvider;
use crate::types::{EmbedOptions, EmbeddingVector, PoolingStrategy};
use crate::{SemanticConfig, SemanticError};

static ORT_ENV: OnceCell<Environment> = OnceCell::new();

type Reply = oneshot::Sender<Result<Vec<EmbeddingVector>, SemanticError>>;

struct Job {
    texts: Vec<String>,
    pooling: PoolingStrategy,
    reply: Reply,
}

/// Sentence embedder backed by a local `model.onnx` + `tokenizer.json` pair.
pub struct OnnxEmbedder {
    jobs: mpsc::Sender<Job>,
    model_name: String,
}

impl OnnxEmbedder {
    /// Resolves (and if configured, downloads) the assets, then builds the session on
    /// the worker thread. Resolves once the session is usable or failed to build.
    pub async fn load(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        let assets = ModelAssets::resolve(cfg).await?;
        let max_sequence_length = cfg.max_sequence_length.max(1);
        let (jobs, inbox) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = oneshot::channel();

        thread::Builder::new()
            .name("onnx-embedder".into())
            .spawn(move || {
                let mut model = match CachedModel::load(&assets) {
                    Ok(model) => {
                        let _ = ready_tx.send(Ok(()));
                        model
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                while let Ok(job) = inbox.recv() {
                    let result =
                        run_onnx_embeddings(&mut model, &job.texts, max_sequence_length, job.pooling);
                    let _ = job.reply.send(result);
                }
                tracing::debug!("onnx worker shutting down");
            })?;

        ready_rx
            .await
            .map_err(|_| SemanticError::Inference("onnx worker exited during load".into()))??;

        tracing::info!(model = %cfg.model_name, "onnx session ready");
        Ok(Self {
            jobs,
            model_name: cfg.model_name.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed(
        &self,
        text: &str,
        options: EmbedOptions,
    ) -> Result<EmbeddingVector, SemanticError> {
        let (reply, response) = oneshot::channel();
        self.jobs
            .send(Job {
                texts: vec![text.to_owned()],
                pooling: options.pooling,
                reply,
            })
            .map_err(|_| SemanticError::Inference("onnx worker is not running".into()))?;

        let mut vectors = response
            .await
            .map_err(|_| SemanticError::Inference("onnx worker dropped the request".into()))??;
        let mut embedding = vectors
            .pop()
            .ok_or_else(|| SemanticError::Inference("model returned no outputs".into()))?;

        if options.normalize {
            l2_normalize_in_place(&mut embedding);
        }
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

struct CachedModel {
    tokenizer: Tokenizer,
    session: Session<'static>,
}

impl CachedModel {
    fn load(assets: &ModelAssets) -> Result<Self, SemanticError> {
        let tokenizer = Tokenizer::from_file(&assets.tokenizer_path)
            .map_err(|e| SemanticError::Inference(e.to_string()))?;

        let env = ort_environment()?;
        let session = env
            .new_session_builder()
            .map_err(|e| SemanticError::Inference(e.to_string()))?
            .with_model_from_file(assets.model_path.clone())
            .map_err(|e| SemanticError::Inference(e.to_string()))?;

        Ok(Self { tokenizer, session })
    }
}

fn ort_environment() -> Result<&'static Environment, SemanticError> {
    ORT_ENV.get_or_try_init(|| {
        Environment::builder()
            .with_name("triage")
            .build()
            .map_err(|e| SemanticError::Inference(e.to_string()))
    })
}

fn run_onnx_embeddings(
    model: &mut CachedModel,
    texts: &[String],
    max_sequence_length: usize,
    pooling: PoolingStrategy,
) -> Result<Vec<EmbeddingVector>, SemanticError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let (encoded, max_len) = encode_documents(&model.tokenizer, texts, max_sequence_length)?;
    let (input_ids, attn_mask) = build_padded_arrays(encoded, max_len)?;
    let mask_rows = attn_mask.clone();
    let (shape, flat) = execute_session(&mut model.session, input_ids, attn_mask)?;
    pool_output(&shape, &flat, &mask_rows, pooling)
}

/// Reduces the first model output to one vector per input.
///
/// `[batch, hidden]` outputs are already sentence vectors; `[batch, seq, hidden]`
/// outputs are token states and get pooled.
fn pool_output(
    shape: &[usize],
    flat: &[f32],
    mask: &Array2<i64>,
    pooling: PoolingStrategy,
) -> Result<Vec<EmbeddingVector>, SemanticError> {
    match *shape {
        [_, hidden] => Ok(flat.chunks(hidden.max(1)).map(<[f32]>::to_vec).collect()),
        [batch, seq, hidden] => {
            let per_doc = seq * hidden;
            let mut vectors = Vec::with_capacity(batch);
            for (doc, states) in flat.chunks(per_doc.max(1)).enumerate() {
                let vector = match pooling {
                    PoolingStrategy::Cls => states[..hidden].to_vec(),
                    PoolingStrategy::Mean => {
                        let row = mask.row(doc);
                        let row: Vec<i64> = row.iter().copied().collect();
                        masked_mean_pool(states, &row, hidden)
                    }
                };
                vectors.push(vector);
            }
            Ok(vectors)
        }
        _ => Err(SemanticError::Inference(format!(
            "unsupported model output shape {shape:?}"
        ))),
    }
}

struct EncodedDoc {
    ids: Vec<i64>,
    mask: Vec<i64>,
}

fn encode_documents(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_sequence_length: usize,
) -> Result<(Vec<EncodedDoc>, usize), SemanticError> {
    let mut encoded = Vec::with_capacity(texts.len());
    let mut max_len = 0usize;

    for text in texts {
        let encoding = tokenizer
            .encode(text.as_str(), true)
            .map_err(|e| SemanticError::Inference(e.to_string()))?;
        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
        let mut mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| x as i64)
            .collect();
        ids.truncate(max_sequence_length);
        mask.truncate(max_sequence_length);
        max_len = max_len.max(ids.len());
        encoded.push(EncodedDoc { ids, mask });
    }

    Ok((encoded, max_len))
}

fn build_padded_arrays(
    encoded: Vec<EncodedDoc>,
    max_len: usize,
) -> Result<(Array2<i64>, Array2<i64>), SemanticError> {
    let seq_len = max_len.max(1);
    let batch = encoded.len();
    let mut id_storage = Vec::with_capacity(batch * seq_len);
    let mut mask_storage = Vec::with_capacity(batch * seq_len);

    for EncodedDoc { ids, mask } in encoded {
        if ids.len() != mask.len() {
            return Err(SemanticError::Inference(
                "tokenizer produced mismatched id/mask lengths".into(),
            ));
        }
        let pad = seq_len.saturating_sub(ids.len());
        id_storage.extend(ids);
        mask_storage.extend(mask);
        id_storage.extend(std::iter::repeat(0).take(pad));
        mask_storage.extend(std::iter::repeat(0).take(pad));
    }

    let input_ids = Array::from_shape_vec((batch, seq_len), id_storage)
        .map_err(|e| SemanticError::Inference(e.to_string()))?;
    let attn_mask = Array::from_shape_vec((batch, seq_len), mask_storage)
        .map_err(|e| SemanticError::Inference(e.to_string()))?;
    Ok((input_ids, attn_mask))
}

fn execute_session(
    session: &mut Session<'static>,
    input_ids: Array2<i64>,
    attn_mask: Array2<i64>,
) -> Result<(Vec<usize>, Vec<f32>), SemanticError> {
    let (batch, seq_len) = input_ids.dim();
    let mut runtime_inputs = Vec::with_capacity(session.inputs.len());
    let mut input_ids_tensor = Some(input_ids);
    let mut attn_mask_tensor = Some(attn_mask);

    for input in &session.inputs {
        match input.name.as_str() {
            "input_ids" => {
                let tensor = input_ids_tensor.take().ok_or_else(|| {
                    SemanticError::InvalidConfig("model requested `input_ids` twice".into())
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "attention_mask" => {
                let tensor = attn_mask_tensor.take().ok_or_else(|| {
                    SemanticError::InvalidConfig("model requested `attention_mask` twice".into())
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "token_type_ids" => {
                runtime_inputs.push(Array::from_elem((batch, seq_len), 0_i64).into_dyn());
            }
            other => {
                return Err(SemanticError::Inference(format!(
                    "unsupported model input '{other}'"
                )))
            }
        }
    }

    if runtime_inputs.is_empty() {
        return Err(SemanticError::Inference(
            "model did not declare any inputs".into(),
        ));
    }

    let outputs = session
        .run::<i64, f32, _>(runtime_inputs)
        .map_err(|e| SemanticError::Inference(e.to_string()))?;
    let output_tensor = outputs
        .into_iter()
        .next()
        .ok_or_else(|| SemanticError::Inference("model returned no outputs".into()))?;

    let shape = output_tensor.shape().to_vec();
    let flat: Vec<f32> = output_tensor.iter().copied().collect();
    Ok((shape, flat))
}
