//! Transformer sentence encoder run through ONNX Runtime.
//!
//! Expects a BERT-family sentence-embedding export (all-MiniLM-L6-v2 and
//! similar) with its WordPiece `vocab.txt`. `last_hidden_state` is
//! mean-pooled unless the model also emits `sentence_embedding`; either way
//! the vector is L2-normalized.

use crate::error::StartupDataError;
use crate::semantic::{Embedding, SemanticEncoder};
use crate::wordpiece::WordPiece;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

pub struct OnnxEncoder {
    /// `Session::run` needs `&mut`, encoders are shared
    session: Mutex<Session>,
    tokenizer: WordPiece,
    max_tokens: usize,
    token_types: bool,
    name: String,
}

// Session is Send but not Sync; every use goes through the Mutex.
unsafe impl Sync for OnnxEncoder {}

impl OnnxEncoder {
    pub fn load(model: &Path, vocab: &Path, max_tokens: usize) -> Result<Self, StartupDataError> {
        let model_err = |reason: String| StartupDataError::Model {
            path: model.to_path_buf(),
            reason,
        };
        if !model.exists() {
            return Err(model_err("model file not found".to_string()));
        }
        let tokenizer = WordPiece::from_file(vocab)?;

        let session = Session::builder()
            .map_err(|e| model_err(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e| model_err(e.to_string()))?
            .commit_from_file(model)
            .map_err(|e| model_err(e.to_string()))?;
        let token_types = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let name = model
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("onnx-model")
            .to_string();
        debug!(model = %name, vocab = tokenizer.len(), "ONNX encoder loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_tokens: max_tokens.max(2),
            token_types,
            name,
        })
    }

    fn infer(&self, text: &str) -> Result<Vec<f32>, String> {
        let ids = self.tokenizer.encode(text, self.max_tokens);
        let seq_len = ids.len();
        let shape = vec![1i64, seq_len as i64];

        let tensor = |values: Vec<i64>| {
            Tensor::from_array((shape.clone(), values)).map_err(|e| format!("tensor creation: {e}"))
        };
        let ids_tensor = tensor(ids)?;
        let mask_tensor = tensor(vec![1i64; seq_len])?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("session lock poisoned: {e}"))?;
        let outputs = if self.token_types {
            let types_tensor = tensor(vec![0i64; seq_len])?;
            session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
                "token_type_ids" => types_tensor
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor
            ])
        }
        .map_err(|e| e.to_string())?;

        let output = outputs
            .get("sentence_embedding")
            .or_else(|| outputs.get("last_hidden_state"))
            .ok_or_else(|| "no embedding output".to_string())?;
        let (dims, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| format!("tensor extraction: {e}"))?;

        let mut pooled = match dims.len() {
            // [1, seq, hidden]
            3 => {
                let seq = dims[1] as usize;
                let hidden = dims[2] as usize;
                let mut pooled = vec![0.0f32; hidden];
                for s in 0..seq {
                    for (d, v) in pooled.iter_mut().enumerate() {
                        *v += data[s * hidden + d];
                    }
                }
                for v in &mut pooled {
                    *v /= seq.max(1) as f32;
                }
                pooled
            }
            // [1, hidden], already pooled
            2 => data[..dims[1] as usize].to_vec(),
            _ => return Err(format!("unexpected output shape {dims:?}")),
        };

        let norm: f32 = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut pooled {
                *v /= norm;
            }
        }
        Ok(pooled)
    }
}

impl SemanticEncoder for OnnxEncoder {
    /// Inference failures yield an empty embedding, which scores 0.
    fn encode(&self, text: &str) -> Embedding {
        match self.infer(text) {
            Ok(values) => Embedding::new(values),
            Err(e) => {
                warn!(model = %self.name, "Embedding failed: {}", e);
                Embedding::new(Vec::new())
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
