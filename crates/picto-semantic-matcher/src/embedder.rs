//! Sentence embedding using Candle
//!
//! Loads a BERT-family sentence encoder from the HuggingFace Hub and
//! computes fixed-length, L2-normalized embeddings for text.
//!
//! The default model is the multilingual paraphrase MiniLM, which handles
//! Japanese input and produces 384-dimensional vectors with mean pooling.
//! CLS pooling is available for retrieval models that expect it.
//!
//! Downloads land in the HuggingFace cache (`~/.cache/huggingface`), so only
//! the first load of a model touches the network.

use crate::types::{MatcherError, Pooling};
use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::path::{Path, PathBuf};
use tokenizers::{Encoding, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info, instrument};

/// Model repository on HuggingFace Hub
pub const DEFAULT_MODEL: &str = "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

/// Longer inputs are truncated; text units are a clause or a sentence
const MAX_TOKENS: usize = 256;

/// Maps text to a fixed-length vector.
///
/// Implementations must be deterministic for identical input within a
/// process lifetime.
pub trait TextEmbedder: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, MatcherError>;

    /// Embed several texts. The default calls `embed` in order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, MatcherError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;

    /// Identifier used in logs
    fn model_name(&self) -> &str;
}

/// Local paths of the three files a BERT checkpoint needs
struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

impl ModelFiles {
    fn fetch(model_name: &str) -> Result<Self> {
        let api = Api::new().context("HuggingFace API client unavailable")?;
        let repo = api.repo(Repo::new(model_name.to_string(), RepoType::Model));
        let get = |file: &str| {
            repo.get(file)
                .with_context(|| format!("Cannot fetch {} from {}", file, model_name))
        };
        Ok(Self {
            config: get("config.json")?,
            tokenizer: get("tokenizer.json")?,
            weights: get("model.safetensors")?,
        })
    }
}

/// Transformer sentence embedder
pub struct Embedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    pooling: Pooling,
    hidden_size: usize,
    model_name: String,
}

impl Embedder {
    /// The default multilingual model with mean pooling
    pub fn new() -> Result<Self> {
        Self::with_model(DEFAULT_MODEL, Pooling::Mean)
    }

    /// Load `model_name` from the hub (or the local cache)
    #[instrument(skip_all, fields(model = %model_name))]
    pub fn with_model(model_name: &str, pooling: Pooling) -> Result<Self> {
        info!("Loading embedding model: {}", model_name);
        let device = Device::Cpu;

        let files = ModelFiles::fetch(model_name)?;
        debug!("Model files resolved: {}", files.weights.display());

        let raw_config = std::fs::read_to_string(&files.config)
            .with_context(|| format!("Cannot read {}", files.config.display()))?;
        let config: Config =
            serde_json::from_str(&raw_config).context("config.json is not a BERT config")?;
        let hidden_size = config.hidden_size;

        let tokenizer = Self::load_tokenizer(&files.tokenizer)?;

        // Safety: the safetensors file is owned by the hub cache and not modified while mapped
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[&files.weights], DTYPE, &device) }
            .context("Cannot map model weights")?;
        let model = BertModel::load(vb, &config).context("Weights do not match BERT config")?;

        info!(
            "Embedding model ready ({}, {:?} pooling, {} dims)",
            model_name, pooling, hidden_size
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            pooling,
            hidden_size,
            model_name: model_name.to_string(),
        })
    }

    /// Tokenizer that pads every batch to its longest member
    fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
        let mut tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Cannot load tokenizer {}: {}", path.display(), e))?;

        // Keep the model's own pad token and id when tokenizer.json defines them
        let mut padding = tokenizer.get_padding().cloned().unwrap_or_default();
        padding.strategy = PaddingStrategy::BatchLongest;
        tokenizer.with_padding(Some(padding));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Invalid truncation settings: {}", e))?;

        Ok(tokenizer)
    }

    /// `(batch, seq)` u32 tensor from one field of each encoding
    fn stack<F>(&self, encodings: &[Encoding], field: F) -> Result<Tensor>
    where
        F: Fn(&Encoding) -> &[u32],
    {
        let seq_len = encodings.first().map(|e| field(e).len()).unwrap_or(0);
        let flat: Vec<u32> = encodings.iter().flat_map(|e| field(e).to_vec()).collect();
        Ok(Tensor::from_vec(flat, (encodings.len(), seq_len), &self.device)?)
    }

    fn forward_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        let input_ids = self.stack(&encodings, Encoding::get_ids)?;
        let type_ids = self.stack(&encodings, Encoding::get_type_ids)?;
        let attention_mask = self.stack(&encodings, Encoding::get_attention_mask)?;

        // (batch, seq, hidden)
        let hidden = self
            .model
            .forward(&input_ids, &type_ids, Some(&attention_mask))?;

        let pooled = match self.pooling {
            Pooling::Cls => hidden.narrow(1, 0, 1)?.squeeze(1)?,
            Pooling::Mean => Self::mean_pool(&hidden, &attention_mask)?,
        };

        Ok(Self::unit_rows(&pooled)?.to_vec2::<f32>()?)
    }

    /// Attention-masked mean over the sequence axis
    fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        // (batch, seq) -> (batch, seq, 1)
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        Ok(summed.broadcast_div(&counts)?)
    }

    /// Scale each row to unit L2 norm
    fn unit_rows(tensor: &Tensor) -> Result<Tensor> {
        let norms = tensor
            .sqr()?
            .sum_keepdim(1)?
            .sqrt()?
            .clamp(1e-12, f64::MAX)?;
        Ok(tensor.broadcast_div(&norms)?)
    }

    pub fn pooling(&self) -> Pooling {
        self.pooling
    }
}

fn unavailable(e: anyhow::Error) -> MatcherError {
    MatcherError::ResourceUnavailable(format!("embedding failed: {:#}", e))
}

impl TextEmbedder for Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, MatcherError> {
        self.forward_batch(&[text])
            .map_err(unavailable)?
            .pop()
            .ok_or_else(|| {
                MatcherError::ResourceUnavailable("model returned no embedding".to_string())
            })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, MatcherError> {
        self.forward_batch(texts).map_err(unavailable)
    }

    fn dimension(&self) -> usize {
        self.hidden_size
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centroid::{cosine_similarity, l2_norm};

    #[test]
    #[ignore] // Requires model download
    fn test_embed_is_unit_length() {
        let embedder = Embedder::new().unwrap();
        let v = embedder.embed("お茶を飲む").unwrap();

        assert_eq!(v.len(), embedder.dimension());
        assert!((l2_norm(&v) - 1.0).abs() < 0.01);
    }

    #[test]
    #[ignore] // Requires model download
    fn test_padded_batch_matches_single() {
        let embedder = Embedder::new().unwrap();
        // Different lengths force padding inside the batch
        let texts = ["病院", "毎朝ごはんを食べてから薬を飲みます", "待つ"];

        let batch = embedder.embed_batch(&texts).unwrap();
        assert_eq!(batch.len(), 3);

        for (text, vector) in texts.iter().zip(&batch) {
            let single = embedder.embed(text).unwrap();
            assert!(cosine_similarity(vector, &single) > 0.99, "{}", text);
        }
    }

    #[test]
    #[ignore] // Requires model download
    fn test_related_text_scores_higher() {
        let embedder = Embedder::new().unwrap();

        let query = embedder.embed("病院にいきます").unwrap();
        let related = cosine_similarity(&query, &embedder.embed("診察").unwrap());
        let unrelated = cosine_similarity(&query, &embedder.embed("フライドポテト").unwrap());
        assert!(related > unrelated, "{} <= {}", related, unrelated);
    }

    #[test]
    #[ignore] // Requires model download
    fn test_cls_pooling_dimension() {
        let embedder = Embedder::with_model(DEFAULT_MODEL, Pooling::Cls).unwrap();
        assert_eq!(embedder.pooling(), Pooling::Cls);
        assert_eq!(embedder.embed("待つ").unwrap().len(), embedder.dimension());
    }
}
