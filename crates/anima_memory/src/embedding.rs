use anima_core::config::MemoryConfig;
use anima_core::Embedding;
use anyhow::{Context, Result};
use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
use std::sync::Arc;

/// Turns text into a fixed-length vector. Produced vectors are compared
/// with [`cosine_similarity`], so implementations need not normalise.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Embedding>;
    fn dims(&self) -> usize;
}

/// Build the embedder named by `config.embedder`: `"fastembed"` (default)
/// or `"hash"`.
pub fn from_config(config: &MemoryConfig) -> Result<Arc<dyn Embedder>> {
    match config.embedder.as_str() {
        "fastembed" => Ok(Arc::new(FastEmbedder::new()?)),
        "hash" => Ok(Arc::new(HashEmbedder::new(config.embedding_dims))),
        other => anyhow::bail!("Unknown embedder: {}", other),
    }
}

/// Semantic sentence embeddings from a local ONNX model
/// (multilingual-e5-small). The model is downloaded on first use.
#[derive(Clone)]
pub struct FastEmbedder {
    model: Arc<TextEmbedding>,
}

impl FastEmbedder {
    pub const DIMS: usize = 384;

    pub fn new() -> Result<Self> {
        let mut options = InitOptions::default();
        options.model_name = FastEmbedModel::MultilingualE5Small;
        options.show_download_progress = true;

        let model = TextEmbedding::try_new(options).context("Failed to load embedding model")?;
        Ok(Self {
            model: Arc::new(model),
        })
    }
}

impl Embedder for FastEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let embeddings = self.model.embed(vec![text], None)?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Failed to generate embedding"))
    }

    fn dims(&self) -> usize {
        Self::DIMS
    }
}

/// Offline feature-hashing embedder. Lexical only: reworded text scores
/// low, so it suits tests and setups without the model.
///
/// Each lower-cased word and each character trigram of each word is hashed
/// (FNV-1a) into one of `dims` buckets, with a sign bit taken from the hash
/// to reduce collision bias. Deterministic across runs and platforms, so
/// stored vectors stay comparable.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(8) }
    }

    fn add_feature(&self, v: &mut [f32], feature: &str, weight: f32) {
        let h = fnv1a(feature.as_bytes());
        let bucket = (h % self.dims as u64) as usize;
        let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign * weight;
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut v = vec![0.0f32; self.dims];
        let lower = text.to_lowercase();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            self.add_feature(&mut v, word, 1.0);
            let chars: Vec<char> = word.chars().collect();
            if chars.len() >= 3 {
                for tri in chars.windows(3) {
                    let gram: String = tri.iter().collect();
                    self.add_feature(&mut v, &gram, 0.5);
                }
            }
        }
        Ok(v)
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Calculate cosine similarity between two vectors
/// Returns a value between -1.0 and 1.0 (1.0 = identical direction)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
