//! Text-to-vector embedding gateway.
//!
//! Provides the [`EmbeddingProvider`] trait and an Ollama-backed
//! implementation. The provider is created via [`create_provider`] from
//! configuration.

pub mod ollama;

use crate::error::RagResult;

/// Trait for embedding text into vectors.
///
/// Implementations reject blank input with a validation error and return
/// vectors of exactly [`EmbeddingProvider::dimensions`] entries. All methods
/// are blocking.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> RagResult<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for batched requests.
    fn embed_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Model identifier recorded alongside stored vectors.
    fn model_name(&self) -> &str;
}

/// Create an embedding provider from config.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> anyhow::Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(ollama::OllamaEmbeddingProvider::new(config)?)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: ollama"),
    }
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}
