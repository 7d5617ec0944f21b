//! Text generation gateway.
//!
//! [`GenerationProvider`] is the seam between the agent loop and a language
//! model. [`create_provider`] builds the configured implementation.

pub mod ollama;

use crate::config::GenerationConfig;
use crate::error::RagResult;

/// Sampling knobs passed through to the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

impl From<&GenerationConfig> for GenerationOptions {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Blocking text generation. Unreachable backends and timeouts surface as
/// [`crate::error::RagError::Connectivity`].
pub trait GenerationProvider: Send + Sync {
    fn generate(&self, prompt: &str, system: &str, options: &GenerationOptions) -> RagResult<String>;
}

pub fn create_provider(config: &GenerationConfig) -> anyhow::Result<Box<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(ollama::OllamaGenerationProvider::new(config)?)),
        other => anyhow::bail!("unknown generation provider: {other}. Supported: ollama"),
    }
}
