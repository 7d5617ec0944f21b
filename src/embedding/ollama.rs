use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::{RagError, RagResult};

const SERVICE: &str = "ollama-embed";

/// Embeddings from an Ollama server's `/api/embed` endpoint.
pub struct OllamaEmbeddingProvider {
    client: Client,
    url: String,
    model: String,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/api/embed", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    fn request(&self, input: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "model": self.model, "input": input }))
            .send()
            .map_err(|e| {
                RagError::connectivity(
                    SERVICE,
                    format!("failed to reach {} (is Ollama running?): {e}", self.url),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagError::Http {
                service: SERVICE.into(),
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let body: EmbedResponse = response
            .json()
            .map_err(|e| RagError::connectivity(SERVICE, format!("invalid response: {e}")))?;

        if body.embeddings.len() != input.len() {
            return Err(RagError::validation(format!(
                "expected {} embeddings, got {}",
                input.len(),
                body.embeddings.len()
            )));
        }
        for vector in &body.embeddings {
            if vector.len() != self.dimensions {
                return Err(RagError::validation(format!(
                    "model {} returned {} dimensions, configured for {}",
                    self.model,
                    vector.len(),
                    self.dimensions
                )));
            }
        }
        Ok(body.embeddings)
    }
}

impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::validation("cannot embed empty text"));
        }
        self.request(&[text])?
            .pop()
            .ok_or_else(|| RagError::validation("empty embedding response"))
    }

    fn embed_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(RagError::validation("cannot embed empty text"));
        }
        tracing::debug!(count = texts.len(), model = %self.model, "embedding batch");
        self.request(texts)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
