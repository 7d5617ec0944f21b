use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

use super::{GenerationOptions, GenerationProvider};
use crate::config::GenerationConfig;
use crate::error::{RagError, RagResult};

const SERVICE: &str = "ollama-chat";

/// Non-streaming chat completions against an Ollama server's `/api/chat`.
pub struct OllamaGenerationProvider {
    client: Client,
    url: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OllamaGenerationProvider {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/api/chat", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }
}

fn request_body(model: &str, prompt: &str, system: &str, options: &GenerationOptions) -> serde_json::Value {
    let mut messages = Vec::new();
    if !system.is_empty() {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": prompt }));

    json!({
        "model": model,
        "stream": false,
        "messages": messages,
        "options": {
            "temperature": options.temperature,
            "num_predict": options.max_tokens,
        }
    })
}

impl GenerationProvider for OllamaGenerationProvider {
    fn generate(&self, prompt: &str, system: &str, options: &GenerationOptions) -> RagResult<String> {
        let body = request_body(&self.model, prompt, system, options);
        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "generating");

        let response = self.client.post(&self.url).json(&body).send().map_err(|e| {
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

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| RagError::connectivity(SERVICE, format!("invalid response: {e}")))?;
        Ok(parsed.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_system_prompt_and_options() {
        let options = GenerationOptions {
            temperature: 0.2,
            max_tokens: 256,
        };
        let body = request_body("qwen2.5:7b", "hi", "be brief", &options);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["options"]["num_predict"], 256);
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let body = request_body("m", "hi", "", &GenerationOptions::default());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn unreachable_server_is_a_connectivity_error() {
        let config = GenerationConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
            ..GenerationConfig::default()
        };
        let provider = OllamaGenerationProvider::new(&config).unwrap();
        let err = provider
            .generate("hi", "", &GenerationOptions::default())
            .unwrap_err();
        assert!(err.is_connectivity());
    }
}
