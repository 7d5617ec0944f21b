#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use docent::config::DocentConfig;
use docent::embedding::EmbeddingProvider;
use docent::error::{RagError, RagResult};
use docent::generation::{GenerationOptions, GenerationProvider};
use docent::store::{NewChunk, VectorStore};

pub const TEST_DIMS: usize = 8;
pub const TEST_MODEL: &str = "topic-embed";

/// Keyword vocabularies, one per embedding dimension. The last dimension is a
/// small constant bias so no vector is all zeros.
const TOPICS: [&[&str]; TEST_DIMS - 1] = [
    &["embabel", "jvm", "agent", "agents", "framework"],
    &["rust", "cargo", "crate", "borrow"],
    &["python", "pip", "django"],
    &["database", "sqlite", "sql", "storage"],
    &["cooking", "cook", "recipe", "pasta"],
    &["deploy", "deployment", "kubernetes", "docker"],
    &["install", "installation", "setup"],
];

/// Open a fresh in-memory store with schema and migrations applied.
pub fn test_store() -> Arc<VectorStore> {
    Arc::new(VectorStore::open_in_memory(TEST_MODEL, TEST_DIMS).unwrap())
}

/// Config sized for the test embedder, with small chunks.
pub fn test_config() -> DocentConfig {
    let mut config = DocentConfig::default();
    config.embedding.model = TEST_MODEL.into();
    config.embedding.dimensions = TEST_DIMS;
    config.chunking.target_tokens = 40;
    config.chunking.overlap_tokens = 5;
    config
}

/// Unit vector along `dim`.
pub fn unit(dim: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; TEST_DIMS];
    v[dim % TEST_DIMS] = 1.0;
    v
}

/// Normalized sum of two unit directions.
pub fn blend(a: usize, b: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; TEST_DIMS];
    v[a] += 1.0;
    v[b] += 1.0;
    normalize(v)
}

pub fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

pub fn new_chunk(source: &str, hash: &str, index: usize, content: &str, embedding: Vec<f32>) -> NewChunk {
    NewChunk {
        source_id: source.into(),
        content_hash: hash.into(),
        sequence_index: index,
        content: content.into(),
        embedding,
        metadata: serde_json::json!({}),
    }
}

/// Deterministic embedder: counts topic keywords per dimension.
pub struct TopicEmbedder;

impl EmbeddingProvider for TopicEmbedder {
    fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::validation("cannot embed empty text"));
        }
        let mut v = vec![0.0f32; TEST_DIMS];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            for (dim, vocab) in TOPICS.iter().enumerate() {
                if vocab.contains(&word) {
                    v[dim] += 1.0;
                }
            }
        }
        v[TEST_DIMS - 1] = 0.1;
        Ok(normalize(v))
    }

    fn dimensions(&self) -> usize {
        TEST_DIMS
    }

    fn model_name(&self) -> &str {
        TEST_MODEL
    }
}

/// Embedder whose backend is down.
pub struct OfflineEmbedder;

impl EmbeddingProvider for OfflineEmbedder {
    fn embed(&self, _text: &str) -> RagResult<Vec<f32>> {
        Err(RagError::connectivity("test-embed", "connection refused"))
    }

    fn dimensions(&self) -> usize {
        TEST_DIMS
    }

    fn model_name(&self) -> &str {
        TEST_MODEL
    }
}

/// Embeds like [`TopicEmbedder`] for the first `ok_calls` texts, then
/// behaves like an unreachable server.
pub struct FlakyEmbedder {
    ok_calls: usize,
    calls: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn new(ok_calls: usize) -> Self {
        Self {
            ok_calls,
            calls: AtomicUsize::new(0),
        }
    }
}

impl EmbeddingProvider for FlakyEmbedder {
    fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.ok_calls {
            TopicEmbedder.embed(text)
        } else {
            Err(RagError::connectivity("test-embed", "connection reset"))
        }
    }

    fn dimensions(&self) -> usize {
        TEST_DIMS
    }

    fn model_name(&self) -> &str {
        TEST_MODEL
    }
}

/// Replays canned responses in order and records every prompt it saw.
/// Once the script runs out it answers with plain text.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl GenerationProvider for ScriptedGenerator {
    fn generate(&self, prompt: &str, _system: &str, _options: &GenerationOptions) -> RagResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "That is all I know.".to_string()))
    }
}

/// Asks for a search on every single call.
pub struct AlwaysToolGenerator;

impl GenerationProvider for AlwaysToolGenerator {
    fn generate(&self, _prompt: &str, _system: &str, _options: &GenerationOptions) -> RagResult<String> {
        Ok(tool_call_block("embabel agents"))
    }
}

/// Model server that is down.
pub struct OfflineGenerator;

impl GenerationProvider for OfflineGenerator {
    fn generate(&self, _prompt: &str, _system: &str, _options: &GenerationOptions) -> RagResult<String> {
        Err(RagError::connectivity("test-chat", "connection refused"))
    }
}

/// Behaves like a cooperative model: searches for the latest user question,
/// then answers by quoting the first retrieved document.
pub struct GroundedGenerator;

impl GenerationProvider for GroundedGenerator {
    fn generate(&self, prompt: &str, _system: &str, _options: &GenerationOptions) -> RagResult<String> {
        if let Some(docs) = prompt.split("=== RELEVANT DOCUMENTATION ===\n").nth(1) {
            let quoted = docs
                .lines()
                .skip_while(|l| !l.starts_with("Document 1"))
                .nth(1)
                .unwrap_or("nothing relevant");
            return Ok(format!("According to the documentation: {quoted}"));
        }
        let question = prompt
            .lines()
            .rev()
            .find_map(|l| l.strip_prefix("user: "))
            .unwrap_or("");
        Ok(tool_call_block(question))
    }
}

/// A fenced `search_documentation` call for `query`.
pub fn tool_call_block(query: &str) -> String {
    format!(
        "```json\n{}\n```",
        serde_json::json!({
            "tool": "search_documentation",
            "parameters": { "query": query }
        })
    )
}
