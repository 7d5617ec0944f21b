use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Largest neighbor radius the store will honor.
pub const MAX_NEIGHBOR_RADIUS: usize = 3;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DocentConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub memory: MemoryConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub target_tokens: usize,
    pub overlap_tokens: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Minimum cosine similarity for a search hit. Relevant matches typically
    /// land in 0.5–0.7, so higher values tend to return nothing.
    pub similarity_threshold: f64,
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub neighbor_radius: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_messages: usize,
    pub max_tokens: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: usize,
    /// Subject area named in the system prompt.
    pub domain: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_docent_dir()
            .join("corpus.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            base_url: "http://localhost:11434".into(),
            model: "nomic-embed-text".into(),
            dimensions: 768,
            timeout_secs: 30,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            base_url: "http://localhost:11434".into(),
            model: "qwen2.5:7b".into(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 120,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_tokens: 512,
            overlap_tokens: 64,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            default_top_k: 5,
            max_top_k: 10,
            neighbor_radius: 1,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 10,
            max_tokens: 4000,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            domain: "the ingested documentation".into(),
        }
    }
}

/// Returns `~/.docent/`, falling back to `./.docent/` when no home directory is known.
pub fn default_docent_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".docent")
}

/// Returns the default config file path: `~/.docent/config.toml`
pub fn default_config_path() -> PathBuf {
    default_docent_dir().join("config.toml")
}

impl DocentConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            DocentConfig::default()
        };

        config.apply_env_overrides();
        config.clamp();
        Ok(config)
    }

    /// Apply environment variable overrides (DOCENT_DB, DOCENT_LOG_LEVEL,
    /// DOCENT_OLLAMA_URL, DOCENT_CHAT_MODEL, DOCENT_EMBED_MODEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DOCENT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("DOCENT_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("DOCENT_OLLAMA_URL") {
            self.embedding.base_url = val.clone();
            self.generation.base_url = val;
        }
        if let Ok(val) = std::env::var("DOCENT_CHAT_MODEL") {
            self.generation.model = val;
        }
        if let Ok(val) = std::env::var("DOCENT_EMBED_MODEL") {
            self.embedding.model = val;
        }
    }

    fn clamp(&mut self) {
        self.retrieval.max_top_k = self.retrieval.max_top_k.max(1);
        self.retrieval.default_top_k = self
            .retrieval
            .default_top_k
            .clamp(1, self.retrieval.max_top_k);
        self.retrieval.neighbor_radius = self.retrieval.neighbor_radius.min(MAX_NEIGHBOR_RADIUS);
        self.agent.max_iterations = self.agent.max_iterations.max(1);
        self.chunking.target_tokens = self.chunking.target_tokens.max(1);
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
