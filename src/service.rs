//! Entry points: ingest text, chat within a named conversation, clear history.
//!
//! The store, model gateways and tool registry are shared by every
//! conversation. Each conversation owns its own [`Agent`] behind its own lock,
//! so separate conversations run in parallel while one conversation stays
//! strictly sequential.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;

use crate::agent::{Agent, TurnReport};
use crate::config::DocentConfig;
use crate::conversation::Message;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{RagError, RagResult};
use crate::generation::{self, GenerationProvider};
use crate::ingest::{IngestReport, Ingestor};
use crate::store::VectorStore;
use crate::tools::search_docs::{SearchDocsTool, TOOL_NAME};
use crate::tools::{ToolCall, ToolRegistry};

type Conversations = HashMap<String, Arc<Mutex<Agent>>>;

pub struct RagService {
    config: DocentConfig,
    store: Arc<VectorStore>,
    generator: Arc<dyn GenerationProvider>,
    tools: Arc<ToolRegistry>,
    ingestor: Ingestor,
    conversations: Mutex<Conversations>,
}

fn poisoned(what: &str) -> RagError {
    RagError::Other(anyhow::anyhow!("{what} lock poisoned"))
}

impl RagService {
    pub fn new(
        config: DocentConfig,
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> RagResult<Self> {
        if embedder.dimensions() != store.dimensions() {
            return Err(RagError::validation(format!(
                "embedding provider produces {} dimensions, store expects {}",
                embedder.dimensions(),
                store.dimensions()
            )));
        }

        let mut tools = ToolRegistry::new();
        tools.register(SearchDocsTool::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            config.retrieval.clone(),
        ))?;

        let ingestor = Ingestor::new(Arc::clone(&store), embedder, &config.chunking);

        Ok(Self {
            config,
            store,
            generator,
            tools: Arc::new(tools),
            ingestor,
            conversations: Mutex::new(HashMap::new()),
        })
    }

    /// Open the configured database and connect the configured model servers.
    pub fn from_config(config: DocentConfig) -> anyhow::Result<Self> {
        let store = VectorStore::open(
            config.resolved_db_path(),
            &config.embedding.model,
            config.embedding.dimensions,
        )
        .context("failed to open vector store")?;
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::from(embedding::create_provider(&config.embedding)?);
        let generator: Arc<dyn GenerationProvider> =
            Arc::from(generation::create_provider(&config.generation)?);

        Ok(Self::new(config, Arc::new(store), embedder, generator)?)
    }

    pub fn config(&self) -> &DocentConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// Chunk, embed and store a source. Idempotent per (source, text).
    pub fn ingest(&self, source_id: &str, raw_text: &str) -> RagResult<IngestReport> {
        self.ingestor.ingest(source_id, raw_text)
    }

    /// One turn in `conversation_id`, returning the reply text.
    pub fn chat(&self, conversation_id: &str, message: &str) -> RagResult<String> {
        self.chat_turn(conversation_id, message).map(|report| report.reply)
    }

    /// One turn in `conversation_id`, returning how it ended.
    pub fn chat_turn(&self, conversation_id: &str, message: &str) -> RagResult<TurnReport> {
        let agent = self.conversation(conversation_id)?;
        let mut agent = agent.lock().map_err(|_| poisoned("conversation"))?;
        agent.chat(message)
    }

    /// Forget a conversation. The next message to the same id starts fresh.
    pub fn clear_history(&self, conversation_id: &str) -> RagResult<()> {
        let removed = self.conversations()?.remove(conversation_id);
        if let Some(agent) = removed {
            agent
                .lock()
                .map_err(|_| poisoned("conversation"))?
                .clear_history();
            tracing::debug!(conversation = conversation_id, "conversation dropped");
        }
        Ok(())
    }

    /// Number of conversations currently held in memory.
    pub fn conversation_count(&self) -> RagResult<usize> {
        Ok(self.conversations()?.len())
    }

    pub fn history(&self, conversation_id: &str) -> RagResult<Vec<Message>> {
        match self.conversations()?.get(conversation_id) {
            Some(agent) => Ok(agent.lock().map_err(|_| poisoned("conversation"))?.history()),
            None => Ok(Vec::new()),
        }
    }

    /// Run the search tool directly, outside any conversation.
    pub fn search(&self, query: &str, top_k: Option<usize>, expand: bool) -> RagResult<String> {
        let mut call = ToolCall::new(TOOL_NAME)
            .with_param("query", query)
            .with_param("expandContext", expand);
        if let Some(k) = top_k {
            call = call.with_param("topK", k as i64);
        }
        self.tools.dispatch(&call)
    }

    fn conversations(&self) -> RagResult<MutexGuard<'_, Conversations>> {
        self.conversations.lock().map_err(|_| poisoned("conversation table"))
    }

    fn conversation(&self, conversation_id: &str) -> RagResult<Arc<Mutex<Agent>>> {
        let mut conversations = self.conversations()?;
        let agent = conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(conversation = conversation_id, "new conversation");
                Arc::new(Mutex::new(Agent::from_config(
                    Arc::clone(&self.generator),
                    Arc::clone(&self.tools),
                    &self.config,
                )))
            });
        Ok(Arc::clone(agent))
    }
}
