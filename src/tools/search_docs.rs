//! `search_documentation`: semantic search over the ingested corpus.

use std::fmt::Write as _;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ParamValue, Tool, ToolCall};
use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, RagResult};
use crate::store::{Chunk, SearchResult, VectorStore};

pub const TOOL_NAME: &str = "search_documentation";

pub const NO_RESULTS: &str =
    "No relevant documentation found for the query. Try rephrasing or using different keywords.";

/// Parameters for the `search_documentation` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchDocsParams {
    #[schemars(description = "Natural language search query describing what to look up")]
    pub query: String,

    #[serde(rename = "topK")]
    #[schemars(description = "Number of documents to return (1-10). Defaults to 5.")]
    pub top_k: Option<i64>,

    #[serde(rename = "expandContext")]
    #[schemars(
        description = "If true, include the chunks surrounding each match for more context. Defaults to false."
    )]
    pub expand_context: Option<bool>,
}

impl SearchDocsParams {
    /// Read parameters from a loosely typed call. Numeric strings and
    /// `"true"`/`"false"` are accepted.
    pub fn from_call(call: &ToolCall) -> RagResult<Self> {
        let query = call
            .get("query")
            .and_then(ParamValue::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| RagError::validation("query parameter is required"))?;

        let top_k = match call.get("topK") {
            None => None,
            Some(v) => Some(v.as_i64().ok_or_else(|| {
                RagError::validation("topK must be an integer")
            })?),
        };
        let expand_context = match call.get("expandContext") {
            None => None,
            Some(v) => Some(v.as_bool().ok_or_else(|| {
                RagError::validation("expandContext must be a boolean")
            })?),
        };

        Ok(Self {
            query: query.to_string(),
            top_k,
            expand_context,
        })
    }
}

pub struct SearchDocsTool {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    retrieval: RetrievalConfig,
}

impl SearchDocsTool {
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            retrieval,
        }
    }

    fn clamp_top_k(&self, requested: Option<i64>) -> usize {
        let max = self.retrieval.max_top_k.max(1) as i64;
        requested
            .unwrap_or(self.retrieval.default_top_k as i64)
            .clamp(1, max) as usize
    }
}

impl Tool for SearchDocsTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Search the documentation for passages relevant to a query. Use this whenever \
         the question concerns the documented subject."
    }

    fn parameter_schema(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(SearchDocsParams))
            .unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
    }

    fn execute(&self, call: &ToolCall) -> RagResult<String> {
        let params = SearchDocsParams::from_call(call)?;
        let top_k = self.clamp_top_k(params.top_k);
        let expand = params.expand_context.unwrap_or(false);

        let query_vector = self.embedder.embed(&params.query)?;
        let results = self.store.search(
            &query_vector,
            top_k,
            self.retrieval.similarity_threshold,
        )?;

        if results.is_empty() {
            tracing::info!(query = %params.query, "no documents above threshold");
            return Ok(NO_RESULTS.to_string());
        }

        if expand {
            let chunks = self
                .store
                .expand_with_neighbors(&results, self.retrieval.neighbor_radius)?;
            Ok(format_expanded(&chunks))
        } else {
            Ok(format_results(&results))
        }
    }
}

pub fn format_results(results: &[SearchResult]) -> String {
    let mut out = format!("Found {} relevant documents:\n\n", results.len());
    for (i, result) in results.iter().enumerate() {
        let _ = writeln!(out, "---");
        let _ = writeln!(
            out,
            "Document {} [Source: {}] [Similarity: {:.2}]",
            i + 1,
            result.chunk.source_id,
            result.similarity
        );
        let _ = writeln!(out, "{}\n", result.chunk.content.trim());
    }
    out
}

pub fn format_expanded(chunks: &[Chunk]) -> String {
    let mut out = format!(
        "Found {} relevant document chunks (expanded with neighbors):\n\n",
        chunks.len()
    );
    for (i, chunk) in chunks.iter().enumerate() {
        let _ = writeln!(out, "---");
        let _ = writeln!(
            out,
            "Document {} [Source: {}] [Chunk: {}]",
            i + 1,
            chunk.source_id,
            chunk.sequence_index
        );
        let _ = writeln!(out, "{}\n", chunk.content.trim());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_require_query() {
        let err = SearchDocsParams::from_call(&ToolCall::new(TOOL_NAME)).unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));

        let blank = ToolCall::new(TOOL_NAME).with_param("query", "   ");
        assert!(SearchDocsParams::from_call(&blank).is_err());
    }

    #[test]
    fn params_accept_loose_scalars() {
        let call = ToolCall::new(TOOL_NAME)
            .with_param("query", "agents")
            .with_param("topK", "3")
            .with_param("expandContext", "true");
        let params = SearchDocsParams::from_call(&call).unwrap();
        assert_eq!(params.top_k, Some(3));
        assert_eq!(params.expand_context, Some(true));
    }

    #[test]
    fn params_reject_wrong_types() {
        let call = ToolCall::new(TOOL_NAME)
            .with_param("query", "agents")
            .with_param("topK", "many");
        assert!(SearchDocsParams::from_call(&call).is_err());
    }

    #[test]
    fn schema_lists_parameters() {
        let schema = serde_json::to_value(schemars::schema_for!(SearchDocsParams)).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("query").is_some());
        assert!(properties.get("topK").is_some());
        assert!(properties.get("expandContext").is_some());
        assert_eq!(schema["required"], serde_json::json!(["query"]));
    }

    #[test]
    fn results_render_with_source_and_similarity() {
        let chunk = Chunk {
            id: "c1".into(),
            source_id: "guide.md".into(),
            content_hash: "h".into(),
            sequence_index: 0,
            content: "Embabel is a JVM agent framework.\n\n".into(),
            metadata: None,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        let rendered = format_results(&[SearchResult {
            chunk,
            similarity: 0.8731,
        }]);
        assert!(rendered.starts_with("Found 1 relevant documents:"));
        assert!(rendered.contains("Document 1 [Source: guide.md] [Similarity: 0.87]"));
        assert!(rendered.contains("Embabel is a JVM agent framework."));
    }
}
