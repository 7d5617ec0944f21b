//! Ingestion path: raw text → chunks → embeddings → vector store.
//!
//! Re-ingesting the same (source, text) pair is a no-op: the source text is
//! hashed up front, and a generation already present in the store is skipped
//! before anything is embedded.

use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::chunker;
use crate::config::ChunkingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::RagResult;
use crate::store::{NewChunk, VectorStore};

/// Chunks embedded per provider request.
const EMBED_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub source_id: String,
    pub content_hash: String,
    pub chunks_total: usize,
    pub chunks_stored: usize,
    /// `true` when this exact text was already ingested for the source.
    pub skipped: bool,
}

/// SHA-256 hex digest of a source's full text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct Ingestor {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    target_tokens: usize,
    overlap_tokens: usize,
}

impl Ingestor {
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        chunking: &ChunkingConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            target_tokens: chunking.target_tokens,
            overlap_tokens: chunking.overlap_tokens,
        }
    }

    pub fn ingest(&self, source_id: &str, raw_text: &str) -> RagResult<IngestReport> {
        self.ingest_with_metadata(source_id, raw_text, &Map::new())
    }

    /// Ingest with extra metadata keys attached to every chunk.
    pub fn ingest_with_metadata(
        &self,
        source_id: &str,
        raw_text: &str,
        extra: &Map<String, Value>,
    ) -> RagResult<IngestReport> {
        let hash = content_hash(raw_text);
        let mut report = IngestReport {
            source_id: source_id.to_string(),
            content_hash: hash.clone(),
            chunks_total: 0,
            chunks_stored: 0,
            skipped: false,
        };

        if self.store.is_ingested(source_id, &hash)? {
            tracing::info!(source = source_id, "source already ingested, skipping");
            report.skipped = true;
            return Ok(report);
        }

        let pieces = chunker::chunk_slices(raw_text, self.target_tokens, self.overlap_tokens);
        report.chunks_total = pieces.len();
        if pieces.is_empty() {
            tracing::warn!(source = source_id, "source has no content to ingest");
            return Ok(report);
        }

        for (batch_no, batch) in pieces.chunks(EMBED_BATCH_SIZE).enumerate() {
            let vectors = self.embedder.embed_batch(batch)?;
            let offset = batch_no * EMBED_BATCH_SIZE;

            let new_chunks: Vec<NewChunk> = batch
                .iter()
                .zip(vectors)
                .enumerate()
                .map(|(i, (content, embedding))| {
                    let mut metadata = extra.clone();
                    metadata.insert("total_chunks".into(), json!(pieces.len()));
                    metadata.insert("char_count".into(), json!(content.chars().count()));
                    NewChunk {
                        source_id: source_id.to_string(),
                        content_hash: hash.clone(),
                        sequence_index: offset + i,
                        content: content.to_string(),
                        embedding,
                        metadata: Value::Object(metadata),
                    }
                })
                .collect();

            report.chunks_stored += self.store.store_batch(&new_chunks)?;
        }

        self.store
            .record_ingestion(source_id, &hash, report.chunks_total)?;
        tracing::info!(
            source = source_id,
            chunks = report.chunks_total,
            stored = report.chunks_stored,
            "ingestion complete"
        );
        Ok(report)
    }
}
