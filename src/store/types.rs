//! Chunk records exchanged with the vector store.

use serde::Serialize;

/// A chunk ready to be written, embedding included.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub source_id: String,
    /// SHA-256 of the whole source text this chunk was cut from.
    pub content_hash: String,
    pub sequence_index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// A stored chunk as read back from the store. The vector stays in the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub id: String,
    pub source_id: String,
    pub content_hash: String,
    pub sequence_index: usize,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

/// Identity of a chunk within the corpus: (source, content hash, position).
pub type ChunkKey = (String, String, usize);

impl Chunk {
    pub fn key(&self) -> ChunkKey {
        (
            self.source_id.clone(),
            self.content_hash.clone(),
            self.sequence_index,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Cosine similarity in [-1, 1]; higher is closer.
    pub similarity: f64,
}
