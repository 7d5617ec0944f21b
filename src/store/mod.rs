//! Chunk persistence and similarity queries over SQLite + sqlite-vec.
//!
//! [`VectorStore`] owns one connection behind a mutex so it can be shared via
//! `Arc` between ingestion and any number of conversations. Chunk rows live in
//! `chunks`; vectors live in the `chunks_vec` vec0 index keyed by chunk id.

pub mod types;

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::config::MAX_NEIGHBOR_RADIUS;
use crate::db;
use crate::embedding::embedding_to_bytes;
use crate::error::{RagError, RagResult};

pub use types::{Chunk, ChunkKey, NewChunk, SearchResult};

const CHUNK_COLUMNS: &str =
    "id, source_id, content_hash, sequence_index, content, metadata, created_at";

pub struct VectorStore {
    conn: Mutex<Connection>,
    dimensions: usize,
}

impl VectorStore {
    /// Open (or create) the store on disk for the given embedding space.
    pub fn open(path: impl AsRef<Path>, model: &str, dimensions: usize) -> RagResult<Self> {
        let conn = db::open_database(path, model, dimensions)?;
        Ok(Self::from_connection(conn, dimensions))
    }

    /// A throwaway store, mainly for tests.
    pub fn open_in_memory(model: &str, dimensions: usize) -> RagResult<Self> {
        let conn = db::open_in_memory(model, dimensions)?;
        Ok(Self::from_connection(conn, dimensions))
    }

    /// Wrap a connection already prepared by [`db::open_database`].
    pub fn from_connection(conn: Connection, dimensions: usize) -> Self {
        Self {
            conn: Mutex::new(conn),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn lock(&self) -> RagResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RagError::connectivity("vector-store", "connection lock poisoned"))
    }

    fn check_vector(&self, vector: &[f32]) -> RagResult<()> {
        if vector.is_empty() {
            return Err(RagError::validation("embedding vector is empty"));
        }
        if vector.len() != self.dimensions {
            return Err(RagError::validation(format!(
                "embedding has {} dimensions, store expects {}",
                vector.len(),
                self.dimensions
            )));
        }
        Ok(())
    }

    /// Write one chunk and its vector atomically.
    ///
    /// Returns `false` without touching anything when a chunk with the same
    /// (source, content hash, sequence index) already exists.
    pub fn store(&self, chunk: &NewChunk) -> RagResult<bool> {
        self.check_vector(&chunk.embedding)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let inserted = insert_chunk(&tx, chunk)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Write many chunks in a single transaction. Returns how many were new.
    pub fn store_batch(&self, chunks: &[NewChunk]) -> RagResult<usize> {
        for chunk in chunks {
            self.check_vector(&chunk.embedding)?;
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        for chunk in chunks {
            if insert_chunk(&tx, chunk)? {
                inserted += 1;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Nearest chunks to `query`, most similar first, none below `threshold`.
    pub fn search(&self, query: &[f32], top_k: usize, threshold: f64) -> RagResult<Vec<SearchResult>> {
        self.check_vector(query)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, distance FROM chunks_vec \
             WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
        )?;
        let hits: Vec<(String, f64)> = stmt
            .query_map(params![embedding_to_bytes(query), top_k as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = Vec::with_capacity(hits.len());
        for (id, distance) in hits {
            let similarity = 1.0 - distance;
            // hits are ordered by distance, so everything after this is worse
            if similarity.is_nan() || similarity < threshold {
                break;
            }
            if let Some(chunk) = fetch_chunk(&conn, &id)? {
                results.push(SearchResult { chunk, similarity });
            }
        }

        tracing::info!(top_k, threshold, results = results.len(), "vector search");
        Ok(results)
    }

    /// Chunks from the same source generation within `radius` positions of
    /// `chunk` (itself included), in sequence order. Radius is capped at
    /// [`MAX_NEIGHBOR_RADIUS`].
    pub fn neighbors(&self, chunk: &Chunk, radius: usize) -> RagResult<Vec<Chunk>> {
        let radius = radius.min(MAX_NEIGHBOR_RADIUS);
        let low = chunk.sequence_index.saturating_sub(radius) as i64;
        let high = (chunk.sequence_index + radius) as i64;

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks \
             WHERE source_id = ?1 AND content_hash = ?2 AND sequence_index BETWEEN ?3 AND ?4 \
             ORDER BY sequence_index"
        ))?;
        let chunks = stmt
            .query_map(
                params![chunk.source_id, chunk.content_hash, low, high],
                row_to_chunk,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(chunks)
    }

    /// Union of every result's neighborhood, first-seen order, no repeats.
    pub fn expand_with_neighbors(
        &self,
        results: &[SearchResult],
        radius: usize,
    ) -> RagResult<Vec<Chunk>> {
        let mut seen: HashSet<ChunkKey> = HashSet::new();
        let mut expanded = Vec::new();
        for result in results {
            for neighbor in self.neighbors(&result.chunk, radius)? {
                if seen.insert(neighbor.key()) {
                    expanded.push(neighbor);
                }
            }
        }
        tracing::debug!(
            results = results.len(),
            expanded = expanded.len(),
            radius,
            "expanded search results with neighbors"
        );
        Ok(expanded)
    }

    /// Whether this (source, content hash) generation finished ingesting.
    /// Chunks left behind by an interrupted run do not count.
    pub fn is_ingested(&self, source_id: &str, content_hash: &str) -> RagResult<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM ingestions WHERE source_id = ?1 AND content_hash = ?2",
                params![source_id, content_hash],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Note a completed ingestion in the ledger.
    pub fn record_ingestion(
        &self,
        source_id: &str,
        content_hash: &str,
        chunk_count: usize,
    ) -> RagResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO ingestions (source_id, content_hash, chunk_count, ingested_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                source_id,
                content_hash,
                chunk_count as i64,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn get_chunk(&self, id: &str) -> RagResult<Option<Chunk>> {
        let conn = self.lock()?;
        fetch_chunk(&conn, id)
    }

    pub fn chunk_count(&self) -> RagResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    pub fn counts_by_source(&self) -> RagResult<BTreeMap<String, usize>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT source_id, COUNT(*) FROM chunks GROUP BY source_id")?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(counts)
    }

    /// Delete the whole corpus. Returns how many chunks were removed.
    pub fn reset(&self) -> RagResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chunks_vec", [])?;
        let removed = tx.execute("DELETE FROM chunks", [])?;
        tx.execute("DELETE FROM ingestions", [])?;
        tx.commit()?;
        tracing::info!(removed, "corpus reset");
        Ok(removed)
    }
}

fn insert_chunk(conn: &Connection, chunk: &NewChunk) -> RagResult<bool> {
    let id = uuid::Uuid::now_v7().to_string();
    let metadata = serde_json::to_string(&chunk.metadata)?;
    let now = chrono::Utc::now().to_rfc3339();

    let changed = conn.execute(
        "INSERT OR IGNORE INTO chunks \
         (id, source_id, content_hash, sequence_index, content, metadata, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            chunk.source_id,
            chunk.content_hash,
            chunk.sequence_index as i64,
            chunk.content,
            metadata,
            now,
        ],
    )?;

    if changed == 0 {
        tracing::debug!(
            source = %chunk.source_id,
            index = chunk.sequence_index,
            "chunk already stored, skipping"
        );
        return Ok(false);
    }

    conn.execute(
        "INSERT INTO chunks_vec (id, embedding) VALUES (?1, ?2)",
        params![id, embedding_to_bytes(&chunk.embedding)],
    )?;
    tracing::debug!(id = %id, source = %chunk.source_id, index = chunk.sequence_index, "chunk stored");
    Ok(true)
}

fn fetch_chunk(conn: &Connection, id: &str) -> RagResult<Option<Chunk>> {
    let chunk = conn
        .query_row(
            &format!("SELECT {CHUNK_COLUMNS} FROM chunks WHERE id = ?1"),
            [id],
            row_to_chunk,
        )
        .optional()?;
    Ok(chunk)
}

fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    let metadata: Option<String> = row.get(5)?;
    Ok(Chunk {
        id: row.get(0)?,
        source_id: row.get(1)?,
        content_hash: row.get(2)?,
        sequence_index: row.get::<_, i64>(3)? as usize,
        content: row.get(4)?,
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
        created_at: row.get(6)?,
    })
}
