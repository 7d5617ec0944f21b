//! SQL DDL for the chunk corpus.
//!
//! Defines the `chunks` table, the `chunks_vec` (vec0) index, and
//! `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Chunk text and provenance
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    sequence_index INTEGER NOT NULL CHECK(sequence_index >= 0),
    content TEXT NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL,
    UNIQUE(source_id, content_hash, sequence_index)
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// vec0 DDL for the given embedding width. Distances are cosine, so
/// `1 - distance` is the similarity.
fn vec_table_sql(dimensions: usize) -> String {
    format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS chunks_vec USING vec0(\n    \
         id TEXT PRIMARY KEY,\n    \
         embedding float[{dimensions}] distance_metric=cosine\n);"
    )
}

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection, dimensions: usize) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute_batch(&vec_table_sql(dimensions))?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, 8).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"chunks".to_string()));
        assert!(tables.contains(&"chunks_vec".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));

        let version: String = conn
            .query_row("SELECT vec_version()", [], |r| r.get(0))
            .unwrap();
        assert!(!version.is_empty());
    }

    #[test]
    fn schema_is_idempotent() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, 8).unwrap();
        init_schema(&conn, 8).unwrap();
    }

    #[test]
    fn duplicate_chunk_key_is_ignored() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, 8).unwrap();

        let insert = "INSERT OR IGNORE INTO chunks \
             (id, source_id, content_hash, sequence_index, content, created_at) \
             VALUES (?1, 'guide.md', 'abc', 0, 'text', '2026-01-01T00:00:00Z')";
        assert_eq!(conn.execute(insert, ["a"]).unwrap(), 1);
        assert_eq!(conn.execute(insert, ["b"]).unwrap(), 0);
    }
}
