pub mod migrations;
pub mod schema;

use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;
use std::time::Duration;

use crate::error::{RagError, RagResult};

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Open (or create) the corpus database at the given path, with sqlite-vec
/// loaded, schema initialized, and the embedding space checked against
/// `model`/`dimensions`.
pub fn open_database(path: impl AsRef<Path>, model: &str, dimensions: usize) -> RagResult<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            RagError::connectivity(
                "vector-store",
                format!("failed to create directory {}: {e}", parent.display()),
            )
        })?;
    }

    load_sqlite_vec();

    let conn = Connection::open(path).map_err(|e| {
        RagError::connectivity(
            "vector-store",
            format!("failed to open database at {}: {e}", path.display()),
        )
    })?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(Duration::from_secs(5))?;

    prepare(&conn, model, dimensions)?;

    tracing::info!(path = %path.display(), dimensions, "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
pub fn open_in_memory(model: &str, dimensions: usize) -> RagResult<Connection> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory()?;
    prepare(&conn, model, dimensions)?;
    Ok(conn)
}

fn prepare(conn: &Connection, model: &str, dimensions: usize) -> RagResult<()> {
    if dimensions == 0 {
        return Err(RagError::validation("embedding dimensions must be non-zero"));
    }
    schema::init_schema(conn, dimensions)?;
    migrations::run_migrations(conn)?;
    ensure_embedding_space(conn, model, dimensions)
}

/// Record the embedding space on first use; refuse a width that differs from
/// the one the stored vectors were built with.
fn ensure_embedding_space(conn: &Connection, model: &str, dimensions: usize) -> RagResult<()> {
    match migrations::get_embedding_dimensions(conn)? {
        Some(stored) if stored != dimensions => {
            return Err(RagError::validation(format!(
                "database holds {stored}-dimensional vectors but {dimensions} are configured; \
                 run `docent reset` and re-ingest"
            )));
        }
        Some(_) => {}
        None => migrations::set_embedding_dimensions(conn, dimensions)?,
    }

    match migrations::get_embedding_model(conn)? {
        Some(stored) if stored != model => {
            tracing::warn!(stored = %stored, configured = %model, "embedding model mismatch");
        }
        Some(_) => {}
        None => migrations::set_embedding_model(conn, model)?,
    }
    Ok(())
}

/// Database diagnostics for the `doctor` command.
#[derive(Debug)]
pub struct HealthReport {
    pub schema_version: u32,
    pub sqlite_vec_version: String,
    pub embedding_model: Option<String>,
    pub embedding_dimensions: Option<usize>,
    pub chunk_count: i64,
    pub vector_count: i64,
    pub source_count: i64,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

pub fn check_database_health(conn: &Connection) -> RagResult<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;
    let sqlite_vec_version: String = conn.query_row("SELECT vec_version()", [], |r| r.get(0))?;
    let chunk_count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))?;
    let vector_count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks_vec", [], |r| r.get(0))?;
    let source_count: i64 =
        conn.query_row("SELECT COUNT(DISTINCT source_id) FROM chunks", [], |r| r.get(0))?;
    let integrity_details: String =
        conn.query_row("PRAGMA integrity_check", [], |r| r.get(0))?;

    Ok(HealthReport {
        schema_version,
        sqlite_vec_version,
        embedding_model: migrations::get_embedding_model(conn)?,
        embedding_dimensions: migrations::get_embedding_dimensions(conn)?,
        chunk_count,
        vector_count,
        source_count,
        integrity_ok: integrity_details == "ok" && chunk_count == vector_count,
        integrity_details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_database_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("corpus.db");
        let conn = open_database(&path, "test-embed", 8).unwrap();
        assert!(path.exists());

        let report = check_database_health(&conn).unwrap();
        assert_eq!(report.schema_version, migrations::CURRENT_SCHEMA_VERSION);
        assert_eq!(report.embedding_dimensions, Some(8));
        assert_eq!(report.embedding_model.as_deref(), Some("test-embed"));
        assert!(report.integrity_ok);
    }

    #[test]
    fn reopening_with_other_width_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("corpus.db");
        drop(open_database(&path, "test-embed", 8).unwrap());

        let err = open_database(&path, "test-embed", 16).unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
    }

    #[test]
    fn zero_dimensions_rejected() {
        assert!(matches!(
            open_in_memory("test-embed", 0).unwrap_err(),
            RagError::Validation(_)
        ));
    }
}
