pub mod chat;
pub mod doctor;
pub mod ingest;
pub mod reset;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};

use docent::config::DocentConfig;
use docent::store::VectorStore;

/// Open the configured store without contacting any model server.
pub fn open_store(config: &DocentConfig) -> Result<VectorStore> {
    VectorStore::open(
        config.resolved_db_path(),
        &config.embedding.model,
        config.embedding.dimensions,
    )
    .with_context(|| {
        format!(
            "failed to open database at {}",
            config.resolved_db_path().display()
        )
    })
}
