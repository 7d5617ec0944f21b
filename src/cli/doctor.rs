//! CLI `doctor` command: database diagnostics and a health report.

use anyhow::{Context, Result};

use docent::config::DocentConfig;
use docent::db;

pub fn doctor(config: &DocentConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `docent ingest <FILE>` to create it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path, &config.embedding.model, config.embedding.dimensions)
        .context("failed to open database (may be corrupt or built for another embedding width)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("Docent Health Report");
    println!("====================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("sqlite-vec:        {}", report.sqlite_vec_version);
    println!();
    println!("Embedding model:");
    println!("  Stored:          {}", report.embedding_model.as_deref().unwrap_or("(not set)"));
    println!("  Configured:      {}", config.embedding.model);
    if let Some(ref stored) = report.embedding_model {
        if stored != &config.embedding.model {
            println!("  WARNING: model mismatch! Run `docent reset` and re-ingest.");
        } else {
            println!("  Status:          OK (match)");
        }
    }
    println!(
        "  Dimensions:      {}",
        report
            .embedding_dimensions
            .map_or_else(|| "(not set)".to_string(), |d| d.to_string())
    );
    println!();
    println!("Row counts:");
    println!("  Chunks:          {}", report.chunk_count);
    println!("  Vectors:         {}", report.vector_count);
    println!("  Sources:         {}", report.source_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!(
            "Integrity check:   FAILED ({}; {} chunks vs {} vectors)",
            report.integrity_details, report.chunk_count, report.vector_count
        );
        println!();
        println!("Recovery: run `docent reset --yes` and re-ingest your documents.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
