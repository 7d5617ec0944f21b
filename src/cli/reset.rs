//! CLI `reset` command: delete the whole corpus after user confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use docent::config::DocentConfig;

pub fn reset(config: &DocentConfig, skip_confirmation: bool) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !skip_confirmation {
        println!("WARNING: This will permanently delete ALL ingested chunks and vectors.");
        println!("Database: {}", db_path.display());
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "YES" {
            bail!("reset cancelled");
        }
    }

    let store = super::open_store(config)?;
    let removed = store.reset()?;

    println!("Deleted {removed} chunk(s). Corpus reset complete.");
    Ok(())
}
