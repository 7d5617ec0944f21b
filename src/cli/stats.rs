use anyhow::Result;

use docent::config::DocentConfig;

/// Display corpus statistics in the terminal.
pub fn stats(config: &DocentConfig) -> Result<()> {
    let store = super::open_store(config)?;
    let by_source = store.counts_by_source()?;
    let total = store.chunk_count()?;

    println!("Corpus Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total chunks:        {total}");
    println!("  Sources:             {}", by_source.len());
    println!();

    if !by_source.is_empty() {
        println!("By Source:");
        for (source, count) in &by_source {
            println!("  {:<40} {}", source, count);
        }
    }

    Ok(())
}
