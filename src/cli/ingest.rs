//! CLI `ingest` command: read files and add them to the corpus.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use docent::config::DocentConfig;
use docent::service::RagService;

pub fn ingest(config: &DocentConfig, files: &[PathBuf], source: Option<&str>) -> Result<()> {
    if source.is_some() && files.len() > 1 {
        bail!("--source can only be used with a single file");
    }

    let service = RagService::from_config(config.clone())?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("##-"),
    );

    let mut stored = 0;
    let mut skipped = 0;
    for path in files {
        let source_id = source
            .map(str::to_string)
            .unwrap_or_else(|| path.display().to_string());
        pb.set_message(source_id.clone());

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let report = service
            .ingest(&source_id, &text)
            .with_context(|| format!("failed to ingest {}", path.display()))?;

        if report.skipped {
            skipped += 1;
        }
        stored += report.chunks_stored;
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!(
        "Ingested {} file(s): {} chunk(s) stored, {} unchanged file(s) skipped.",
        files.len(),
        stored,
        skipped
    );
    Ok(())
}
