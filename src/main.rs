mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docent::config::DocentConfig;

#[derive(Parser)]
#[command(name = "docent", version, about = "Ask questions about your documentation")]
struct Cli {
    /// Config file (defaults to ~/.docent/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed and store text files
    Ingest {
        /// Files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Source id to record (defaults to each file's path; only valid with one file)
        #[arg(long)]
        source: Option<String>,
    },
    /// Search the corpus without involving the language model
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        /// Include neighboring chunks around each hit
        #[arg(long)]
        expand: bool,
    },
    /// Interactive conversation with the agent
    Chat,
    /// Show corpus statistics
    Stats,
    /// Delete every stored chunk
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Run database diagnostics
    Doctor,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DocentConfig::load_from(path)?,
        None => DocentConfig::load()?,
    };

    // Log to stderr so stdout carries only replies.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Ingest { files, source } => cli::ingest::ingest(&config, &files, source.as_deref()),
        Command::Search {
            query,
            top_k,
            expand,
        } => cli::search::search(&config, &query, top_k, expand),
        Command::Chat => cli::chat::chat(&config),
        Command::Stats => cli::stats::stats(&config),
        Command::Reset { yes } => cli::reset::reset(&config, yes),
        Command::Doctor => cli::doctor::doctor(&config),
    }
}
