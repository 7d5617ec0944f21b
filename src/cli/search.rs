use anyhow::Result;

use docent::config::DocentConfig;
use docent::service::RagService;

/// Run a search from the terminal and print what the agent's tool would see.
pub fn search(config: &DocentConfig, query: &str, top_k: Option<usize>, expand: bool) -> Result<()> {
    let service = RagService::from_config(config.clone())?;
    let output = service.search(query, top_k, expand)?;
    println!("{output}");
    Ok(())
}
