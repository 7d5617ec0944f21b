//! CLI `chat` command: a line-oriented conversation with the agent.

use anyhow::Result;
use std::io::{BufRead, Write};

use docent::config::DocentConfig;
use docent::error::RagError;
use docent::service::RagService;

const CONVERSATION: &str = "cli";

pub fn chat(config: &DocentConfig) -> Result<()> {
    let service = RagService::from_config(config.clone())?;

    println!("Ask a question. /clear resets the conversation, /quit exits.");
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                service.clear_history(CONVERSATION)?;
                println!("Conversation cleared.");
                continue;
            }
            _ => {}
        }

        match service.chat(CONVERSATION, input) {
            Ok(reply) => println!("\n{reply}"),
            Err(err) => println!("\n{}", turn_error_message(&err)),
        }
    }

    Ok(())
}

/// A failed turn is reported and the session goes on.
fn turn_error_message(err: &RagError) -> String {
    if err.is_connectivity() {
        format!("Could not reach a required service: {err}")
    } else {
        format!("That turn failed: {err}")
    }
}
