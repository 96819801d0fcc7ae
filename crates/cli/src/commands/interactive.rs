//! Interactive command handler.
//!
//! Reads queries from stdin until `exit`, `quit` or end of input.

use super::ask::{cancel_on_ctrl_c, print_result};
use clap::Args;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use triage_agent::Agent;
use triage_core::{config::AppConfig, AppResult};

/// Answer questions in a loop
#[derive(Args, Debug)]
pub struct InteractiveCommand {
    /// Output each answer as JSON
    #[arg(long)]
    pub json: bool,
}

impl InteractiveCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing interactive command");

        config.validate()?;
        let agent = Agent::from_config(config)?;

        println!("\nTriage Q&A");
        println!("Type 'exit' or 'quit' to exit\n");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            stdout.write_all(b"Enter your query: ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            let query = line.trim();
            if is_exit(query) {
                break;
            }
            if query.is_empty() {
                continue;
            }

            let cancel = CancellationToken::new();
            let watcher = cancel_on_ctrl_c(cancel.clone());
            let result = agent.process_with_cancel(query, &cancel).await;
            watcher.abort();

            if let Err(e) = print_result(&result, self.json) {
                eprintln!("Error processing query: {}", e);
            }
        }

        println!("\nExiting...");
        Ok(())
    }
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(!is_exit("exit now"));
        assert!(!is_exit(""));
    }
}
