//! Ask command handler.
//!
//! Answers a single query through the routing agent.

use crate::display;
use clap::Args;
use tokio_util::sync::CancellationToken;
use triage_agent::{Agent, AnswerResult};
use triage_core::{config::AppConfig, AppError, AppResult};

/// Answer one question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let query = self.query.trim();
        if query.is_empty() {
            return Err(AppError::Config("No query provided".to_string()));
        }

        config.validate()?;
        let agent = Agent::from_config(config)?;

        let cancel = CancellationToken::new();
        let watcher = cancel_on_ctrl_c(cancel.clone());

        let result = agent.process_with_cancel(query, &cancel).await;
        watcher.abort();

        print_result(&result, self.json)
    }
}

/// Cancel `token` when the user presses Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling pending generation");
            token.cancel();
        }
    })
}

/// Write a result to stdout, as JSON or as the rendered report.
pub fn print_result(result: &AnswerResult, json: bool) -> AppResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", display::render(result));
    }
    Ok(())
}
