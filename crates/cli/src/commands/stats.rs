//! Stats command handler.
//!
//! Shows knowledge base statistics.

use clap::Args;
use triage_core::{config::AppConfig, AppResult};

/// Show knowledge base statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let stats = triage_knowledge::stats(&config.workspace)?;

        if self.json {
            let output = serde_json::json!({
                "sourcesCount": stats.sources_count,
                "chunksCount": stats.chunks_count,
                "dbSizeBytes": stats.db_size_bytes,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Sources: {}", stats.sources_count);
            println!("Chunks: {}", stats.chunks_count);
            println!("Index size: {:.2} MB", megabytes(stats.db_size_bytes));
        }

        Ok(())
    }
}

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
