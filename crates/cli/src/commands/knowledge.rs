//! Knowledge command handlers.
//!
//! Build and reset the workspace index.

use clap::Args;
use std::path::PathBuf;
use triage_core::{config::AppConfig, AppResult};
use triage_knowledge::LearnOptions;

/// Learn from files and directories
#[derive(Args, Debug)]
pub struct LearnCommand {
    /// Files or directories to learn from (.md, .txt)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Only learn paths containing one of these substrings
    #[arg(long)]
    pub include: Vec<String>,

    /// Skip paths containing one of these substrings
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Reset the knowledge base before learning
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl LearnCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing learn command");

        config.ensure_triage_dir()?;

        let options = LearnOptions {
            paths: self.paths.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            reset: self.reset,
        };

        let workspace = config.workspace.clone();
        let settings = config.knowledge.clone();
        let stats = tokio::task::spawn_blocking(move || {
            triage_knowledge::learn(&workspace, &options, &settings)
        })
        .await
        .map_err(|e| triage_core::AppError::Other(format!("Learn task failed: {}", e)))??;

        if self.json {
            let output = serde_json::json!({
                "sourcesCount": stats.sources_count,
                "chunksCount": stats.chunks_count,
                "bytesProcessed": stats.bytes_processed,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Learned {} sources ({} chunks, {} bytes) in {:.2}s",
                stats.sources_count, stats.chunks_count, stats.bytes_processed, stats.duration_secs
            );
        }

        Ok(())
    }
}

/// Remove everything from the knowledge base
#[derive(Args, Debug)]
pub struct CleanCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clean command");

        let cleaned = triage_knowledge::clean(&config.workspace)?;

        if self.json {
            println!("{}", serde_json::json!({ "cleaned": cleaned }));
        } else if cleaned {
            println!("Knowledge base cleaned");
        } else {
            println!("No knowledge base found");
        }

        Ok(())
    }
}
