//! Check command handler.
//!
//! Reports whether the environment is ready to answer queries.

use clap::Args;
use triage_core::{config::AppConfig, AppResult};

/// Check the environment setup
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CheckCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing check command");

        let api_key_set = config.resolve_api_key(&config.provider).is_some();
        let index_exists = triage_knowledge::index_path(&config.workspace).exists();
        let validation = config.validate().err().map(|e| e.to_string());

        if self.json {
            let output = serde_json::json!({
                "provider": config.provider,
                "model": config.model,
                "apiKeySet": api_key_set,
                "workspace": config.workspace,
                "indexExists": index_exists,
                "configError": validation,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("\nEnvironment Check:");
            println!("Provider: {} ({})", config.provider, config.model);
            println!("API Key: {}", if api_key_set { "Set" } else { "Not Set" });
            println!("Workspace: {}", config.workspace.display());
            println!(
                "Knowledge Base: {}",
                if index_exists { "Exists" } else { "Not Found" }
            );
            match validation {
                Some(error) => println!("Configuration: {}", error),
                None => println!("Configuration: OK"),
            }
        }

        Ok(())
    }
}
