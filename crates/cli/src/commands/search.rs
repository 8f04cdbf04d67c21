//! Search command handler.
//!
//! Runs a retrieval query directly against the vector index, without the
//! generation step. Useful for inspecting what the diagnosis pipeline would
//! see as reference cases.

use super::bootstrap::build_retrieval;
use clap::Args;
use opsdiag_core::{AppConfig, AppResult};

/// Search the vector index from the command line
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text (typically an alert message)
    pub query: String,

    /// Number of matches to return
    #[arg(short = 'k', long, default_value = "3")]
    pub top_k: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let retrieval = build_retrieval(config).await?;
        let matches = retrieval.search(&self.query, self.top_k).await;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&matches).unwrap_or_default()
            );
            return Ok(());
        }

        if matches.is_empty() {
            println!("No matches.");
            return Ok(());
        }

        for m in &matches {
            println!("{:.2}%  [{}] {} ({})", m.score, m.category, m.title, m.id);
            println!("       symptoms: {}", m.symptoms);
            println!("       solution: {}", m.solution);
        }

        Ok(())
    }
}
