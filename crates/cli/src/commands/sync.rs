//! Sync command handler.
//!
//! Rebuilds the vector index from the knowledge store. Individual entry
//! failures are reported but do not fail the command; re-running converges.

use super::bootstrap::build_retrieval;
use clap::Args;
use opsdiag_core::{AppConfig, AppResult};
use opsdiag_knowledge::{sync_all, SqliteKnowledgeStore};

/// Rebuild the vector index from the knowledge store
#[derive(Args, Debug)]
pub struct SyncCommand {
    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl SyncCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = SqliteKnowledgeStore::open(&config.knowledge_db_path())?;
        let retrieval = build_retrieval(config).await?;

        let report = sync_all(&store, retrieval.as_ref()).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
            return Ok(());
        }

        for outcome in &report.outcomes {
            match &outcome.error {
                None => println!("synced: {} ({})", outcome.title, outcome.id),
                Some(error) => println!("failed: {} ({}): {}", outcome.title, outcome.id, error),
            }
        }
        println!(
            "Sync completed: {}/{} entries indexed, {} failed",
            report.synced, report.total, report.failed
        );

        Ok(())
    }
}
