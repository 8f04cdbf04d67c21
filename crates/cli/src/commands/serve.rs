//! Serve command handler.
//!
//! Builds the full diagnosis stack and runs the HTTP service until killed.

use super::bootstrap::build_retrieval;
use clap::Args;
use opsdiag_core::{AppConfig, AppError, AppResult};
use opsdiag_diagnosis::{build_router, CaseStore, DiagnosisService};
use opsdiag_llm::create_client;
use std::sync::Arc;
use std::time::Duration;

/// Run the diagnosis HTTP service
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Bind address (host:port)
    #[arg(short, long)]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        config.validate()?;

        let retrieval = build_retrieval(config).await?;

        let engine = create_client(
            &config.engine.provider,
            config.engine.endpoint.as_deref(),
            config.resolve_api_key().as_deref(),
            Duration::from_secs(config.engine.timeout_secs),
        )?;

        let cases = CaseStore::open(&config.cases_db_path())?;
        let service = Arc::new(DiagnosisService::new(
            retrieval,
            engine,
            cases,
            config.engine.clone(),
        ));

        let router = build_router(service);

        let bind_addr = self.bind.as_deref().unwrap_or(&config.bind_addr);
        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", bind_addr, e)))?;

        tracing::info!("Listening on {}", bind_addr);
        println!("opsdiag listening on http://{}", bind_addr);

        axum::serve(listener, router)
            .await
            .map_err(|e| AppError::Internal(format!("HTTP server failed: {}", e)))?;

        Ok(())
    }
}
