//! Application context
//!
//! Owns the resources shared by every request: the generation client, the
//! pipeline built around it and the database pool. The pool is created on
//! first use and closed by `shutdown`.

use crate::config::AppConfig;
use crate::db::{init_pool, DbPool, PgExecutor, QueryExecutor};
use crate::error::{InsightsError, Result};
use crate::llm::{LlmClient, TextGenerator};
use crate::pipeline::Pipeline;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

pub struct AppContext {
    config: AppConfig,
    pipeline: Arc<Pipeline>,
    pool: OnceCell<DbPool>,
}

impl AppContext {
    pub fn init(config: AppConfig) -> Result<Self> {
        let client = LlmClient::new(&config.llm)?;
        info!(
            "Using model {} at {} ({} strategy)",
            client.model(),
            config.llm.base_url,
            config.pipeline.strategy
        );
        Ok(Self::with_generator(config, Arc::new(client)))
    }

    /// Build the context around an existing generator.
    pub fn with_generator(config: AppConfig, generator: Arc<dyn TextGenerator>) -> Self {
        let pipeline = Arc::new(Pipeline::new(generator, config.pipeline.clone()));
        Self {
            config,
            pipeline,
            pool: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pipeline(&self) -> Arc<Pipeline> {
        Arc::clone(&self.pipeline)
    }

    /// Read-only executor over the shared pool, connecting on first call.
    pub async fn executor(&self) -> Result<Arc<dyn QueryExecutor>> {
        let database = self.config.database.as_ref().ok_or_else(|| {
            InsightsError::Config(
                "No database configured (set DATABASE_URL or DB_HOST/DB_NAME/DB_USER/DB_PASSWORD)".to_string(),
            )
        })?;
        let pool = self.pool.get_or_try_init(|| init_pool(database)).await?;
        Ok(Arc::new(PgExecutor::new(pool.clone())))
    }

    pub async fn shutdown(&self) {
        if let Some(pool) = self.pool.get() {
            info!("Closing database pool");
            pool.close().await;
        }
    }
}
