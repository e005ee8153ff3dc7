use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Models;

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub models: Models,
    /// `None` when the stores are not backed by PostgreSQL (unit tests).
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        let models = Models::new(pool.clone(), config.database.query_timeout());
        Self {
            config: Arc::new(config),
            models,
            pool: Some(pool),
        }
    }

    pub fn with_models(config: AppConfig, models: Models) -> Self {
        Self {
            config: Arc::new(config),
            models,
            pool: None,
        }
    }
}
