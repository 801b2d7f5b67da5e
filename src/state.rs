use crate::config::AppConfig;
use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;

/// Shared handles injected into every handler. The pool hands out one
/// connection per query and takes it back when the query completes.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        Ok(Self { db, config })
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    /// State whose pool never connects until a query runs. Requests that are
    /// rejected before reaching storage can be served without a database.
    pub fn fake() -> Self {
        let config = AppConfig::for_tests();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool ok");
        Self::from_parts(db, Arc::new(config))
    }

    pub fn fake_with_pool(db: PgPool) -> Self {
        Self::from_parts(db, Arc::new(AppConfig::for_tests()))
    }
}
