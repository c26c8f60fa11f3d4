use crate::auth::repo::{IdentityStore, PgIdentityStore};
use crate::config::AppConfig;
use crate::memory::MemoryStore;
use crate::projects::repo::{PgProjectStore, ProjectStore};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub identities: Arc<dyn IdentityStore>,
    pub projects: Arc<dyn ProjectStore>,
}

impl AppState {
    /// Connects to Postgres and applies migrations, or falls back to the
    /// in-memory stores when no database is configured.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let Some(db_cfg) = config.db.clone() else {
            tracing::warn!("DATABASE_URL not set; using in-memory stores, data will not persist");
            return Ok(Self::in_memory(config));
        };

        let db = PgPoolOptions::new()
            .max_connections(db_cfg.max_connections)
            .connect(&db_cfg.url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        tracing::info!("database ready");

        Ok(Self {
            config: Arc::new(config),
            identities: Arc::new(PgIdentityStore::new(db.clone())),
            projects: Arc::new(PgProjectStore::new(db)),
        })
    }

    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            config: Arc::new(config),
            identities: store.clone(),
            projects: store,
        }
    }
}
