//! CRM service: GraphQL over a record store, served by axum.

pub mod config;
pub mod graphql;
pub mod http;
pub mod seed;

use std::sync::Arc;

use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use platform_db::connect;
use products_crm::{MemoryStore, RecordStore, SeaOrmStore};
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::{AppConfig, StoreKind};

/// The selected store plus the connection behind it, if any.
pub struct Backend {
    pub store: Arc<dyn RecordStore>,
    pub db: Option<Arc<DatabaseConnection>>,
}

/// Opens the configured store. The database store is migrated first; the
/// memory store starts out with demo data.
pub async fn open_backend(config: &AppConfig) -> Result<Backend> {
    match config.store {
        StoreKind::Database => {
            let db = Arc::new(connect(&config.database).await?);
            Migrator::up(db.as_ref(), None).await?;
            info!("database store ready");
            Ok(Backend {
                store: Arc::new(SeaOrmStore::new(db.clone())),
                db: Some(db),
            })
        }
        StoreKind::Memory => {
            let store = Arc::new(MemoryStore::new());
            seed::seed_demo(store.as_ref()).await?;
            info!("memory store ready");
            Ok(Backend { store, db: None })
        }
    }
}
