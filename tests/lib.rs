//! Shared fixtures for the workspace integration tests.

use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, connect};
use products_crm::{NewContact, RecordStore, SeaOrmStore};
use sea_orm::DatabaseConnection;
use server::graphql::{SchemaType, build_schema};

pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub store: Arc<SeaOrmStore>,
    pub schema: SchemaType,
}

impl TestContext {
    /// Fresh in-memory sqlite database with every migration applied.
    pub async fn sqlite() -> Self {
        let conn = connect(&DatabaseSettings::new("sqlite::memory:"))
            .await
            .unwrap();
        Migrator::up(&conn, None).await.unwrap();
        let db = Arc::new(conn);
        let store = Arc::new(SeaOrmStore::new(db.clone()));
        let schema = build_schema(store.clone());
        Self { db, store, schema }
    }

    pub fn dyn_store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    pub async fn contact(&self, name: &str, email: &str) -> products_crm::Contact {
        self.store
            .create_contact(NewContact {
                name: name.into(),
                email: email.into(),
                company: Some("ACME, Inc.".into()),
                ..NewContact::default()
            })
            .await
            .unwrap()
    }
}
