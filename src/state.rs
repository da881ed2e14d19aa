use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use sqlx::postgres::PgPoolOptions;

use crate::config::{AppConfig, DocumentStorageConfig, JwtConfig, LedgerConfig};
use crate::ledger::Ledger;
use crate::storage::{self, StorageClient};
use crate::store::{BankStore, MemoryStore, PgStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BankStore>,
    pub config: Arc<AppConfig>,
    pub documents: Arc<dyn StorageClient>,
    pub ledger: Ledger,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn BankStore> = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                Arc::new(PgStore::new(db))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory store, data is not persisted");
                Arc::new(MemoryStore::new())
            }
        };

        let documents: Arc<dyn StorageClient> =
            Arc::from(storage::from_config(&config.documents).await?);

        Ok(Self::from_parts(store, config, documents))
    }

    /// Wires the parts together and starts the ledger.
    pub fn from_parts(
        store: Arc<dyn BankStore>,
        config: Arc<AppConfig>,
        documents: Arc<dyn StorageClient>,
    ) -> Self {
        let ledger = Ledger::spawn(store.clone(), &config.ledger);
        Self {
            store,
            config,
            documents,
            ledger,
        }
    }

    /// In-memory state with a throwaway document store. Needs a tokio runtime.
    pub fn fake() -> Self {
        Self::fake_with(Arc::new(MemoryStore::new()), LedgerConfig::default())
    }

    pub fn fake_with(store: Arc<dyn BankStore>, ledger: LedgerConfig) -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            db_max_connections: 1,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_hours: 72,
            },
            ledger,
            documents: DocumentStorageConfig::Local {
                root: std::env::temp_dir(),
            },
        });
        Self::from_parts(store, config, Arc::new(FakeStorage))
    }
}

/// Accepts and forgets every object.
#[derive(Clone)]
pub struct FakeStorage;

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, _k: &str, _b: Bytes, _ct: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn delete_object(&self, _k: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
