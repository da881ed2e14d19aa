use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

/// How the ledger serializes balance mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerMode {
    /// One actor applies every command, one at a time.
    Global,
    /// Commands lock the stripes of the accounts they touch; disjoint
    /// accounts proceed in parallel.
    Striped { stripes: usize },
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub mode: LedgerMode,
    pub queue_capacity: usize,
    pub timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mode: LedgerMode::Global,
            queue_capacity: 100,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DocumentStorageConfig {
    Local {
        root: PathBuf,
    },
    S3 {
        endpoint: String,
        bucket: String,
        access_key: String,
        secret_key: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub ledger: LedgerConfig,
    pub documents: DocumentStorageConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "neobank".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "neobank-users".into()),
            ttl_hours: env_or("JWT_TTL_HOURS", 72),
        };

        let mode = match std::env::var("LEDGER_MODE").as_deref() {
            Ok("striped") => LedgerMode::Striped {
                stripes: env_or("LEDGER_STRIPES", 16usize).max(1),
            },
            Ok("global") | Err(_) => LedgerMode::Global,
            Ok(other) => bail!("unknown LEDGER_MODE {other:?}, expected global or striped"),
        };
        let ledger = LedgerConfig {
            mode,
            queue_capacity: env_or("LEDGER_QUEUE_CAPACITY", 100usize).max(1),
            timeout: Duration::from_millis(env_or("LEDGER_TIMEOUT_MS", 10_000u64)),
        };

        let documents = match std::env::var("DOCUMENT_STORAGE").as_deref() {
            Ok("s3") => DocumentStorageConfig::S3 {
                endpoint: std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT")?,
                bucket: std::env::var("MINIO_BUCKET").context("MINIO_BUCKET")?,
                access_key: std::env::var("MINIO_ACCESS_KEY").context("MINIO_ACCESS_KEY")?,
                secret_key: std::env::var("MINIO_SECRET_KEY").context("MINIO_SECRET_KEY")?,
            },
            Ok("local") | Err(_) => DocumentStorageConfig::Local {
                root: std::env::var("UPLOAD_DIR")
                    .unwrap_or_else(|_| "./uploads".into())
                    .into(),
            },
            Ok(other) => bail!("unknown DOCUMENT_STORAGE {other:?}, expected local or s3"),
        };

        Ok(Self {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            jwt,
            ledger,
            documents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_missing_or_garbage() {
        std::env::set_var("NEOBANK_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("NEOBANK_TEST_GARBAGE", 7u64), 7);
        assert_eq!(env_or("NEOBANK_TEST_MISSING_KEY", 3usize), 3);
        std::env::set_var("NEOBANK_TEST_NUMBER", "42");
        assert_eq!(env_or("NEOBANK_TEST_NUMBER", 0i64), 42);
    }

    #[test]
    fn ledger_defaults_to_global_actor() {
        let cfg = LedgerConfig::default();
        assert_eq!(cfg.mode, LedgerMode::Global);
        assert_eq!(cfg.queue_capacity, 100);
        assert_eq!(cfg.timeout, Duration::from_secs(10));
    }
}
