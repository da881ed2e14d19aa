//! Persistence seam for users, accounts and the ledger.
//!
//! Lookups return `Option`: "no such row" is a normal answer, while every
//! `StoreError` means the store itself failed and the caller must abort.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Account, BalanceUpdate, LedgerEntry, NewUser, User};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait BankStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Fails with `StoreError::Conflict` when the email is taken.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    /// Sets `kyc_status = verified`; `None` when the user does not exist.
    async fn mark_kyc_verified(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_account(&self, account_number: Uuid) -> StoreResult<Option<Account>>;
    async fn find_account_by_user(&self, user_id: Uuid) -> StoreResult<Option<Account>>;
    async fn find_account_by_phone(&self, phone_number: &str) -> StoreResult<Option<Account>>;
    /// Fails with `StoreError::Conflict` on a duplicate owner or phone number.
    async fn insert_account(&self, account: &Account) -> StoreResult<()>;

    /// Writes all balance updates and the ledger entry as one unit: either
    /// everything is visible afterwards or nothing is.
    async fn commit(&self, updates: &[BalanceUpdate], entry: &LedgerEntry) -> StoreResult<()>;
    /// Appends an entry without touching balances (rejected attempts).
    async fn append_entry(&self, entry: &LedgerEntry) -> StoreResult<()>;
    /// Entries where the account is source or destination, newest first.
    async fn history(&self, account_number: Uuid) -> StoreResult<Vec<LedgerEntry>>;
}
