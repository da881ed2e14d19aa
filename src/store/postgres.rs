use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{BankStore, StoreError, StoreResult};
use crate::models::{Account, BalanceUpdate, LedgerEntry, NewUser, User};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, national_id_ref, kyc_status, role, created_at";
const ACCOUNT_COLUMNS: &str =
    "account_number, user_id, balance, account_type, phone_number, created_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_unique(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl BankStore for PgStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, national_id_ref)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.national_id_ref)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique)
    }

    async fn mark_kyc_verified(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET kyc_status = 'verified'
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_account(&self, account_number: Uuid) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = $1"
        ))
        .bind(account_number)
        .fetch_optional(&self.db)
        .await?;
        Ok(account)
    }

    async fn find_account_by_user(&self, user_id: Uuid) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(account)
    }

    async fn find_account_by_phone(&self, phone_number: &str) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE phone_number = $1"
        ))
        .bind(phone_number)
        .fetch_optional(&self.db)
        .await?;
        Ok(account)
    }

    async fn insert_account(&self, account: &Account) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (account_number, user_id, balance, account_type, phone_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.account_number)
        .bind(account.user_id)
        .bind(account.balance)
        .bind(account.account_type)
        .bind(&account.phone_number)
        .bind(account.created_at)
        .execute(&self.db)
        .await
        .map_err(map_unique)?;
        Ok(())
    }

    async fn commit(&self, updates: &[BalanceUpdate], entry: &LedgerEntry) -> StoreResult<()> {
        // Dropping `tx` before commit rolls everything back.
        let mut tx = self.db.begin().await?;
        for u in updates {
            let done = sqlx::query("UPDATE accounts SET balance = $2 WHERE account_number = $1")
                .bind(u.account_number)
                .bind(u.balance)
                .execute(&mut *tx)
                .await?;
            if done.rows_affected() != 1 {
                return Err(sqlx::Error::RowNotFound.into());
            }
        }
        insert_entry(&mut *tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn append_entry(&self, entry: &LedgerEntry) -> StoreResult<()> {
        insert_entry(&self.db, entry).await
    }

    async fn history(&self, account_number: Uuid) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, from_account, to_account, amount, kind, status, timestamp
            FROM transactions
            WHERE from_account = $1 OR to_account = $1
            ORDER BY timestamp DESC
            "#,
        )
        .bind(account_number)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

async fn insert_entry<'e, E>(executor: E, entry: &LedgerEntry) -> StoreResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO transactions (id, from_account, to_account, amount, kind, status, timestamp)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(entry.id)
    .bind(entry.from_account)
    .bind(entry.to_account)
    .bind(entry.amount)
    .bind(entry.kind)
    .bind(entry.status)
    .bind(entry.timestamp)
    .execute(executor)
    .await?;
    Ok(())
}
