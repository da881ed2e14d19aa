use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "kyc_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Pending,
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[default]
    Savings,
    Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Failed,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    pub national_id_ref: String,
    pub kyc_status: KycStatus,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields needed to insert a user; id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub national_id_ref: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub account_number: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub account_type: AccountKind,
    pub phone_number: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// One row of the append-only ledger.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub from_account: Uuid,
    pub to_account: Uuid,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl LedgerEntry {
    pub fn new(
        from_account: Uuid,
        to_account: Uuid,
        amount: Decimal,
        kind: TransactionKind,
        status: TransactionStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_account,
            to_account,
            amount,
            kind,
            status,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// New balance for an account, written as part of a ledger commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub account_number: Uuid,
    pub balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ledger_entry_serializes_kind_as_type() {
        let a = Uuid::new_v4();
        let entry = LedgerEntry::new(
            a,
            a,
            dec!(12.50),
            TransactionKind::Deposit,
            TransactionStatus::Success,
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "deposit");
        assert_eq!(json["status"], "success");
        assert_eq!(json["amount"], "12.50");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn user_never_serializes_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            national_id_ref: "national_ids/x.png".into(),
            kyc_status: KycStatus::Pending,
            role: Role::User,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"kyc_status\":\"pending\""));
    }
}
