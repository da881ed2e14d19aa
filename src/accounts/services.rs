use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    ledger::{MAX_MONEY, MONEY_SCALE},
    models::{Account, AccountKind},
    store::{BankStore, StoreError},
};

/// Strips spaces, dashes and parentheses; `None` unless what remains is an
/// optional `+` followed by 6 to 15 digits.
pub(crate) fn normalize_phone(raw: &str) -> Option<String> {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{6,15}$").unwrap();
    }
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    PHONE_RE.is_match(&compact).then_some(compact)
}

pub struct NewAccount {
    pub initial_balance: Decimal,
    pub kind: AccountKind,
    pub phone_number: String,
}

/// Opens the caller's single account. Goes straight to the store: the account
/// number is fresh, so no mutation can race with it.
pub async fn create(
    store: &dyn BankStore,
    user_id: Uuid,
    req: NewAccount,
) -> Result<Account, ApiError> {
    if req.initial_balance < Decimal::ZERO {
        return Err(ApiError::Validation("Initial balance cannot be negative".into()));
    }
    let balance = req.initial_balance.normalize();
    if balance.scale() > MONEY_SCALE {
        return Err(ApiError::Validation(format!(
            "Initial balance has more than {MONEY_SCALE} decimal places"
        )));
    }
    if balance > MAX_MONEY {
        return Err(ApiError::Validation(format!(
            "Initial balance exceeds {MAX_MONEY}"
        )));
    }
    let phone_number = normalize_phone(&req.phone_number)
        .ok_or_else(|| ApiError::Validation("Invalid phone number".into()))?;

    // Only "no row" lets us proceed; a failed lookup aborts via `?`.
    if store.find_account_by_user(user_id).await?.is_some() {
        warn!(%user_id, "user already has an account");
        return Err(ApiError::Conflict("User already has an account".into()));
    }
    if store.find_account_by_phone(&phone_number).await?.is_some() {
        warn!(%user_id, "phone number already has an account");
        return Err(ApiError::Conflict("Phone number already has an account".into()));
    }

    let account = Account {
        account_number: Uuid::new_v4(),
        user_id,
        balance,
        account_type: req.kind,
        phone_number,
        created_at: OffsetDateTime::now_utc(),
    };
    match store.insert_account(&account).await {
        Ok(()) => {}
        Err(StoreError::Conflict(constraint)) => {
            warn!(%user_id, %constraint, "account insert lost a race");
            return Err(ApiError::Conflict("Account already exists".into()));
        }
        Err(e) => return Err(e.into()),
    }

    info!(%user_id, account = %account.account_number, kind = ?account.account_type, "account created");
    Ok(account)
}

pub async fn balance(store: &dyn BankStore, user_id: Uuid) -> Result<Account, ApiError> {
    store
        .find_account_by_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn req(balance: Decimal, phone: &str) -> NewAccount {
        NewAccount {
            initial_balance: balance,
            kind: AccountKind::Savings,
            phone_number: phone.into(),
        }
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("+1 (555) 123-4567").as_deref(), Some("+15551234567"));
        assert_eq!(normalize_phone("0712345678").as_deref(), Some("0712345678"));
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone("call me"), None);
    }

    #[tokio::test]
    async fn create_then_read_balance() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let account = create(&store, user, req(dec!(100.00), "5550100")).await.unwrap();
        assert_eq!(account.user_id, user);

        let read = balance(&store, user).await.unwrap();
        assert_eq!(read.account_number, account.account_number);
        assert_eq!(read.balance, dec!(100));
    }

    #[tokio::test]
    async fn create_rejects_negative_sub_cent_and_oversized_balances() {
        let store = MemoryStore::new();
        for bad in [dec!(-0.01), dec!(1.001), MAX_MONEY + dec!(0.01)] {
            assert!(matches!(
                create(&store, Uuid::new_v4(), req(bad, "5550100")).await,
                Err(ApiError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn create_accepts_the_largest_storable_balance() {
        let store = MemoryStore::new();
        let account = create(&store, Uuid::new_v4(), req(MAX_MONEY, "5550100")).await.unwrap();
        assert_eq!(account.balance, MAX_MONEY);
    }

    #[tokio::test]
    async fn one_account_per_user_and_per_phone() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        create(&store, user, req(dec!(0), "5550100")).await.unwrap();

        assert!(matches!(
            create(&store, user, req(dec!(0), "5550199")).await,
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            create(&store, Uuid::new_v4(), req(dec!(0), "555-0100")).await,
            Err(ApiError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn precheck_store_failure_aborts_instead_of_proceeding() {
        let store = MemoryStore::new();
        store.fail_reads(true);
        let user = Uuid::new_v4();
        let res = create(&store, user, req(dec!(10), "5550100")).await;
        assert!(matches!(res, Err(ApiError::Internal(_))));

        store.fail_reads(false);
        assert!(matches!(balance(&store, user).await, Err(ApiError::NotFound(_))));
    }
}
