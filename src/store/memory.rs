use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{BankStore, StoreError, StoreResult};
use crate::models::{Account, BalanceUpdate, KycStatus, LedgerEntry, NewUser, Role, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    accounts: HashMap<Uuid, Account>,
    // insertion order; history walks it backwards
    ledger: Vec<LedgerEntry>,
}

/// In-process store used when no database is configured and by tests.
///
/// `fail_reads` / `fail_writes` make every read or write return
/// `StoreError::Unavailable`, for exercising failure paths.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    /// Sum of every account balance.
    pub fn total_balance(&self) -> rust_decimal::Decimal {
        self.lock().accounts.values().map(|a| a.balance).sum()
    }

    pub fn ledger_len(&self) -> usize {
        self.lock().ledger.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // commits validate before mutating, so a poisoned lock is still consistent
        self.tables.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BankStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check_read()?;
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.check_read()?;
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        self.check_write()?;
        let mut t = self.lock();
        if t.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("users_email_key".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            national_id_ref: user.national_id_ref,
            kyc_status: KycStatus::Pending,
            role: Role::User,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn mark_kyc_verified(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check_write()?;
        let mut t = self.lock();
        Ok(t.users.get_mut(&id).map(|u| {
            u.kyc_status = KycStatus::Verified;
            u.clone()
        }))
    }

    async fn find_account(&self, account_number: Uuid) -> StoreResult<Option<Account>> {
        self.check_read()?;
        Ok(self.lock().accounts.get(&account_number).cloned())
    }

    async fn find_account_by_user(&self, user_id: Uuid) -> StoreResult<Option<Account>> {
        self.check_read()?;
        Ok(self
            .lock()
            .accounts
            .values()
            .find(|a| a.user_id == user_id)
            .cloned())
    }

    async fn find_account_by_phone(&self, phone_number: &str) -> StoreResult<Option<Account>> {
        self.check_read()?;
        Ok(self
            .lock()
            .accounts
            .values()
            .find(|a| a.phone_number == phone_number)
            .cloned())
    }

    async fn insert_account(&self, account: &Account) -> StoreResult<()> {
        self.check_write()?;
        let mut t = self.lock();
        if t.accounts.values().any(|a| a.user_id == account.user_id) {
            return Err(StoreError::Conflict("accounts_user_id_key".into()));
        }
        if t
            .accounts
            .values()
            .any(|a| a.phone_number == account.phone_number)
        {
            return Err(StoreError::Conflict("accounts_phone_number_key".into()));
        }
        t.accounts.insert(account.account_number, account.clone());
        Ok(())
    }

    async fn commit(&self, updates: &[BalanceUpdate], entry: &LedgerEntry) -> StoreResult<()> {
        self.check_write()?;
        let mut t = self.lock();
        if let Some(u) = updates.iter().find(|u| !t.accounts.contains_key(&u.account_number)) {
            return Err(StoreError::Unavailable(format!(
                "account {} missing at commit",
                u.account_number
            )));
        }
        if updates.iter().any(|u| u.balance < rust_decimal::Decimal::ZERO) {
            return Err(StoreError::Unavailable("accounts_balance_check".into()));
        }
        for u in updates {
            if let Some(a) = t.accounts.get_mut(&u.account_number) {
                a.balance = u.balance;
            }
        }
        t.ledger.push(entry.clone());
        Ok(())
    }

    async fn append_entry(&self, entry: &LedgerEntry) -> StoreResult<()> {
        self.check_write()?;
        self.lock().ledger.push(entry.clone());
        Ok(())
    }

    async fn history(&self, account_number: Uuid) -> StoreResult<Vec<LedgerEntry>> {
        self.check_read()?;
        Ok(self
            .lock()
            .ledger
            .iter()
            .rev()
            .filter(|e| e.from_account == account_number || e.to_account == account_number)
            .cloned()
            .collect())
    }
}
