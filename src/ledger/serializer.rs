//! Single-writer application of balance mutations.
//!
//! Every deposit and transfer goes through a [`Ledger`] handle. In
//! [`LedgerMode::Global`] one actor task owns execution and callers talk to it
//! over an mpsc inbox with a oneshot reply. In [`LedgerMode::Striped`] each
//! command locks the stripes of the accounts it touches (in ascending stripe
//! order) and runs on its own task, so commands on disjoint accounts overlap.
//!
//! Either way a command re-reads its accounts after it has exclusive access,
//! validates, then hands the new balances and the ledger entry to the store as
//! a single commit.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{credit, positive_amount, LedgerError};
use crate::config::{LedgerConfig, LedgerMode};
use crate::models::{BalanceUpdate, LedgerEntry, TransactionKind, TransactionStatus};
use crate::store::BankStore;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Clone)]
pub enum Command {
    Deposit {
        user_id: Uuid,
        amount: Decimal,
    },
    Transfer {
        user_id: Uuid,
        to_account: Uuid,
        amount: Decimal,
    },
}

struct Job {
    command: Command,
    reply: oneshot::Sender<LedgerResult<LedgerEntry>>,
}

#[derive(Clone)]
enum Dispatch {
    Actor(mpsc::Sender<Job>),
    Striped(Arc<Stripes>),
}

/// Cloneable handle to the ledger.
#[derive(Clone)]
pub struct Ledger {
    dispatch: Dispatch,
    executor: Executor,
    timeout: Duration,
}

impl Ledger {
    /// Starts the ledger. Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn BankStore>, cfg: &LedgerConfig) -> Self {
        let executor = Executor { store };
        let dispatch = match cfg.mode {
            LedgerMode::Global => {
                let (tx, rx) = mpsc::channel(cfg.queue_capacity.max(1));
                tokio::spawn(run_actor(executor.clone(), rx));
                Dispatch::Actor(tx)
            }
            LedgerMode::Striped { stripes } => Dispatch::Striped(Arc::new(Stripes::new(stripes))),
        };
        info!(mode = ?cfg.mode, timeout = ?cfg.timeout, "ledger started");
        Self {
            dispatch,
            executor,
            timeout: cfg.timeout,
        }
    }

    pub async fn deposit(&self, user_id: Uuid, amount: Decimal) -> LedgerResult<LedgerEntry> {
        let amount = positive_amount(amount)?;
        self.submit(Command::Deposit { user_id, amount }).await
    }

    pub async fn transfer(
        &self,
        user_id: Uuid,
        to_account: Uuid,
        amount: Decimal,
    ) -> LedgerResult<LedgerEntry> {
        let amount = positive_amount(amount)?;
        self.submit(Command::Transfer {
            user_id,
            to_account,
            amount,
        })
        .await
    }

    async fn submit(&self, command: Command) -> LedgerResult<LedgerEntry> {
        let pending = async {
            match &self.dispatch {
                Dispatch::Actor(inbox) => {
                    let (reply, answer) = oneshot::channel();
                    inbox
                        .send(Job { command, reply })
                        .await
                        .map_err(|_| LedgerError::Unavailable)?;
                    answer.await.map_err(|_| LedgerError::Unavailable)?
                }
                Dispatch::Striped(stripes) => {
                    let stripes = Arc::clone(stripes);
                    let executor = self.executor.clone();
                    // Spawned so that a caller giving up never interrupts a commit.
                    tokio::spawn(async move {
                        let accounts = executor.touched_accounts(&command).await?;
                        let _held = stripes.lock(&accounts).await;
                        executor.execute(command).await
                    })
                    .await
                    .map_err(|_| LedgerError::Unavailable)?
                }
            }
        };
        tokio::time::timeout(self.timeout, pending)
            .await
            .map_err(|_| LedgerError::Timeout(self.timeout))?
    }
}

async fn run_actor(executor: Executor, mut inbox: mpsc::Receiver<Job>) {
    while let Some(job) = inbox.recv().await {
        let result = executor.execute(job.command).await;
        if job.reply.send(result).is_err() {
            debug!("caller left before the ledger answered");
        }
    }
    info!("ledger actor stopped");
}

struct Stripes {
    locks: Vec<Mutex<()>>,
}

impl Stripes {
    fn new(n: usize) -> Self {
        Self {
            locks: (0..n.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    fn index(&self, account: Uuid) -> usize {
        (account.as_u128() % self.locks.len() as u128) as usize
    }

    /// Locks in ascending stripe order, so two commands can never wait on
    /// each other.
    async fn lock(&self, accounts: &[Uuid]) -> Vec<MutexGuard<'_, ()>> {
        let mut idx: Vec<usize> = accounts.iter().map(|a| self.index(*a)).collect();
        idx.sort_unstable();
        idx.dedup();
        let mut guards = Vec::with_capacity(idx.len());
        for i in idx {
            guards.push(self.locks[i].lock().await);
        }
        guards
    }
}

#[derive(Clone)]
struct Executor {
    store: Arc<dyn BankStore>,
}

impl Executor {
    /// Account numbers a command will mutate. The owner-to-account mapping
    /// never changes, so resolving it before locking is safe.
    async fn touched_accounts(&self, command: &Command) -> LedgerResult<Vec<Uuid>> {
        match command {
            Command::Deposit { user_id, .. } => {
                let account = self
                    .store
                    .find_account_by_user(*user_id)
                    .await?
                    .ok_or(LedgerError::AccountNotFound)?;
                Ok(vec![account.account_number])
            }
            Command::Transfer {
                user_id,
                to_account,
                ..
            } => {
                let sender = self
                    .store
                    .find_account_by_user(*user_id)
                    .await?
                    .ok_or(LedgerError::SenderNotFound)?;
                Ok(vec![sender.account_number, *to_account])
            }
        }
    }

    async fn execute(&self, command: Command) -> LedgerResult<LedgerEntry> {
        match command {
            Command::Deposit { user_id, amount } => self.deposit(user_id, amount).await,
            Command::Transfer {
                user_id,
                to_account,
                amount,
            } => self.transfer(user_id, to_account, amount).await,
        }
    }

    async fn deposit(&self, user_id: Uuid, amount: Decimal) -> LedgerResult<LedgerEntry> {
        let account = self
            .store
            .find_account_by_user(user_id)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;

        let balance = credit(account.balance, amount)?;
        let entry = LedgerEntry::new(
            account.account_number,
            account.account_number,
            amount,
            TransactionKind::Deposit,
            TransactionStatus::Success,
        );
        let update = BalanceUpdate {
            account_number: account.account_number,
            balance,
        };
        self.store.commit(&[update], &entry).await?;

        info!(%user_id, account = %account.account_number, %amount, %balance, "deposit applied");
        Ok(entry)
    }

    async fn transfer(
        &self,
        user_id: Uuid,
        to_account: Uuid,
        amount: Decimal,
    ) -> LedgerResult<LedgerEntry> {
        let sender = self
            .store
            .find_account_by_user(user_id)
            .await?
            .ok_or(LedgerError::SenderNotFound)?;
        if sender.account_number == to_account {
            return Err(LedgerError::SelfTransfer);
        }
        let receiver = self
            .store
            .find_account(to_account)
            .await?
            .ok_or(LedgerError::ReceiverNotFound)?;

        if sender.balance < amount {
            let rejected = LedgerEntry::new(
                sender.account_number,
                receiver.account_number,
                amount,
                TransactionKind::Transfer,
                TransactionStatus::Failed,
            );
            if let Err(e) = self.store.append_entry(&rejected).await {
                warn!(error = %e, %user_id, "failed to audit rejected transfer");
            }
            warn!(%user_id, %amount, available = %sender.balance, "transfer rejected: insufficient funds");
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: sender.balance,
            });
        }

        let receiver_balance = credit(receiver.balance, amount)?;
        let updates = [
            BalanceUpdate {
                account_number: sender.account_number,
                balance: sender.balance - amount,
            },
            BalanceUpdate {
                account_number: receiver.account_number,
                balance: receiver_balance,
            },
        ];
        let entry = LedgerEntry::new(
            sender.account_number,
            receiver.account_number,
            amount,
            TransactionKind::Transfer,
            TransactionStatus::Success,
        );
        self.store.commit(&updates, &entry).await?;

        info!(
            %user_id,
            from = %sender.account_number,
            to = %receiver.account_number,
            %amount,
            "transfer applied"
        );
        Ok(entry)
    }
}
