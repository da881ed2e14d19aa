use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("cannot transfer to your own account")]
    SelfTransfer,

    #[error("account not found")]
    AccountNotFound,

    #[error("sender account not found")]
    SenderNotFound,

    #[error("receiver account not found")]
    ReceiverNotFound,

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("ledger did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("ledger is not running")]
    Unavailable,
}

/// Money has at most two fractional digits.
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a `NUMERIC(20, 2)` column holds: 999_999_999_999_999_999.99.
pub const MAX_MONEY: Decimal =
    Decimal::from_parts(1_661_992_959, 1_808_227_885, 5, false, MONEY_SCALE);

/// Checks that `amount` is strictly positive, representable in cents and
/// storable.
pub fn positive_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    let amount = amount.normalize();
    if amount.scale() > MONEY_SCALE {
        return Err(LedgerError::InvalidAmount(format!(
            "amount has more than {MONEY_SCALE} decimal places: {amount}"
        )));
    }
    if amount > MAX_MONEY {
        return Err(LedgerError::InvalidAmount(format!(
            "amount exceeds {MAX_MONEY}: {amount}"
        )));
    }
    Ok(amount)
}

/// `balance + amount`, refused when the result would not fit in storage.
pub fn credit(balance: Decimal, amount: Decimal) -> Result<Decimal, LedgerError> {
    balance
        .checked_add(amount)
        .filter(|b| *b <= MAX_MONEY)
        .ok_or_else(|| LedgerError::InvalidAmount(format!("balance would exceed {MAX_MONEY}")))
}
