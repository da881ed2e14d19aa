use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::LedgerEntry;

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub to_account: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub message: &'static str,
    pub transaction: LedgerEntry,
}
