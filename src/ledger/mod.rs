//! The transaction core: serialized deposits and transfers plus the
//! append-only ledger they write.

use crate::state::AppState;
use axum::Router;

mod dto;
mod error;
pub mod handlers;
mod serializer;

pub use error::{positive_amount, LedgerError, MAX_MONEY, MONEY_SCALE};
pub use serializer::{Ledger, LedgerResult};

pub fn router() -> Router<AppState> {
    handlers::transaction_routes()
}
