use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{DepositRequest, MutationResponse, TransferRequest};
use crate::{
    auth::AuthUser, error::ApiError, kyc::KycVerified, models::LedgerEntry, state::AppState,
};

pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/transaction/deposit", post(deposit))
        .route("/transaction/transfer", post(transfer))
        .route("/transaction/history", get(history))
}

#[instrument(skip(state, verified, payload), fields(user_id = %verified.0.id))]
pub async fn deposit(
    State(state): State<AppState>,
    verified: KycVerified,
    payload: Result<Json<DepositRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, ApiError> {
    let Json(req) = payload?;
    let entry = state.ledger.deposit(verified.0.id, req.amount).await?;
    Ok(Json(MutationResponse {
        message: "Deposit successful",
        transaction: entry,
    }))
}

#[instrument(skip(state, verified, payload), fields(user_id = %verified.0.id))]
pub async fn transfer(
    State(state): State<AppState>,
    verified: KycVerified,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, ApiError> {
    let Json(req) = payload?;
    let to_account = Uuid::parse_str(req.to_account.trim())
        .map_err(|_| ApiError::Validation("Invalid to_account".into()))?;
    let entry = state
        .ledger
        .transfer(verified.0.id, to_account, req.amount)
        .await?;
    Ok(Json(MutationResponse {
        message: "Transfer successful",
        transaction: entry,
    }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id, role = ?auth.role))]
pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    let account = state
        .store
        .find_account_by_user(auth.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found for user".into()))?;
    let entries = state.store.history(account.account_number).await?;
    Ok(Json(entries))
}
