use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{BalanceResponse, CreateAccountRequest},
    services::{self, NewAccount},
};
use crate::{auth::AuthUser, error::ApiError, models::Account, state::AppState};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/account/create", post(create_account))
        .route("/account/balance", get(get_balance))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id, role = ?auth.role))]
pub async fn create_account(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let Json(req) = payload?;
    let account = services::create(
        state.store.as_ref(),
        auth.id,
        NewAccount {
            initial_balance: req.balance,
            kind: req.account_type,
            phone_number: req.phone_number.into_string(),
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id, role = ?auth.role))]
pub async fn get_balance(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = services::balance(state.store.as_ref(), auth.id).await?;
    Ok(Json(BalanceResponse {
        account_number: account.account_number,
        balance: account.balance,
    }))
}
