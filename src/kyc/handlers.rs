use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;

use super::services;
use crate::{auth::AuthUser, error::ApiError, models::KycStatus, state::AppState};

#[derive(Debug, Serialize)]
pub struct KycVerifyResponse {
    pub message: &'static str,
    pub kyc_status: KycStatus,
}

#[derive(Debug, Serialize)]
pub struct KycStatusResponse {
    pub kyc_status: KycStatus,
    pub national_id: String,
}

pub fn kyc_routes() -> Router<AppState> {
    Router::new()
        .route("/kyc/verify", post(verify))
        .route("/kyc/status", get(status))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id, role = ?auth.role))]
pub async fn verify(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<KycVerifyResponse>, ApiError> {
    let user = services::submit(state.store.as_ref(), auth.id).await?;
    Ok(Json(KycVerifyResponse {
        message: "KYC verified using registered national ID",
        kyc_status: user.kyc_status,
    }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id, role = ?auth.role))]
pub async fn status(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<KycStatusResponse>, ApiError> {
    let user = services::status(state.store.as_ref(), auth.id).await?;
    Ok(Json(KycStatusResponse {
        kyc_status: user.kyc_status,
        national_id: user.national_id_ref,
    }))
}
