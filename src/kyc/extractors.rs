use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{KycStatus, User},
    state::AppState,
};

/// Authenticated caller whose KYC status is `verified`.
///
/// Runs before any body extractor, so an unverified caller is turned away
/// before the request body is looked at.
pub struct KycVerified(pub User);

#[async_trait]
impl FromRequestParts<AppState> for KycVerified {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let user = state
            .store
            .find_user(auth.id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

        if user.kyc_status != KycStatus::Verified {
            warn!(user_id = %user.id, "kyc not verified");
            return Err(ApiError::Forbidden("KYC not verified".into()));
        }
        Ok(KycVerified(user))
    }
}
