use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{KycStatus, User},
    store::BankStore,
};

async fn load_user(store: &dyn BankStore, user_id: Uuid) -> Result<User, ApiError> {
    store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

/// Moves the user to `verified` using the identity document captured at
/// registration. Verified users stay verified.
pub async fn submit(store: &dyn BankStore, user_id: Uuid) -> Result<User, ApiError> {
    let user = load_user(store, user_id).await?;

    if user.national_id_ref.trim().is_empty() {
        warn!(%user_id, "kyc submitted without identity document");
        return Err(ApiError::Validation(
            "National ID not found in profile. Please update your profile.".into(),
        ));
    }
    if user.kyc_status == KycStatus::Verified {
        debug!(%user_id, "kyc already verified");
        return Ok(user);
    }

    let user = store
        .mark_kyc_verified(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    info!(%user_id, "kyc verified");
    Ok(user)
}

pub async fn status(store: &dyn BankStore, user_id: Uuid) -> Result<User, ApiError> {
    load_user(store, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::store::MemoryStore;

    async fn user_with_doc(store: &MemoryStore, doc: &str) -> Uuid {
        store
            .insert_user(NewUser {
                name: "Grace".into(),
                email: format!("{}@example.com", Uuid::new_v4()),
                password_hash: "h".into(),
                national_id_ref: doc.into(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn submit_moves_pending_to_verified_once() {
        let store = MemoryStore::new();
        let id = user_with_doc(&store, "national_ids/g.png").await;
        assert_eq!(status(&store, id).await.unwrap().kyc_status, KycStatus::Pending);

        assert_eq!(submit(&store, id).await.unwrap().kyc_status, KycStatus::Verified);
        assert_eq!(submit(&store, id).await.unwrap().kyc_status, KycStatus::Verified);
        assert_eq!(status(&store, id).await.unwrap().kyc_status, KycStatus::Verified);
    }

    #[tokio::test]
    async fn submit_requires_identity_document() {
        let store = MemoryStore::new();
        let id = user_with_doc(&store, "").await;
        assert!(matches!(submit(&store, id).await, Err(ApiError::Validation(_))));
        assert_eq!(status(&store, id).await.unwrap().kyc_status, KycStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            submit(&store, Uuid::new_v4()).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
