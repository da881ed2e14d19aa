use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use bytes::Bytes;
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{NewUser, User},
    storage::StorageClient,
    store::{BankStore, StoreError},
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Identity document as uploaded at registration.
pub struct IdentityDocument {
    pub body: Bytes,
    pub content_type: String,
}

pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub document: Option<IdentityDocument>,
}

fn ext_from_mime(ct: &str) -> &'static str {
    match ct {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

/// Validates the form, stores the identity document and creates a user with
/// KYC `pending`.
pub async fn register(
    store: &dyn BankStore,
    documents: &dyn StorageClient,
    form: Registration,
) -> Result<User, ApiError> {
    let email = normalize_email(&form.email);
    let name = form.name.trim().to_string();

    if name.is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }
    let document = form
        .document
        .filter(|d| !d.body.is_empty())
        .ok_or_else(|| ApiError::Validation("Failed to read national ID image".into()))?;

    if store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&form.password)?;

    let key = format!(
        "national_ids/{}.{}",
        Uuid::new_v4(),
        ext_from_mime(&document.content_type)
    );
    documents
        .put_object(&key, document.body, &document.content_type)
        .await?;

    let created = store
        .insert_user(NewUser {
            name,
            email,
            password_hash,
            national_id_ref: key.clone(),
        })
        .await;

    match created {
        Ok(user) => {
            info!(user_id = %user.id, email = %user.email, "user registered");
            Ok(user)
        }
        Err(e) => {
            if let Err(cleanup) = documents.delete_object(&key).await {
                warn!(error = %cleanup, %key, "orphaned identity document");
            }
            match e {
                StoreError::Conflict(_) => Err(ApiError::Conflict("Email already registered".into())),
                other => Err(other.into()),
            }
        }
    }
}

/// Returns the user when `email`/`password` match. Unknown email and wrong
/// password produce the same error.
pub async fn authenticate(
    store: &dyn BankStore,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    let email = normalize_email(email);
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    let Some(user) = store.find_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }
    Ok(user)
}

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
        assert!(!hash.contains(password));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn email_validation_and_normalization() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example@x.com"));
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}

#[cfg(test)]
mod register_tests {
    use super::*;
    use crate::models::KycStatus;
    use crate::state::FakeStorage;
    use crate::store::MemoryStore;

    fn form(email: &str) -> Registration {
        Registration {
            name: "Ada Lovelace".into(),
            email: email.into(),
            password: "analytical-engine".into(),
            document: Some(IdentityDocument {
                body: Bytes::from_static(b"\x89PNG"),
                content_type: "image/png".into(),
            }),
        }
    }

    #[tokio::test]
    async fn register_creates_pending_user_with_document_ref() {
        let store = MemoryStore::new();
        let user = register(&store, &FakeStorage, form(" Ada@Example.com "))
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.kyc_status, KycStatus::Pending);
        assert!(user.national_id_ref.starts_with("national_ids/"));
        assert!(user.national_id_ref.ends_with(".png"));
        assert_ne!(user.password_hash, "analytical-engine");
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_bad_input() {
        let store = MemoryStore::new();
        register(&store, &FakeStorage, form("ada@example.com")).await.unwrap();

        let dup = register(&store, &FakeStorage, form("ADA@example.com")).await;
        assert!(matches!(dup, Err(ApiError::Conflict(_))));

        let mut short = form("b@example.com");
        short.password = "short".into();
        assert!(matches!(
            register(&store, &FakeStorage, short).await,
            Err(ApiError::Validation(_))
        ));

        let mut no_doc = form("c@example.com");
        no_doc.document = None;
        assert!(matches!(
            register(&store, &FakeStorage, no_doc).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn register_aborts_when_duplicate_check_fails() {
        let store = MemoryStore::new();
        store.fail_reads(true);
        let res = register(&store, &FakeStorage, form("ada@example.com")).await;
        assert!(matches!(res, Err(ApiError::Internal(_))));
    }

    #[tokio::test]
    async fn authenticate_hides_which_part_was_wrong() {
        let store = MemoryStore::new();
        register(&store, &FakeStorage, form("ada@example.com")).await.unwrap();

        let ok = authenticate(&store, "ADA@example.com", "analytical-engine").await;
        assert!(ok.is_ok());

        let wrong_pw = authenticate(&store, "ada@example.com", "nope-nope-nope")
            .await
            .unwrap_err();
        let unknown = authenticate(&store, "who@example.com", "analytical-engine")
            .await
            .unwrap_err();
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
        assert!(matches!(wrong_pw, ApiError::Unauthorized(_)));
    }
}
