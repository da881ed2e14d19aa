use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, FromRef, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterResponse},
        jwt::{AuthUser, JwtKeys},
        services::{self, IdentityDocument, Registration},
    },
    error::ApiError,
    state::AppState,
};

/// Identity documents up to 10 MiB, plus room for the text fields.
const REGISTER_BODY_LIMIT: usize = 10 * 1024 * 1024 + 64 * 1024;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            post(register).layer(DefaultBodyLimit::max(REGISTER_BODY_LIMIT)),
        )
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn bad_form(e: MultipartError) -> ApiError {
    ApiError::Validation(e.body_text())
}

#[instrument(skip(state, mp))]
pub async fn register(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let mut form = Registration {
        name: String::new(),
        email: String::new(),
        password: String::new(),
        document: None,
    };

    while let Some(field) = mp.next_field().await.map_err(bad_form)? {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("name") => form.name = field.text().await.map_err(bad_form)?,
            Some("email") => form.email = field.text().await.map_err(bad_form)?,
            Some("password") => form.password = field.text().await.map_err(bad_form)?,
            Some("national_id") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field.bytes().await.map_err(bad_form)?;
                form.document = Some(IdentityDocument { body, content_type });
            }
            _ => {}
        }
    }

    let user = services::register(state.store.as_ref(), state.documents.as_ref(), form).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully!",
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload?;
    let user = services::authenticate(state.store.as_ref(), &payload.email, &payload.password).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, user.role)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse { token }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id, role = ?auth.role))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .store
        .find_user(auth.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    Ok(Json(user.into()))
}
