use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod handlers;
pub mod jwt;
pub mod services;

pub use jwt::{AuthUser, JwtKeys};

/// Public routes: `/register`, `/login`.
pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}

/// Routes mounted under `/api`, bearer token required.
pub fn api_router() -> Router<AppState> {
    handlers::me_routes()
}
