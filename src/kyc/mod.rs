use crate::state::AppState;
use axum::Router;

mod extractors;
pub mod handlers;
pub mod services;

pub use extractors::KycVerified;

pub fn router() -> Router<AppState> {
    handlers::kyc_routes()
}
