#![forbid(unsafe_code)]

pub mod error;
pub mod handlers;

use axum::Router;
use services::AppServices;

pub use error::ApiError;

#[derive(Clone)]
pub struct ApiState {
    pub services: AppServices,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .merge(handlers::health::routes())
        .merge(handlers::catalog::routes())
        .merge(handlers::exams::routes())
        .merge(handlers::submissions::routes())
        .with_state(state)
}
