pub mod api;

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;

use crate::collectors::ListingSource;
use crate::collectors::runner::CollectOptions;
use crate::models::vacancy::VacancyStore;

/// Shared handler state. `collect` carries the configured defaults; handlers
/// override the strategy per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VacancyStore>,
    pub source: Arc<dyn ListingSource>,
    pub collect: CollectOptions,
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state.clone())
        .merge(api::router(state))
}
