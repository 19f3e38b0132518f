pub mod collect;
pub mod vacancies;

use axum::Router;
use axum::routing::{get, post};

use crate::routes::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/vacancies", get(vacancies::list))
        .route("/vacancies/from_api", get(vacancies::from_api))
        .route("/vacancies/collect", post(collect::collect_and_store))
        .with_state(state);

    Router::new().nest("/api/v1", api)
}
