use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use crate::collectors::runner::collect;
use crate::collectors::{CollectStrategy, MAX_PAGE_SIZE, PageRequest};
use crate::error::AppError;
use crate::models::vacancy::UpsertSummary;
use crate::routes::AppState;
use crate::routes::api::vacancies::{positive, resolve_area};

#[derive(Debug, Deserialize)]
pub struct CollectRequest {
    pub total: usize,
    #[serde(default)]
    pub page: u32,
    pub per_page: Option<u32>,
    pub text: Option<String>,
    pub area: Option<String>,
    pub strategy: Option<CollectStrategy>,
}

/// POST /api/v1/vacancies/collect
///
/// Collect from the API and upsert the result. Store failures abort the
/// request; upstream page failures only shrink the result.
pub async fn collect_and_store(
    State(state): State<AppState>,
    Json(input): Json<CollectRequest>,
) -> Result<Json<UpsertSummary>, AppError> {
    let total = positive(input.total, "total")?;
    let per_page = input.per_page.unwrap_or(MAX_PAGE_SIZE);
    positive(per_page as usize, "per_page")?;

    let area = resolve_area(state.source.as_ref(), input.area.as_deref()).await?;
    let request = PageRequest::new(input.page, per_page)
        .with_text(input.text)
        .with_area(area);

    let mut options = state.collect.clone();
    if let Some(strategy) = input.strategy {
        options.strategy = strategy;
    }

    let vacancies = collect(state.source.as_ref(), &request, total, &options).await;
    let summary = state.store.upsert(&vacancies).await?;
    Ok(Json(summary))
}
