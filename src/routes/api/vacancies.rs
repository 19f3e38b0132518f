use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::collectors::runner::collect;
use crate::collectors::{CollectStrategy, ListingSource, PageRequest};
use crate::error::AppError;
use crate::models::vacancy::Vacancy;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub total: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct FromApiQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub text: Option<String>,
    pub area: Option<String>,
    pub strategy: Option<CollectStrategy>,
}

/// GET /api/v1/vacancies
///
/// Stored vacancies. When the table is empty, seeds it from the API first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Vacancy>>, AppError> {
    let stored = state.store.fetch_all().await?;
    if !stored.is_empty() {
        return Ok(Json(stored));
    }

    let total = positive(query.total.unwrap_or(50), "total")?;
    tracing::info!(total, "Store is empty, seeding from the API");
    let request = PageRequest::new(0, total.min(u32::MAX as usize) as u32);
    let vacancies = collect(state.source.as_ref(), &request, total, &state.collect).await;
    state.store.upsert(&vacancies).await?;
    Ok(Json(vacancies))
}

/// GET /api/v1/vacancies/from_api
///
/// Live collection of `per_page` vacancies; nothing is persisted.
pub async fn from_api(
    State(state): State<AppState>,
    Query(query): Query<FromApiQuery>,
) -> Result<Json<Vec<Vacancy>>, AppError> {
    let per_page = positive(query.per_page.unwrap_or(20) as usize, "per_page")?;
    let area = resolve_area(state.source.as_ref(), query.area.as_deref()).await?;
    let request = PageRequest::new(query.page.unwrap_or(0), per_page as u32)
        .with_text(query.text)
        .with_area(area);

    let mut options = state.collect.clone();
    if let Some(strategy) = query.strategy {
        options.strategy = strategy;
    }
    let vacancies = collect(state.source.as_ref(), &request, per_page, &options).await;
    Ok(Json(vacancies))
}

/// Map an area filter to an id. Numeric input is taken as an id already.
pub async fn resolve_area(
    source: &dyn ListingSource,
    area: Option<&str>,
) -> Result<Option<String>, AppError> {
    let Some(area) = area.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(None);
    };
    if area.chars().all(|c| c.is_ascii_digit()) {
        return Ok(Some(area.to_string()));
    }

    source
        .resolve_area(area)
        .await
        .map_err(|e| AppError::Upstream(format!("Area lookup failed: {e}")))?
        .map(Some)
        .ok_or_else(|| AppError::NotFound(format!("Area '{area}' not found")))
}

pub(crate) fn positive(value: usize, field: &str) -> Result<usize, AppError> {
    if value == 0 {
        return Err(AppError::BadRequest(format!("'{field}' must be positive")));
    }
    Ok(value)
}
