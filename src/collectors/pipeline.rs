use crate::collectors::normalize::{FieldError, normalize, parse_listing};
use crate::collectors::{ListingSource, PageRequest};
use crate::models::vacancy::Vacancy;

/// Per-run normalization options shared by every page task.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub currency: String,
    pub only_with_salary: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            currency: "RUR".to_string(),
            only_with_salary: false,
        }
    }
}

/// Result of one page fetch.
#[derive(Debug, Default)]
pub struct FetchedPage {
    pub vacancies: Vec<Vacancy>,
    /// Items the source returned, before any were dropped.
    pub source_items: usize,
}

/// Comma-joined skill tags for one listing. Any failure yields "".
pub async fn fetch_key_skills(source: &dyn ListingSource, id: &str) -> String {
    match source.detail(id).await {
        Ok(detail) => detail
            .key_skills
            .iter()
            .filter_map(|skill| skill.name.as_deref())
            .collect::<Vec<_>>()
            .join(", "),
        Err(e) => {
            tracing::debug!(id, "Detail lookup failed, no skills from detail: {e}");
            String::new()
        }
    }
}

async fn normalize_item(
    source: &dyn ListingSource,
    item: serde_json::Value,
    options: &PipelineOptions,
) -> Result<Vacancy, FieldError> {
    let raw = parse_listing(item)?;
    let key_skills = match raw.id.as_deref() {
        Some(id) => fetch_key_skills(source, id).await,
        None => String::new(),
    };
    normalize(&raw, &key_skills, &options.currency)
}

/// Fetch and normalize one page. A failed page is logged and comes back empty.
pub async fn fetch_page(
    source: &dyn ListingSource,
    request: &PageRequest,
    options: &PipelineOptions,
) -> FetchedPage {
    let items = match source.search(request).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(page = request.page, "Page fetch failed: {e}");
            return FetchedPage::default();
        }
    };

    let source_items = items.len();
    let mut vacancies = Vec::with_capacity(source_items);
    for item in items {
        let item_id = item.get("id").map(|id| id.to_string());
        match normalize_item(source, item, options).await {
            Ok(vacancy) if options.only_with_salary && vacancy.salary.is_empty() => {
                tracing::debug!(id = %vacancy.id, "Dropping listing without salary");
            }
            Ok(vacancy) => vacancies.push(vacancy),
            Err(e) => {
                tracing::debug!(page = request.page, id = ?item_id, "Dropping listing: {e}");
            }
        }
    }

    tracing::debug!(
        page = request.page,
        source_items,
        kept = vacancies.len(),
        "Fetched page"
    );
    FetchedPage {
        vacancies,
        source_items,
    }
}
