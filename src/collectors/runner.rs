use futures::stream::{self, StreamExt};

use crate::collectors::pipeline::{PipelineOptions, fetch_page};
use crate::collectors::{CollectStrategy, ListingSource, PageRequest};
use crate::models::vacancy::Vacancy;

pub const DEFAULT_WORKERS: usize = 10;

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub strategy: CollectStrategy,
    /// Fanout window width: how many pages are fetched concurrently.
    pub workers: usize,
    pub pipeline: PipelineOptions,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            strategy: CollectStrategy::default(),
            workers: DEFAULT_WORKERS,
            pipeline: PipelineOptions::default(),
        }
    }
}

/// Collect up to `total_wanted` vacancies, starting at `base.page`.
pub async fn collect(
    source: &dyn ListingSource,
    base: &PageRequest,
    total_wanted: usize,
    options: &CollectOptions,
) -> Vec<Vacancy> {
    if total_wanted == 0 {
        return Vec::new();
    }

    let mut collected = match options.strategy {
        CollectStrategy::Fanout => fan_out(source, base, total_wanted, options).await,
        CollectStrategy::Sequential => sequential(source, base, total_wanted, options).await,
    };
    collected.truncate(total_wanted);

    tracing::info!(
        strategy = ?options.strategy,
        start_page = base.page,
        total_wanted,
        collected = collected.len(),
        "Collection finished"
    );
    collected
}

/// Fetch `workers` consecutive pages concurrently, in completion order.
/// Dropping the stream once the target is met cancels the fetches still in flight.
async fn fan_out(
    source: &dyn ListingSource,
    base: &PageRequest,
    total_wanted: usize,
    options: &CollectOptions,
) -> Vec<Vacancy> {
    let workers = options.workers.max(1);
    let requests: Vec<PageRequest> = (0..workers as u32)
        .map(|offset| base.for_page(base.page.saturating_add(offset)))
        .collect();

    let mut pages = stream::iter(requests)
        .map(|request| async move { fetch_page(source, &request, &options.pipeline).await })
        .buffer_unordered(workers);

    let mut collected = Vec::new();
    while let Some(page) = pages.next().await {
        collected.extend(page.vacancies);
        if collected.len() >= total_wanted {
            tracing::debug!(collected = collected.len(), "Target reached, cancelling remaining pages");
            break;
        }
    }
    collected
}

/// Fetch pages one by one until the target is met or a page comes back short.
async fn sequential(
    source: &dyn ListingSource,
    base: &PageRequest,
    total_wanted: usize,
    options: &CollectOptions,
) -> Vec<Vacancy> {
    let mut collected = Vec::new();
    let mut page = base.page;
    loop {
        let request = base.for_page(page);
        let fetched = fetch_page(source, &request, &options.pipeline).await;
        collected.extend(fetched.vacancies);

        if collected.len() >= total_wanted || fetched.source_items < request.per_page as usize {
            break;
        }
        match page.checked_add(1) {
            Some(next) => page = next,
            None => break,
        }
    }
    collected
}
