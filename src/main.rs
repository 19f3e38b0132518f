mod collectors;
mod config;
mod db;
mod decode;
mod error;
mod models;
mod routes;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::collectors::hh::HhClient;
use crate::collectors::runner::collect;
use crate::collectors::{CollectStrategy, PageRequest};
use crate::config::{Command, Config};
use crate::models::vacancy::{PgVacancyStore, VacancyStore};
use crate::routes::AppState;
use crate::routes::api::vacancies::resolve_area;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vacancy_harvester=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_json);

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    let store = PgVacancyStore::init(pool, config.run_migrations).await?;
    let source = HhClient::new(&config.api_base_url, config.fetch_settings())?;

    match config.resolved_command() {
        Command::Serve { listen_addr } => {
            let state = AppState {
                store: Arc::new(store),
                source: Arc::new(source),
                collect: config.collect_options(CollectStrategy::Fanout),
            };
            let app = routes::router(state)
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive());

            let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
            tracing::info!("Listening on {listen_addr}");
            axum::serve(listener, app).await?;
        }
        Command::Collect {
            total,
            page,
            per_page,
            text,
            area,
            strategy,
        } => {
            let area = resolve_area(&source, area.as_deref()).await?;
            let request = PageRequest::new(page, per_page)
                .with_text(text)
                .with_area(area);
            let vacancies = collect(&source, &request, total, &config.collect_options(strategy)).await;
            let summary = store.upsert(&vacancies).await?;
            tracing::info!(
                "Collect completed: {} found, {} new, {} updated",
                summary.found,
                summary.new,
                summary.updated
            );
        }
    }

    Ok(())
}
