use std::time::Duration;

use clap::Parser;

use crate::collectors::CollectStrategy;
use crate::collectors::hh::{DEFAULT_BASE_URL, FetchSettings};
use crate::collectors::pipeline::PipelineOptions;
use crate::collectors::runner::CollectOptions;

#[derive(Parser, Debug, Clone)]
#[command(name = "vacancy-harvester", about = "Collects and stores hh.ru vacancies")]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Create the vacancies table on startup if it is missing
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true", action = clap::ArgAction::Set)]
    pub run_migrations: bool,

    /// Base URL of the listings API
    #[arg(long, env = "HH_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub api_base_url: String,

    /// User-Agent sent upstream (hh.ru rejects requests without one)
    #[arg(long, env = "HH_USER_AGENT", default_value = concat!("vacancy-harvester/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// Number of pages fetched concurrently
    #[arg(long, env = "COLLECT_WORKERS", default_value = "10")]
    pub workers: usize,

    /// Currency code whose salaries are kept; others render as empty
    #[arg(long = "currency", env = "DOMESTIC_CURRENCY", default_value = "RUR")]
    pub domestic_currency: String,

    /// Drop listings whose salary renders as empty
    #[arg(long, env = "ONLY_WITH_SALARY", default_value = "false", action = clap::ArgAction::Set)]
    pub only_with_salary: bool,

    /// Per-request timeout for upstream calls, in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "15")]
    pub request_timeout_secs: u64,

    /// Connect timeout for upstream calls, in seconds
    #[arg(long, env = "CONNECT_TIMEOUT_SECS", default_value = "5")]
    pub connect_timeout_secs: u64,

    /// Extra attempts on transport errors, 429 and 5xx
    #[arg(long, env = "MAX_RETRIES", default_value = "0")]
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled on each attempt
    #[arg(long, env = "RETRY_BACKOFF_MS", default_value = "500")]
    pub retry_backoff_ms: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false", action = clap::ArgAction::Set)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the web server (default when no subcommand given)
    Serve {
        /// Listen address
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:5000")]
        listen_addr: String,
    },
    /// Collect vacancies once and upsert them into the database
    Collect {
        /// Number of vacancies wanted
        #[arg(long, default_value = "50")]
        total: usize,

        /// First page to fetch
        #[arg(long, default_value = "0")]
        page: u32,

        /// Page size, at most 100
        #[arg(long, default_value = "100")]
        per_page: u32,

        /// Free-text search filter
        #[arg(long)]
        text: Option<String>,

        /// Region or city name, resolved through the areas endpoint
        #[arg(long)]
        area: Option<String>,

        #[arg(long, value_enum, default_value_t = CollectStrategy::Fanout)]
        strategy: CollectStrategy,
    },
}

impl Config {
    /// Resolve the command, defaulting to Serve if none specified.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
        })
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            user_agent: self.user_agent.clone(),
        }
    }

    /// Collect options for the given strategy.
    pub fn collect_options(&self, strategy: CollectStrategy) -> CollectOptions {
        CollectOptions {
            strategy,
            workers: self.workers,
            pipeline: PipelineOptions {
                currency: self.domestic_currency.clone(),
                only_with_salary: self.only_with_salary,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upstream_expectations() {
        let config = Config::try_parse_from(["vacancy-harvester", "--database-url", "postgres://x"])
            .unwrap();
        assert_eq!(config.workers, 10);
        assert_eq!(config.domestic_currency, "RUR");
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
        assert!(config.run_migrations);
        assert!(!config.only_with_salary);

        let settings = config.fetch_settings();
        assert_eq!(settings.request_timeout, Duration::from_secs(15));
        assert_eq!(settings.max_retries, 0);
    }

    #[test]
    fn collect_subcommand_parses_filters() {
        let config = Config::try_parse_from([
            "vacancy-harvester",
            "--database-url",
            "postgres://x",
            "--currency",
            "KZT",
            "collect",
            "--total",
            "30",
            "--text",
            "rust",
            "--area",
            "Москва",
            "--strategy",
            "sequential",
        ])
        .unwrap();

        match config.resolved_command() {
            Command::Collect {
                total,
                per_page,
                text,
                area,
                strategy,
                ..
            } => {
                assert_eq!(total, 30);
                assert_eq!(per_page, 100);
                assert_eq!(text.as_deref(), Some("rust"));
                assert_eq!(area.as_deref(), Some("Москва"));
                assert_eq!(strategy, CollectStrategy::Sequential);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let options = config.collect_options(CollectStrategy::Sequential);
        assert_eq!(options.pipeline.currency, "KZT");
    }
}
