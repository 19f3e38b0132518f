// Collector module.
// Defines the listing source seam and the fetch-normalize-collect pipeline on top of it.

pub mod hh;
pub mod normalize;
pub mod pipeline;
pub mod runner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::decode::DecodeError;

/// Largest `per_page` the upstream search endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// One page of a search. Built per task and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
    pub text: Option<String>,
    pub area: Option<String>,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
            text: None,
            area: None,
        }
    }

    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text.filter(|t| !t.is_empty());
        self
    }

    pub fn with_area(mut self, area: Option<String>) -> Self {
        self.area = area.filter(|a| !a.is_empty());
        self
    }

    /// Same filters, different page index.
    pub fn for_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSalary {
    pub from: Option<serde_json::Number>,
    pub to: Option<serde_json::Number>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNamed {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSnippet {
    pub requirement: Option<String>,
}

/// Typed view of one search item. Parsed per item so a bad item only drops itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawListing {
    pub id: Option<String>,
    pub name: Option<String>,
    pub salary: Option<RawSalary>,
    pub experience: Option<RawNamed>,
    pub area: Option<RawNamed>,
    pub employer: Option<RawNamed>,
    pub alternate_url: Option<String>,
    pub snippet: Option<RawSnippet>,
}

/// Per-listing detail payload; only the skill tags are used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDetail {
    #[serde(default)]
    pub key_skills: Vec<RawNamed>,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source returned HTTP {0}")]
    Http(u16),

    #[error("source request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("failed to parse source response: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DetailError {
    #[error("detail endpoint returned HTTP {0}")]
    Http(u16),

    #[error("invalid detail URL: {0}")]
    InvalidUrl(String),

    #[error("detail request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("failed to parse detail response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Pagination strategy for [`runner::collect`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CollectStrategy {
    /// Fetch a window of pages concurrently.
    #[default]
    Fanout,
    /// Fetch pages one at a time until a short page.
    Sequential,
}

/// Trait for an upstream listings API.
/// Implementations only do transport and parsing; degradation rules live in the pipeline.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one page of search items, unparsed.
    async fn search(&self, request: &PageRequest) -> Result<Vec<serde_json::Value>, SourceError>;

    /// Fetch the detail record of one listing.
    async fn detail(&self, id: &str) -> Result<RawDetail, DetailError>;

    /// Resolve a region or city name to its area id.
    async fn resolve_area(&self, name: &str) -> Result<Option<String>, SourceError>;
}
