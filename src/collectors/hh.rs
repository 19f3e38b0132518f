use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;

use crate::collectors::{DetailError, ListingSource, PageRequest, RawDetail, SourceError};
use crate::decode::decode;

pub const DEFAULT_BASE_URL: &str = "https://api.hh.ru";

/// Timeouts and retry policy for every upstream call.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Extra attempts after the first one; applies to transport errors, 429 and 5xx only.
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
            max_retries: 0,
            retry_backoff: Duration::from_millis(500),
            user_agent: concat!("vacancy-harvester/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    items: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct AreaNode {
    id: String,
    name: String,
    #[serde(default)]
    areas: Vec<AreaNode>,
}

/// Client for the hh.ru public API.
#[derive(Debug, Clone)]
pub struct HhClient {
    client: reqwest::Client,
    base_url: String,
    settings: FetchSettings,
}

impl HhClient {
    pub fn new(base_url: impl Into<String>, settings: FetchSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            settings,
        })
    }

    /// `{base}/vacancies/{id}` with `id` escaped as a single path segment.
    fn detail_url(&self, id: &str) -> Result<Url, DetailError> {
        let mut url = Url::parse(&format!("{}/vacancies", self.base_url))
            .map_err(|e| DetailError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| DetailError::InvalidUrl(self.base_url.clone()))?
            .push(id);
        Ok(url)
    }

    /// GET with the configured retry policy. Client errors are returned as-is.
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Response, reqwest::Error> {
        let mut attempt = 0;
        loop {
            let result = self
                .client
                .get(url)
                .header("Accept", "application/json")
                .query(query)
                .send()
                .await;

            let retryable = match &result {
                Ok(resp) => {
                    resp.status() == StatusCode::TOO_MANY_REQUESTS || resp.status().is_server_error()
                }
                Err(e) => !e.is_builder(),
            };
            if !retryable || attempt >= self.settings.max_retries {
                return result;
            }

            let delay = backoff_delay(self.settings.retry_backoff, attempt);
            attempt += 1;
            tracing::debug!(url, attempt, ?delay, "Retrying upstream request");
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ListingSource for HhClient {
    async fn search(&self, request: &PageRequest) -> Result<Vec<serde_json::Value>, SourceError> {
        let mut query = vec![
            ("page", request.page.to_string()),
            ("per_page", request.per_page.to_string()),
        ];
        if let Some(text) = &request.text {
            query.push(("text", text.clone()));
        }
        if let Some(area) = &request.area {
            query.push(("area", area.clone()));
        }

        let url = format!("{}/vacancies", self.base_url);
        let resp = self.get(&url, &query).await?;
        if !resp.status().is_success() {
            return Err(SourceError::Http(resp.status().as_u16()));
        }

        let body = resp.bytes().await?;
        let decoded = decode(&body)?;
        let page: SearchResponse = serde_json::from_str(&decoded.text)?;
        Ok(page.items)
    }

    async fn detail(&self, id: &str) -> Result<RawDetail, DetailError> {
        let url = self.detail_url(id)?;
        let resp = self.get(url.as_str(), &[]).await?;
        if !resp.status().is_success() {
            return Err(DetailError::Http(resp.status().as_u16()));
        }

        let body = resp.bytes().await?;
        let decoded = decode(&body)?;
        Ok(serde_json::from_str(&decoded.text)?)
    }

    async fn resolve_area(&self, name: &str) -> Result<Option<String>, SourceError> {
        let url = format!("{}/areas", self.base_url);
        let resp = self.get(&url, &[]).await?;
        if !resp.status().is_success() {
            return Err(SourceError::Http(resp.status().as_u16()));
        }

        let body = resp.bytes().await?;
        let decoded = decode(&body)?;
        let countries: Vec<AreaNode> = serde_json::from_str(&decoded.text)?;
        Ok(find_area(&countries, name))
    }
}

/// Exponential backoff that saturates instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Search regions, then cities inside each region, case-insensitively.
/// Country names themselves are not matched.
fn find_area(countries: &[AreaNode], name: &str) -> Option<String> {
    let wanted = name.to_lowercase();
    for country in countries {
        for region in &country.areas {
            if region.name.to_lowercase() == wanted {
                return Some(region.id.clone());
            }
            if let Some(city) = region
                .areas
                .iter()
                .find(|city| city.name.to_lowercase() == wanted)
            {
                return Some(city.id.clone());
            }
        }
    }
    None
}
