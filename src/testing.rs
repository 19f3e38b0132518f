// In-memory fakes for the source and store seams.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::collectors::{
    DetailError, ListingSource, PageRequest, RawDetail, RawListing, RawNamed, RawSalary,
    RawSnippet, SourceError,
};
use crate::error::AppError;
use crate::models::vacancy::{UpsertSummary, Vacancy, VacancyStore};

/// A listing with every required field, priced in RUR.
pub fn raw_listing(id: &str, from: Option<i64>, to: Option<i64>) -> RawListing {
    let named = |name: &str| {
        Some(RawNamed {
            name: Some(name.to_string()),
        })
    };
    RawListing {
        id: Some(id.to_string()),
        name: Some(format!("Vacancy {id}")),
        salary: Some(RawSalary {
            from: from.map(serde_json::Number::from),
            to: to.map(serde_json::Number::from),
            currency: Some("RUR".to_string()),
        }),
        experience: named("От 1 года до 3 лет"),
        area: named("Москва"),
        employer: named("Acme"),
        alternate_url: Some(format!("https://hh.ru/vacancy/{id}")),
        snippet: Some(RawSnippet {
            requirement: Some(format!("Requirements for {id}")),
        }),
    }
}

/// `count` listings with ids `"{page}-{n}"`.
pub fn raw_page(page: u32, count: usize) -> Vec<RawListing> {
    (0..count)
        .map(|n| raw_listing(&format!("{page}-{n}"), Some(100000), None))
        .collect()
}

fn to_values(items: Vec<RawListing>) -> Vec<serde_json::Value> {
    items
        .into_iter()
        .map(|item| serde_json::to_value(item).unwrap())
        .collect()
}

#[derive(Default)]
pub struct FakeSource {
    pages: HashMap<u32, (Vec<serde_json::Value>, Option<Duration>)>,
    failing_pages: HashSet<u32>,
    skills: HashMap<String, Vec<String>>,
    areas: HashMap<String, String>,
    fail_areas: bool,
    requested: Mutex<Vec<u32>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, page: u32, items: Vec<RawListing>) -> Self {
        self.with_raw_page(page, to_values(items))
    }

    /// Serve items verbatim, including ones that do not parse as listings.
    pub fn with_raw_page(mut self, page: u32, items: Vec<serde_json::Value>) -> Self {
        self.pages.insert(page, (items, None));
        self
    }

    pub fn with_slow_page(mut self, page: u32, items: Vec<RawListing>, delay: Duration) -> Self {
        self.pages.insert(page, (to_values(items), Some(delay)));
        self
    }

    pub fn with_failing_page(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    pub fn with_skills(mut self, id: &str, skills: &[&str]) -> Self {
        self.skills
            .insert(id.to_string(), skills.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_area(mut self, name: &str, id: &str) -> Self {
        self.areas.insert(name.to_lowercase(), id.to_string());
        self
    }

    pub fn with_failing_areas(mut self) -> Self {
        self.fail_areas = true;
        self
    }

    /// Page indexes passed to `search`, in call order.
    pub fn requested_pages(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for FakeSource {
    async fn search(&self, request: &PageRequest) -> Result<Vec<serde_json::Value>, SourceError> {
        self.requested.lock().unwrap().push(request.page);
        if self.failing_pages.contains(&request.page) {
            return Err(SourceError::Http(500));
        }
        let Some((items, delay)) = self.pages.get(&request.page) else {
            return Ok(Vec::new());
        };
        if let Some(delay) = delay {
            tokio::time::sleep(*delay).await;
        }
        Ok(items.clone())
    }

    async fn detail(&self, id: &str) -> Result<RawDetail, DetailError> {
        let skills = self.skills.get(id).ok_or(DetailError::Http(404))?;
        Ok(RawDetail {
            key_skills: skills
                .iter()
                .map(|name| RawNamed {
                    name: Some(name.clone()),
                })
                .collect(),
        })
    }

    async fn resolve_area(&self, name: &str) -> Result<Option<String>, SourceError> {
        if self.fail_areas {
            return Err(SourceError::Http(503));
        }
        Ok(self.areas.get(&name.to_lowercase()).cloned())
    }
}

/// Store keyed by id with the same overwrite semantics as the Postgres one.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, Vacancy>>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get(&self, id: &str) -> Option<Vacancy> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    fn check(&self) -> Result<(), AppError> {
        if self.unavailable {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl VacancyStore for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.check()
    }

    async fn upsert(&self, vacancies: &[Vacancy]) -> Result<UpsertSummary, AppError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let mut summary = UpsertSummary::default();
        for vacancy in vacancies {
            let was_inserted = rows.insert(vacancy.id.clone(), vacancy.clone()).is_none();
            summary.record(was_inserted);
        }
        Ok(summary)
    }

    async fn fetch_all(&self) -> Result<Vec<Vacancy>, AppError> {
        self.check()?;
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let mut vacancy = Vacancy {
            id: "1".to_string(),
            title: "Rust developer".to_string(),
            key_skills: "Rust".to_string(),
            experience: "Нет опыта".to_string(),
            salary: String::new(),
            location: "Казань".to_string(),
            company: "Acme".to_string(),
            url: "https://hh.ru/vacancy/1".to_string(),
        };

        let first = store.upsert(&[vacancy.clone()]).await.unwrap();
        vacancy.salary = "от 90000 RUR".to_string();
        let second = store.upsert(&[vacancy.clone(), vacancy.clone()]).await.unwrap();

        assert_eq!(first.new, 1);
        assert_eq!(second.updated, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("1"), Some(vacancy));
    }
}
