use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::AppError;

/// A normalized vacancy, keyed by the source's identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vacancy {
    pub id: String,
    pub title: String,
    pub key_skills: String,
    pub experience: String,
    pub salary: String,
    pub location: String,
    pub company: String,
    pub url: String,
}

/// Outcome of a batch upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub found: i32,
    pub new: i32,
    pub updated: i32,
}

impl UpsertSummary {
    pub fn record(&mut self, was_inserted: bool) {
        self.found += 1;
        if was_inserted {
            self.new += 1;
        } else {
            self.updated += 1;
        }
    }
}

/// Keyed sink for normalized vacancies.
#[async_trait]
pub trait VacancyStore: Send + Sync {
    /// Cheap liveness check used by `/readyz`.
    async fn ping(&self) -> Result<(), AppError>;

    /// Insert each vacancy, overwriting every non-key column on id conflict.
    async fn upsert(&self, vacancies: &[Vacancy]) -> Result<UpsertSummary, AppError>;

    async fn fetch_all(&self) -> Result<Vec<Vacancy>, AppError>;
}

/// Postgres-backed store over the `vacancies` table.
#[derive(Clone)]
pub struct PgVacancyStore {
    pool: PgPool,
}

impl PgVacancyStore {
    /// Wrap the pool, creating the schema if it does not exist yet.
    pub async fn init(pool: PgPool, run_migrations: bool) -> Result<Self, AppError> {
        if run_migrations {
            tracing::info!("Running database migrations...");
            crate::db::run_migrations(&pool).await?;
            tracing::info!("Migrations complete");
        }
        Ok(Self { pool })
    }
}

impl Vacancy {
    /// Insert or overwrite one row. Returns whether it was newly inserted.
    pub async fn upsert(pool: &PgPool, vacancy: &Vacancy) -> Result<bool, AppError> {
        let (inserted,): (bool,) = sqlx::query_as(
            "INSERT INTO vacancies (id, title, key_skills, experience, salary, location, company, url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id) DO UPDATE SET
                 title = EXCLUDED.title,
                 key_skills = EXCLUDED.key_skills,
                 experience = EXCLUDED.experience,
                 salary = EXCLUDED.salary,
                 location = EXCLUDED.location,
                 company = EXCLUDED.company,
                 url = EXCLUDED.url
             RETURNING (xmax = 0) AS inserted",
        )
        .bind(&vacancy.id)
        .bind(&vacancy.title)
        .bind(&vacancy.key_skills)
        .bind(&vacancy.experience)
        .bind(&vacancy.salary)
        .bind(&vacancy.location)
        .bind(&vacancy.company)
        .bind(&vacancy.url)
        .fetch_one(pool)
        .await?;
        Ok(inserted)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Vacancy>, AppError> {
        let vacancies = sqlx::query_as::<_, Vacancy>(
            "SELECT id, title, key_skills, experience, salary, location, company, url FROM vacancies",
        )
        .fetch_all(pool)
        .await?;
        Ok(vacancies)
    }

    #[cfg(test)]
    pub async fn count(pool: &PgPool) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vacancies")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}

#[async_trait]
impl VacancyStore for PgVacancyStore {
    async fn ping(&self) -> Result<(), AppError> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn upsert(&self, vacancies: &[Vacancy]) -> Result<UpsertSummary, AppError> {
        let mut summary = UpsertSummary::default();
        for vacancy in vacancies {
            summary.record(Vacancy::upsert(&self.pool, vacancy).await?);
        }
        tracing::info!(
            found = summary.found,
            new = summary.new,
            updated = summary.updated,
            "Upserted vacancies"
        );
        Ok(summary)
    }

    async fn fetch_all(&self) -> Result<Vec<Vacancy>, AppError> {
        Vacancy::list_all(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vacancy(id: &str, salary: &str) -> Vacancy {
        Vacancy {
            id: id.to_string(),
            title: "Rust developer".to_string(),
            key_skills: "Rust, SQL".to_string(),
            experience: "От 1 года до 3 лет".to_string(),
            salary: salary.to_string(),
            location: "Москва".to_string(),
            company: "Acme".to_string(),
            url: format!("https://hh.ru/vacancy/{id}"),
        }
    }

    #[test]
    fn summary_counts_inserts_and_updates() {
        let mut summary = UpsertSummary::default();
        summary.record(true);
        summary.record(false);
        summary.record(true);
        assert_eq!(
            summary,
            UpsertSummary {
                found: 3,
                new: 2,
                updated: 1
            }
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn upserting_twice_keeps_one_row_with_latest_values(pool: PgPool) {
        let store = PgVacancyStore::init(pool.clone(), false).await.unwrap();

        let first = store.upsert(&[vacancy("42", "100000 RUR")]).await.unwrap();
        assert_eq!(first.new, 1);

        let second = store
            .upsert(&[vacancy("42", "от 120000 RUR")])
            .await
            .unwrap();
        assert_eq!(second.updated, 1);

        assert_eq!(Vacancy::count(&pool).await.unwrap(), 1);
        let rows = store.fetch_all().await.unwrap();
        assert_eq!(rows, vec![vacancy("42", "от 120000 RUR")]);
    }
}
