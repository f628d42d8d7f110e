use outreach_core::{NewProspect, Prospect};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::ProspectRow;

const PROSPECT_COLUMNS: &str = "id, session_id, first_name, last_name, company, job_title, \
     profile_url, scraped_at, deleted_at";

#[derive(Clone)]
pub struct ProspectRepository {
    pool: SqlitePool,
}

impl ProspectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a scraped page of prospects, deduplicating on the platform
    /// identity within the owning session. Returns how many rows were
    /// actually new.
    pub async fn insert_batch(
        &self,
        session_id: Uuid,
        scraped: &[NewProspect],
    ) -> Result<u64, DbError> {
        let mut inserted = 0;

        for record in scraped {
            if record.profile_url.trim().is_empty() {
                continue;
            }
            let prospect = Prospect::from_scraped(session_id, record.clone());
            let row = ProspectRow::from(&prospect);

            let result = sqlx::query(
                r#"
                INSERT INTO prospects
                    (id, session_id, first_name, last_name, company, job_title, profile_url, scraped_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(session_id, profile_url) DO NOTHING
                "#,
            )
            .bind(&row.id)
            .bind(&row.session_id)
            .bind(&row.first_name)
            .bind(&row.last_name)
            .bind(&row.company)
            .bind(&row.job_title)
            .bind(&row.profile_url)
            .bind(row.scraped_at)
            .execute(&self.pool)
            .await?;

            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Prospect>, DbError> {
        let row: Option<ProspectRow> = sqlx::query_as(&format!(
            "SELECT {PROSPECT_COLUMNS} FROM prospects WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_domain()))
    }

    pub async fn find_by_session(&self, session_id: Uuid) -> Result<Vec<Prospect>, DbError> {
        let rows: Vec<ProspectRow> = sqlx::query_as(&format!(
            "SELECT {PROSPECT_COLUMNS} FROM prospects \
             WHERE session_id = ? AND deleted_at IS NULL ORDER BY scraped_at"
        ))
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    pub async fn count_for_session(&self, session_id: Uuid) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM prospects WHERE session_id = ? AND deleted_at IS NULL",
        )
        .bind(session_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
