use chrono::NaiveDate;
use outreach_core::policy::ActionType;
use sqlx::SqlitePool;

use crate::error::DbError;

/// Durable per-local-day action counters. The policy computes the day key;
/// keeping the counters in the store means daily quotas survive restarts.
#[derive(Clone)]
pub struct UsageRepository {
    pool: SqlitePool,
}

impl UsageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn used(&self, day: NaiveDate, action: ActionType) -> Result<u32, DbError> {
        let used: Option<i64> =
            sqlx::query_scalar("SELECT used FROM action_usage WHERE day = ? AND action = ?")
                .bind(day.to_string())
                .bind(action.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(used.unwrap_or(0).max(0) as u32)
    }

    pub async fn record(&self, day: NaiveDate, action: ActionType, n: u32) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO action_usage (day, action, used) VALUES (?, ?, ?)
            ON CONFLICT(day, action) DO UPDATE SET used = used + excluded.used
            "#,
        )
        .bind(day.to_string())
        .bind(action.as_str())
        .bind(n as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
