use chrono::{DateTime, Duration, Utc};
use outreach_core::{
    ConnectionStatus, Enrollment, EnrollmentFailure, EnrollmentReport, EnrollmentStatus,
    SequenceStatus,
};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{datetime_to_timestamp, EnrollmentRow};

const ENROLLMENT_COLUMNS: &str = "id, sequence_id, prospect_id, current_step, status, \
     connection_status, send_attempts, next_due_at, enrolled_at";

#[derive(Clone)]
pub struct EnrollmentRepository {
    pool: SqlitePool,
}

impl EnrollmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Batch-enroll prospects into a sequence.
    ///
    /// Already-enrolled prospects are skipped silently (idempotent);
    /// unknown or deleted prospects are reported as failures. The batch is
    /// never all-or-nothing.
    pub async fn enroll(
        &self,
        sequence_id: Uuid,
        prospect_ids: &[Uuid],
    ) -> Result<EnrollmentReport, DbError> {
        let sequence_row: Option<(String,)> =
            sqlx::query_as("SELECT status FROM sequences WHERE id = ?")
                .bind(sequence_id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        let sequence_status = sequence_row
            .and_then(|(s,)| SequenceStatus::parse(&s))
            .ok_or(DbError::SequenceNotFound(sequence_id))?;

        // Step 1 spacing, for seeding next_due_at on active sequences.
        let first_delay: Option<i64> = sqlx::query_scalar(
            "SELECT delay_hours FROM sequence_messages \
             WHERE sequence_id = ? ORDER BY position LIMIT 1",
        )
        .bind(sequence_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let sequence_active = sequence_status == SequenceStatus::Active;

        let mut report = EnrollmentReport {
            success_count: 0,
            failures: Vec::new(),
        };

        for prospect_id in prospect_ids {
            let known: Option<(String,)> = sqlx::query_as(
                "SELECT id FROM prospects WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(prospect_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
            if known.is_none() {
                report.failures.push(EnrollmentFailure {
                    prospect_id: *prospect_id,
                    reason: "prospect not found".to_string(),
                });
                continue;
            }

            let mut enrollment = Enrollment::new(sequence_id, *prospect_id);
            if sequence_active {
                enrollment.status = EnrollmentStatus::Active;
                enrollment.next_due_at =
                    first_delay.map(|hours| enrollment.enrolled_at + Duration::hours(hours));
            }
            let row = EnrollmentRow::from(&enrollment);

            let result = sqlx::query(
                r#"
                INSERT INTO enrollments
                    (id, sequence_id, prospect_id, current_step, status, connection_status, send_attempts, next_due_at, enrolled_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(sequence_id, prospect_id) DO NOTHING
                "#,
            )
            .bind(&row.id)
            .bind(&row.sequence_id)
            .bind(&row.prospect_id)
            .bind(row.current_step)
            .bind(&row.status)
            .bind(&row.connection_status)
            .bind(row.send_attempts)
            .bind(row.next_due_at)
            .bind(row.enrolled_at)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() > 0 {
                report.success_count += 1;
            } else {
                debug!(
                    sequence_id = %sequence_id,
                    prospect_id = %prospect_id,
                    "Prospect already enrolled, skipping"
                );
            }
        }

        Ok(report)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Enrollment>, DbError> {
        let row: Option<EnrollmentRow> = sqlx::query_as(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_domain()))
    }

    pub async fn find_by_sequence(&self, sequence_id: Uuid) -> Result<Vec<Enrollment>, DbError> {
        let rows: Vec<EnrollmentRow> = sqlx::query_as(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments \
             WHERE sequence_id = ? ORDER BY enrolled_at"
        ))
        .bind(sequence_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    /// Enrollments ready for a send: active, in an active sequence, due at
    /// or before `now`. Oldest due first, so starved enrollments win over
    /// recently scheduled ones.
    pub async fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Enrollment>, DbError> {
        let rows: Vec<EnrollmentRow> = sqlx::query_as(
            r#"
            SELECT e.id, e.sequence_id, e.prospect_id, e.current_step, e.status,
                   e.connection_status, e.send_attempts, e.next_due_at, e.enrolled_at
            FROM enrollments e
            JOIN sequences s ON s.id = e.sequence_id
            WHERE e.status = 'active'
              AND s.status = 'active'
              AND e.next_due_at IS NOT NULL
              AND e.next_due_at <= ?
            ORDER BY e.next_due_at ASC
            LIMIT ?
            "#,
        )
        .bind(datetime_to_timestamp(now))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    /// Record a successful send, optimistically guarded on the step the
    /// send was decided against. Returns false when a concurrent pass won
    /// the race, in which case the caller must not count the send as
    /// applied twice.
    pub async fn advance(
        &self,
        id: Uuid,
        expected_step: i64,
        next_due_at: Option<DateTime<Utc>>,
        completed: bool,
    ) -> Result<bool, DbError> {
        let status = if completed {
            EnrollmentStatus::Completed
        } else {
            EnrollmentStatus::Active
        };

        let result = sqlx::query(
            "UPDATE enrollments \
             SET current_step = current_step + 1, status = ?, next_due_at = ?, send_attempts = 0 \
             WHERE id = ? AND status = 'active' AND current_step = ?",
        )
        .bind(status.as_str())
        .bind(next_due_at.map(datetime_to_timestamp))
        .bind(id.to_string())
        .bind(expected_step)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Transient-failure push-back: only the due time moves and the
    /// attempt counter grows, so the send is retried later and the caller
    /// can bound how often. Returns the updated attempt count.
    pub async fn defer(&self, id: Uuid, until: DateTime<Utc>) -> Result<i64, DbError> {
        sqlx::query(
            "UPDATE enrollments SET next_due_at = ?, send_attempts = send_attempts + 1 \
             WHERE id = ? AND status = 'active'",
        )
        .bind(datetime_to_timestamp(until))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        let attempts: Option<i64> =
            sqlx::query_scalar("SELECT send_attempts FROM enrollments WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        Ok(attempts.unwrap_or(0))
    }

    /// Reschedule without touching the attempt counter (pause gates,
    /// invitation grace periods).
    pub async fn reschedule(&self, id: Uuid, until: DateTime<Utc>) -> Result<(), DbError> {
        sqlx::query("UPDATE enrollments SET next_due_at = ? WHERE id = ? AND status = 'active'")
            .bind(datetime_to_timestamp(until))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Permanent failure: no further attempts for this enrollment.
    pub async fn mark_failed(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query("UPDATE enrollments SET status = 'failed', next_due_at = NULL WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_connection_status(
        &self,
        id: Uuid,
        status: ConnectionStatus,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE enrollments SET connection_status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn remove(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
