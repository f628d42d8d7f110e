use chrono::{Duration, Utc};
use outreach_core::{
    validate_message, CoreError, Sequence, SequenceMessage, SequenceStatus, UpdateMessageRequest,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{is_unique_violation, DbError};
use crate::models::{MessageRow, SequenceRow};

#[derive(Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        name: &str,
        description: &str,
        interval_days: i64,
    ) -> Result<Sequence, DbError> {
        if name.trim().is_empty() {
            return Err(CoreError::validation("sequence name cannot be empty").into());
        }
        if interval_days <= 0 {
            return Err(CoreError::validation("interval_days must be positive").into());
        }

        let sequence = Sequence::new(name, description, interval_days);
        let row = SequenceRow::from(&sequence);

        sqlx::query(
            "INSERT INTO sequences (id, name, description, interval_days, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.description)
        .bind(row.interval_days)
        .bind(&row.status)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        Ok(sequence)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Sequence>, DbError> {
        let row: Option<SequenceRow> = sqlx::query_as(
            "SELECT id, name, description, interval_days, status, created_at \
             FROM sequences WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_domain()))
    }

    pub async fn find_all(&self) -> Result<Vec<Sequence>, DbError> {
        let rows: Vec<SequenceRow> = sqlx::query_as(
            "SELECT id, name, description, interval_days, status, created_at \
             FROM sequences ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    /// Messages ordered by position; the k-th entry (1-based) is step k.
    pub async fn messages(&self, sequence_id: Uuid) -> Result<Vec<SequenceMessage>, DbError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, sequence_id, position, delay_hours, content \
             FROM sequence_messages WHERE sequence_id = ? ORDER BY position",
        )
        .bind(sequence_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    pub async fn add_message(
        &self,
        sequence_id: Uuid,
        position: i64,
        delay_hours: i64,
        content: &str,
    ) -> Result<SequenceMessage, DbError> {
        let sequence = self
            .find_by_id(sequence_id)
            .await?
            .ok_or(DbError::SequenceNotFound(sequence_id))?;

        let message = SequenceMessage::new(sequence.id, position, delay_hours, content)
            .map_err(DbError::Core)?;
        let row = MessageRow::from(&message);

        let result = sqlx::query(
            "INSERT INTO sequence_messages (id, sequence_id, position, delay_hours, content) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.sequence_id)
        .bind(row.position)
        .bind(row.delay_hours)
        .bind(&row.content)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(message),
            Err(err) if is_unique_violation(&err) => Err(CoreError::validation(format!(
                "position {} is already used in this sequence",
                position
            ))
            .into()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update_message(
        &self,
        message_id: Uuid,
        update: &UpdateMessageRequest,
    ) -> Result<SequenceMessage, DbError> {
        let row: Option<MessageRow> = sqlx::query_as(
            "SELECT id, sequence_id, position, delay_hours, content \
             FROM sequence_messages WHERE id = ?",
        )
        .bind(message_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        let mut message = row
            .ok_or(DbError::MessageNotFound(message_id))?
            .into_domain();

        if let Some(delay_hours) = update.delay_hours {
            message.delay_hours = delay_hours;
        }
        if let Some(ref content) = update.content {
            message.content = content.clone();
        }
        validate_message(message.position, message.delay_hours, &message.content)
            .map_err(DbError::Core)?;

        sqlx::query("UPDATE sequence_messages SET delay_hours = ?, content = ? WHERE id = ?")
            .bind(message.delay_hours)
            .bind(&message.content)
            .bind(message_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(message)
    }

    pub async fn delete_message(&self, message_id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM sequence_messages WHERE id = ?")
            .bind(message_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Activate a draft sequence. Requires at least one message; pending
    /// enrollments become active with their first step scheduled from now.
    pub async fn activate(&self, id: Uuid) -> Result<Sequence, DbError> {
        let messages = self.messages(id).await?;

        let mut tx = self.pool.begin().await?;

        let status: Option<String> = sqlx::query_scalar("SELECT status FROM sequences WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let status = status.ok_or(DbError::SequenceNotFound(id))?;

        if SequenceStatus::parse(&status) != Some(SequenceStatus::Draft) {
            return Err(CoreError::InvalidTransition {
                entity: "sequence",
                from: status,
                event: "activate".to_string(),
            }
            .into());
        }
        let first = messages.first().ok_or_else(|| {
            DbError::Core(CoreError::precondition(
                "cannot activate a sequence without messages",
            ))
        })?;

        sqlx::query("UPDATE sequences SET status = 'active' WHERE id = ? AND status = 'draft'")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        let first_due = (Utc::now() + Duration::hours(first.delay_hours)).timestamp();
        sqlx::query(
            "UPDATE enrollments SET status = 'active', next_due_at = COALESCE(next_due_at, ?) \
             WHERE sequence_id = ? AND status = 'pending'",
        )
        .bind(first_due)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_by_id(id).await?.ok_or(DbError::SequenceNotFound(id))
    }

    /// Pause sending for the whole sequence. Active enrollments are parked
    /// without touching `current_step` or `next_due_at`.
    pub async fn pause(&self, id: Uuid) -> Result<Sequence, DbError> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("UPDATE sequences SET status = 'paused' WHERE id = ? AND status = 'active'")
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return self.reject_transition(id, "pause").await;
        }

        sqlx::query(
            "UPDATE enrollments SET status = 'paused' WHERE sequence_id = ? AND status = 'active'",
        )
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_by_id(id).await?.ok_or(DbError::SequenceNotFound(id))
    }

    /// Resume a paused sequence; parked enrollments pick up exactly where
    /// they left off. Prospects enrolled while the sequence was paused sat
    /// in `pending` and get their first step scheduled now.
    pub async fn resume(&self, id: Uuid) -> Result<Sequence, DbError> {
        let messages = self.messages(id).await?;

        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("UPDATE sequences SET status = 'active' WHERE id = ? AND status = 'paused'")
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return self.reject_transition(id, "resume").await;
        }

        sqlx::query(
            "UPDATE enrollments SET status = 'active' WHERE sequence_id = ? AND status = 'paused'",
        )
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        if let Some(first) = messages.first() {
            let first_due = (Utc::now() + Duration::hours(first.delay_hours)).timestamp();
            sqlx::query(
                "UPDATE enrollments SET status = 'active', next_due_at = COALESCE(next_due_at, ?) \
                 WHERE sequence_id = ? AND status = 'pending'",
            )
            .bind(first_due)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_by_id(id).await?.ok_or(DbError::SequenceNotFound(id))
    }

    /// Cascade delete: messages and enrollments go with the sequence.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM sequences WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reject_transition(
        &self,
        id: Uuid,
        event: &'static str,
    ) -> Result<Sequence, DbError> {
        let current = self
            .find_by_id(id)
            .await?
            .ok_or(DbError::SequenceNotFound(id))?;
        Err(CoreError::InvalidTransition {
            entity: "sequence",
            from: current.status.as_str().to_string(),
            event: event.to_string(),
        }
        .into())
    }
}
