use chrono::Utc;
use outreach_core::{machine, CoreError, ScrapeSession, SessionEvent};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::SessionRow;

const SESSION_COLUMNS: &str = "id, name, source_url, status, current_page, \
     scraped_prospects_count, total_prospects_count, last_prospect_name, \
     started_at, ended_at, deleted_at";

#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new session in `initializing`.
    ///
    /// The conditional INSERT is the active-session exclusivity claim: it
    /// inserts nothing while another session is `running` or `paused`, so
    /// concurrent creators race on a single atomic statement instead of a
    /// read-then-write.
    pub async fn create(&self, name: &str, source_url: &str) -> Result<ScrapeSession, DbError> {
        if source_url.trim().is_empty() {
            return Err(CoreError::validation("source_url cannot be empty").into());
        }

        let session = ScrapeSession::new(name, source_url);
        let row = SessionRow::from(&session);

        let result = sqlx::query(
            r#"
            INSERT INTO sessions (id, name, source_url, status, current_page, scraped_prospects_count, started_at)
            SELECT ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM sessions
                WHERE status IN ('running', 'paused') AND deleted_at IS NULL
            )
            "#,
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.source_url)
        .bind(&row.status)
        .bind(row.current_page)
        .bind(row.scraped_prospects_count)
        .bind(row.started_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::validation("another session is already active").into());
        }

        Ok(session)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ScrapeSession>, DbError> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_domain()))
    }

    pub async fn find_all(&self) -> Result<Vec<ScrapeSession>, DbError> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE deleted_at IS NULL ORDER BY started_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    /// Sessions holding the active slot (`running` or `paused`).
    pub async fn find_active(&self) -> Result<Vec<ScrapeSession>, DbError> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE status IN ('running', 'paused') AND deleted_at IS NULL \
             ORDER BY started_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    /// Apply a lifecycle event and return the post-mutation session.
    ///
    /// The UPDATE is guarded on the status the event was validated
    /// against, so two racing transitions can never both apply; a guard
    /// miss caused by a benign concurrent writer is retried once against
    /// the fresh status.
    pub async fn transition(
        &self,
        id: Uuid,
        event: SessionEvent,
    ) -> Result<ScrapeSession, DbError> {
        for _ in 0..2 {
            let current = self
                .find_by_id(id)
                .await?
                .ok_or(DbError::SessionNotFound(id))?;
            let next = machine::apply(current.status, event).map_err(DbError::Core)?;

            let ended_at = next.is_terminal().then(|| Utc::now().timestamp());

            let result = if event == SessionEvent::Start {
                // Entering `running` re-checks the exclusive slot: crash
                // recovery can leave a paused session while an older
                // initializing one still exists.
                sqlx::query(
                    r#"
                    UPDATE sessions SET status = ?
                    WHERE id = ? AND status = ?
                    AND NOT EXISTS (
                        SELECT 1 FROM sessions
                        WHERE status IN ('running', 'paused') AND deleted_at IS NULL AND id != ?
                    )
                    "#,
                )
                .bind(next.as_str())
                .bind(id.to_string())
                .bind(current.status.as_str())
                .bind(id.to_string())
                .execute(&self.pool)
                .await?
            } else {
                sqlx::query(
                    "UPDATE sessions SET status = ?, ended_at = COALESCE(?, ended_at) \
                     WHERE id = ? AND status = ?",
                )
                .bind(next.as_str())
                .bind(ended_at)
                .bind(id.to_string())
                .bind(current.status.as_str())
                .execute(&self.pool)
                .await?
            };

            if result.rows_affected() > 0 {
                return self
                    .find_by_id(id)
                    .await?
                    .ok_or(DbError::SessionNotFound(id));
            }

            if event == SessionEvent::Start {
                let occupied: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM sessions \
                     WHERE status IN ('running', 'paused') AND deleted_at IS NULL AND id != ?",
                )
                .bind(id.to_string())
                .fetch_one(&self.pool)
                .await?;
                if occupied > 0 {
                    return Err(
                        CoreError::precondition("another session is already active").into(),
                    );
                }
            }
        }

        // Still losing after a retry: report against whatever the status
        // is now.
        let current = self
            .find_by_id(id)
            .await?
            .ok_or(DbError::SessionNotFound(id))?;
        machine::apply(current.status, event).map_err(DbError::Core)?;
        Err(CoreError::InvalidTransition {
            entity: "session",
            from: current.status.as_str().to_string(),
            event: event.as_str().to_string(),
        }
        .into())
    }

    /// Scheduler progress write after a fully persisted page.
    pub async fn update_progress(
        &self,
        id: Uuid,
        current_page: i64,
        newly_scraped: i64,
        last_prospect_name: Option<&str>,
        total_prospects_count: Option<i64>,
    ) -> Result<ScrapeSession, DbError> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET current_page = ?,
                scraped_prospects_count = scraped_prospects_count + ?,
                last_prospect_name = COALESCE(?, last_prospect_name),
                total_prospects_count = COALESCE(?, total_prospects_count)
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(current_page)
        .bind(newly_scraped)
        .bind(last_prospect_name)
        .bind(total_prospects_count)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or(DbError::SessionNotFound(id))
    }

    /// Boot-time crash consistency: a session recorded as `running` cannot
    /// resume an in-flight page fetch, so it is demoted to `paused` with
    /// `current_page` untouched. Returns the demoted session IDs.
    pub async fn recover_interrupted(&self) -> Result<Vec<Uuid>, DbError> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM sessions WHERE status = 'running' AND deleted_at IS NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        if !ids.is_empty() {
            sqlx::query("UPDATE sessions SET status = 'paused' WHERE status = 'running'")
                .execute(&self.pool)
                .await?;
        }

        Ok(ids
            .iter()
            .filter_map(|id| Uuid::parse_str(id).ok())
            .collect())
    }

    /// Soft-delete a terminal session together with its prospects;
    /// enrollments pointing at those prospects are removed outright.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "UPDATE sessions SET deleted_at = ? \
             WHERE id = ? AND deleted_at IS NULL AND status NOT IN ('running', 'paused')",
        )
        .bind(now)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<String> =
                sqlx::query_scalar("SELECT status FROM sessions WHERE id = ? AND deleted_at IS NULL")
                    .bind(id.to_string())
                    .fetch_optional(&mut *tx)
                    .await?;
            return match exists {
                Some(_) => Err(CoreError::precondition(
                    "cannot delete a session while it is running or paused",
                )
                .into()),
                None => Ok(false),
            };
        }

        sqlx::query(
            "DELETE FROM enrollments \
             WHERE prospect_id IN (SELECT id FROM prospects WHERE session_id = ?)",
        )
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE prospects SET deleted_at = ? WHERE session_id = ? AND deleted_at IS NULL")
            .bind(now)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::setup_test_db;
    use outreach_core::SessionStatus;

    #[tokio::test]
    async fn test_create_and_find_session() {
        let (pool, _dir) = setup_test_db().await;
        let repo = SessionRepository::new(pool);

        let session = repo
            .create("Q3 leads", "https://example.com/search?q=founder")
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Initializing);

        let found = repo.find_by_id(session.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Q3 leads");
        assert_eq!(found.current_page, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_source_url() {
        let (pool, _dir) = setup_test_db().await;
        let repo = SessionRepository::new(pool);

        let err = repo.create("bad", "   ").await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_second_active_session() {
        let (pool, _dir) = setup_test_db().await;
        let repo = SessionRepository::new(pool);

        let first = repo.create("one", "https://example.com/a").await.unwrap();
        repo.transition(first.id, SessionEvent::Start).await.unwrap();

        let err = repo
            .create("two", "https://example.com/b")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

        // Pausing keeps the slot occupied.
        repo.transition(first.id, SessionEvent::Pause).await.unwrap();
        assert!(repo.create("three", "https://example.com/c").await.is_err());

        // A terminal transition releases it.
        repo.transition(first.id, SessionEvent::Stop).await.unwrap();
        assert!(repo.create("four", "https://example.com/d").await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_starts_yield_single_winner() {
        let (pool, _dir) = setup_test_db().await;
        let repo = SessionRepository::new(pool);

        let a = repo.create("a", "https://example.com/a").await.unwrap();
        let b = ScrapeSession::new("b", "https://example.com/b");
        // Insert the second initializing session directly; `create` only
        // blocks on running|paused.
        let row = crate::models::SessionRow::from(&b);
        sqlx::query(
            "INSERT INTO sessions (id, name, source_url, status, current_page, scraped_prospects_count, started_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.source_url)
        .bind(&row.status)
        .bind(row.current_page)
        .bind(row.scraped_prospects_count)
        .bind(row.started_at)
        .execute(&repo.pool)
        .await
        .unwrap();

        let (ra, rb) = tokio::join!(
            repo.transition(a.id, SessionEvent::Start),
            repo.transition(b.id, SessionEvent::Start)
        );

        let winners = [ra.is_ok(), rb.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(winners, 1);

        let active = repo.find_active().await.unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_transition_lifecycle() {
        let (pool, _dir) = setup_test_db().await;
        let repo = SessionRepository::new(pool);

        let session = repo.create("run", "https://example.com/x").await.unwrap();

        let running = repo.transition(session.id, SessionEvent::Start).await.unwrap();
        assert_eq!(running.status, SessionStatus::Running);
        assert!(running.ended_at.is_none());

        let paused = repo.transition(session.id, SessionEvent::Pause).await.unwrap();
        assert_eq!(paused.status, SessionStatus::Paused);

        let resumed = repo.transition(session.id, SessionEvent::Resume).await.unwrap();
        assert_eq!(resumed.status, SessionStatus::Running);

        let done = repo.transition(session.id, SessionEvent::Complete).await.unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert!(done.ended_at.is_some());
    }

    #[tokio::test]
    async fn test_invalid_transition_leaves_state_unchanged() {
        let (pool, _dir) = setup_test_db().await;
        let repo = SessionRepository::new(pool);

        let session = repo.create("x", "https://example.com/x").await.unwrap();

        let err = repo
            .transition(session.id, SessionEvent::Pause)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InvalidTransition { .. })
        ));

        let found = repo.find_by_id(session.id).await.unwrap().unwrap();
        assert_eq!(found.status, SessionStatus::Initializing);
    }

    #[tokio::test]
    async fn test_terminal_states_reject_everything() {
        let (pool, _dir) = setup_test_db().await;
        let repo = SessionRepository::new(pool);

        let session = repo.create("x", "https://example.com/x").await.unwrap();
        repo.transition(session.id, SessionEvent::Start).await.unwrap();
        repo.transition(session.id, SessionEvent::Stop).await.unwrap();

        for event in SessionEvent::all() {
            assert!(repo.transition(session.id, event).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_update_progress_accumulates() {
        let (pool, _dir) = setup_test_db().await;
        let repo = SessionRepository::new(pool);

        let session = repo.create("x", "https://example.com/x").await.unwrap();
        repo.transition(session.id, SessionEvent::Start).await.unwrap();

        repo.update_progress(session.id, 1, 25, Some("Ada Lovelace"), Some(500))
            .await
            .unwrap();
        let updated = repo
            .update_progress(session.id, 2, 25, Some("Grace Hopper"), None)
            .await
            .unwrap();

        assert_eq!(updated.current_page, 2);
        assert_eq!(updated.scraped_prospects_count, 50);
        assert_eq!(updated.last_prospect_name.as_deref(), Some("Grace Hopper"));
        assert_eq!(updated.total_prospects_count, Some(500));
    }

    #[tokio::test]
    async fn test_recover_interrupted_demotes_running_to_paused() {
        let (pool, _dir) = setup_test_db().await;
        let repo = SessionRepository::new(pool);

        let session = repo.create("x", "https://example.com/x").await.unwrap();
        repo.transition(session.id, SessionEvent::Start).await.unwrap();
        repo.update_progress(session.id, 7, 70, Some("Last Seen"), None)
            .await
            .unwrap();

        let recovered = repo.recover_interrupted().await.unwrap();
        assert_eq!(recovered, vec![session.id]);

        let found = repo.find_by_id(session.id).await.unwrap().unwrap();
        assert_eq!(found.status, SessionStatus::Paused);
        // The resume point survives the crash.
        assert_eq!(found.current_page, 7);

        // And the session can be resumed normally.
        let resumed = repo.transition(session.id, SessionEvent::Resume).await.unwrap();
        assert_eq!(resumed.status, SessionStatus::Running);
    }

    #[tokio::test]
    async fn test_delete_refused_while_active() {
        let (pool, _dir) = setup_test_db().await;
        let repo = SessionRepository::new(pool);

        let session = repo.create("x", "https://example.com/x").await.unwrap();
        repo.transition(session.id, SessionEvent::Start).await.unwrap();

        let err = repo.delete(session.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::PreconditionFailed(_))
        ));

        repo.transition(session.id, SessionEvent::Stop).await.unwrap();
        assert!(repo.delete(session.id).await.unwrap());
        assert!(repo.find_by_id(session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_session_returns_false() {
        let (pool, _dir) = setup_test_db().await;
        let repo = SessionRepository::new(pool);

        assert!(!repo.delete(Uuid::new_v4()).await.unwrap());
    }
}
