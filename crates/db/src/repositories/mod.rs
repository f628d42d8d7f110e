mod enrollment_repository;
mod prospect_repository;
mod sequence_repository;
mod session_repository;
mod usage_repository;

pub use enrollment_repository::*;
pub use prospect_repository::*;
pub use sequence_repository::*;
pub use session_repository::*;
pub use usage_repository::*;

#[cfg(test)]
pub(crate) mod test_support {
    use outreach_core::NewProspect;
    use sqlx::SqlitePool;
    use tempfile::TempDir;
    use uuid::Uuid;

    /// File-backed test database; a shared file keeps every pooled
    /// connection on the same data, which in-memory SQLite does not.
    pub async fn setup_test_db() -> (SqlitePool, TempDir) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let url = format!("sqlite:{}", dir.path().join("test.db").display());
        let pool = crate::create_pool(&url).await.expect("Failed to create pool");
        crate::run_migrations(&pool).await.expect("Failed to run migrations");
        (pool, dir)
    }

    /// Seed a session with `n` scraped prospects, returning their IDs in
    /// insertion order.
    pub async fn seed_prospects(pool: &SqlitePool, n: usize) -> (Uuid, Vec<Uuid>) {
        let sessions = crate::SessionRepository::new(pool.clone());
        let prospects = crate::ProspectRepository::new(pool.clone());

        let session = sessions
            .create("seed", "https://example.com/search")
            .await
            .unwrap();

        let scraped: Vec<NewProspect> = (0..n)
            .map(|i| NewProspect {
                first_name: format!("Prospect{}", i),
                last_name: "Test".to_string(),
                company: "Acme".to_string(),
                job_title: "Founder".to_string(),
                profile_url: format!("https://example.com/in/prospect-{}", i),
            })
            .collect();
        prospects.insert_batch(session.id, &scraped).await.unwrap();

        let ids = prospects
            .find_by_session(session.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();

        (session.id, ids)
    }
}
