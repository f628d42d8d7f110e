use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use orchestrator::{DriverError, PlatformDriver, ProspectPage, ProspectRef};
use outreach_core::NewProspect;
use serde_json::{json, Value};
use server::config::OutreachConfig;
use server::state::AppState;
use server::create_router;
use tempfile::TempDir;
use uuid::Uuid;

/// Bridge stub for route tests: serves `total_pages` pages of prospects
/// then reports the listing exhausted; `endless` keeps a worker busy for
/// pause/stop flows. Sends always succeed.
struct StubDriver {
    total_pages: i64,
    per_page: usize,
    endless: bool,
}

impl StubDriver {
    fn finite(total_pages: i64, per_page: usize) -> Self {
        Self {
            total_pages,
            per_page,
            endless: false,
        }
    }

    fn endless() -> Self {
        Self {
            total_pages: 0,
            per_page: 1,
            endless: true,
        }
    }
}

#[async_trait]
impl PlatformDriver for StubDriver {
    async fn fetch_prospect_page(
        &self,
        _source_url: &str,
        page: i64,
    ) -> Result<ProspectPage, DriverError> {
        if self.endless {
            tokio::time::sleep(Duration::from_millis(10)).await;
            return Ok(ProspectPage {
                prospects: vec![NewProspect {
                    first_name: "Endless".to_string(),
                    last_name: format!("Page{}", page),
                    company: String::new(),
                    job_title: String::new(),
                    profile_url: format!("https://example.com/in/{}", Uuid::new_v4()),
                }],
                has_more: true,
                total: None,
            });
        }

        let prospects = (0..self.per_page)
            .map(|i| NewProspect {
                first_name: format!("P{}-{}", page, i),
                last_name: "Stub".to_string(),
                company: "Acme".to_string(),
                job_title: "Founder".to_string(),
                profile_url: format!("https://example.com/in/p{}-{}", page, i),
            })
            .collect();

        Ok(ProspectPage {
            prospects,
            has_more: page < self.total_pages,
            total: Some(self.total_pages * self.per_page as i64),
        })
    }

    async fn send_message(
        &self,
        _prospect: &ProspectRef,
        _content: &str,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    async fn send_connection_request(&self, _prospect: &ProspectRef) -> Result<(), DriverError> {
        Ok(())
    }
}

async fn setup_with_driver(driver: Arc<dyn PlatformDriver>) -> (TestServer, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let pool = db::create_pool(&db_url).await.expect("Failed to create pool");
    db::run_migrations(&pool).await.expect("Failed to run migrations");

    let mut config = OutreachConfig::default();
    // Wide-open policy so route tests are not gated by clock or quota.
    config.pacing.window_start_hour = 0;
    config.pacing.window_end_hour = 0;
    config.pacing.quotas.messages = 10_000;
    config.pacing.quotas.connection_requests = 10_000;
    config.pacing.quotas.prospects = 10_000;
    config.pacing.min_action_delay_secs = 0;
    config.pacing.max_action_delay_secs = 0;
    config.scrape.page_delay_secs = 0;
    config.scrape.retry_base_secs = 0;

    let state = AppState::new(pool, driver, &config);
    let app = create_router(state);

    let server = TestServer::new(app).expect("Failed to create test server");
    (server, temp_dir)
}

async fn setup_test_server() -> (TestServer, TempDir) {
    setup_with_driver(Arc::new(StubDriver::finite(2, 3))).await
}

async fn wait_for_session_status(server: &TestServer, id: &str, want: &str) -> Value {
    for _ in 0..200 {
        let response = server.get(&format!("/api/sessions/{}", id)).await;
        let body: Value = response.json();
        if body["status"] == want {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session {} never reached status {}", id, want);
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let (server, _temp_dir) = setup_test_server().await;

        let response = server.get("/health").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
    }
}

mod sessions_api {
    use super::*;

    #[tokio::test]
    async fn test_create_session_rejects_bad_input() {
        let (server, _temp_dir) = setup_test_server().await;

        let response = server
            .post("/api/sessions")
            .json(&json!({"name": "", "source_url": "https://example.com"}))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);

        let response = server
            .post("/api/sessions")
            .json(&json!({"name": "ok", "source_url": "   "}))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_create_session_runs_to_completion() {
        let (server, _temp_dir) = setup_test_server().await;

        let response = server
            .post("/api/sessions")
            .json(&json!({
                "name": "Q3 founders",
                "source_url": "https://example.com/search?q=founder"
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["status"], "running");
        let id = body["id"].as_str().unwrap().to_string();

        let done = wait_for_session_status(&server, &id, "completed").await;
        assert_eq!(done["current_page"], 2);
        assert_eq!(done["scraped_prospects_count"], 6);

        let response = server.get(&format!("/api/sessions/{}/prospects", id)).await;
        response.assert_status_ok();
        let prospects: Value = response.json();
        assert_eq!(prospects.as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_second_session_rejected_while_first_active() {
        let (server, _temp_dir) = setup_with_driver(Arc::new(StubDriver::endless())).await;

        let response = server
            .post("/api/sessions")
            .json(&json!({"name": "one", "source_url": "https://example.com/a"}))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let first: Value = response.json();
        let first_id = first["id"].as_str().unwrap().to_string();

        let response = server
            .post("/api/sessions")
            .json(&json!({"name": "two", "source_url": "https://example.com/b"}))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "validation_error");

        // Clean up the worker.
        server
            .post(&format!("/api/sessions/{}/stop", first_id))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_pause_resume_stop_lifecycle() {
        let (server, _temp_dir) = setup_with_driver(Arc::new(StubDriver::endless())).await;

        let response = server
            .post("/api/sessions")
            .json(&json!({"name": "lifecycle", "source_url": "https://example.com/x"}))
            .await;
        let session: Value = response.json();
        let id = session["id"].as_str().unwrap().to_string();

        let response = server.post(&format!("/api/sessions/{}/pause", id)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "paused");

        // Pausing a paused session is a transition conflict.
        let response = server.post(&format!("/api/sessions/{}/pause", id)).await;
        response.assert_status(axum::http::StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["error"], "invalid_transition");

        let response = server.post(&format!("/api/sessions/{}/resume", id)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "running");

        let response = server.post(&format!("/api/sessions/{}/stop", id)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "stopped");

        // Terminal states accept nothing further.
        let response = server.post(&format!("/api/sessions/{}/resume", id)).await;
        response.assert_status(axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (server, _temp_dir) = setup_test_server().await;

        let response = server
            .post("/api/sessions")
            .json(&json!({"name": "short", "source_url": "https://example.com/s"}))
            .await;
        let session: Value = response.json();
        let id = session["id"].as_str().unwrap().to_string();
        wait_for_session_status(&server, &id, "completed").await;

        let response = server.delete(&format!("/api/sessions/{}", id)).await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);

        let response = server.get(&format!("/api/sessions/{}", id)).await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_unknown_session_is_404() {
        let (server, _temp_dir) = setup_test_server().await;

        let response = server
            .get(&format!("/api/sessions/{}", Uuid::new_v4()))
            .await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);
    }
}

mod sequences_api {
    use super::*;

    async fn create_sequence(server: &TestServer, name: &str) -> String {
        let response = server
            .post("/api/sequences")
            .json(&json!({"name": name, "description": "test flow"}))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["status"], "draft");
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_message_position_rules() {
        let (server, _temp_dir) = setup_test_server().await;
        let id = create_sequence(&server, "positions").await;

        let response = server
            .post(&format!("/api/sequences/{}/messages", id))
            .json(&json!({"position": 1, "delay_hours": 24, "content": "Hi"}))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        // Duplicate position.
        let response = server
            .post(&format!("/api/sequences/{}/messages", id))
            .json(&json!({"position": 1, "delay_hours": 48, "content": "Again"}))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "validation_error");

        // Out-of-range position and non-positive delay.
        let response = server
            .post(&format!("/api/sequences/{}/messages", id))
            .json(&json!({"position": 6, "delay_hours": 24, "content": "Too far"}))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);

        let response = server
            .post(&format!("/api/sequences/{}/messages", id))
            .json(&json!({"position": 2, "delay_hours": 0, "content": "No delay"}))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_activation_requires_messages() {
        let (server, _temp_dir) = setup_test_server().await;
        let id = create_sequence(&server, "empty").await;

        let response = server.post(&format!("/api/sequences/{}/activate", id)).await;
        response.assert_status(axum::http::StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["error"], "precondition_failed");

        server
            .post(&format!("/api/sequences/{}/messages", id))
            .json(&json!({"position": 1, "delay_hours": 24, "content": "Hi"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server.post(&format!("/api/sequences/{}/activate", id)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "active");

        // Double activation is a transition conflict.
        let response = server.post(&format!("/api/sequences/{}/activate", id)).await;
        response.assert_status(axum::http::StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["error"], "invalid_transition");
    }

    #[tokio::test]
    async fn test_sequence_pause_resume() {
        let (server, _temp_dir) = setup_test_server().await;
        let id = create_sequence(&server, "pausable").await;

        server
            .post(&format!("/api/sequences/{}/messages", id))
            .json(&json!({"position": 1, "delay_hours": 24, "content": "Hi"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
        server
            .post(&format!("/api/sequences/{}/activate", id))
            .await
            .assert_status_ok();

        let response = server.post(&format!("/api/sequences/{}/pause", id)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "paused");

        let response = server.post(&format!("/api/sequences/{}/resume", id)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "active");
    }

    #[tokio::test]
    async fn test_update_and_delete_message() {
        let (server, _temp_dir) = setup_test_server().await;
        let id = create_sequence(&server, "editable").await;

        let response = server
            .post(&format!("/api/sequences/{}/messages", id))
            .json(&json!({"position": 1, "delay_hours": 24, "content": "Hi"}))
            .await;
        let message: Value = response.json();
        let message_id = message["id"].as_str().unwrap().to_string();

        let response = server
            .patch(&format!("/api/sequences/{}/messages/{}", id, message_id))
            .json(&json!({"delay_hours": 72}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["delay_hours"], 72);

        // A message from another sequence is not addressable through this one.
        let other = create_sequence(&server, "other").await;
        let response = server
            .patch(&format!("/api/sequences/{}/messages/{}", other, message_id))
            .json(&json!({"delay_hours": 12}))
            .await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);

        let response = server
            .delete(&format!("/api/sequences/{}/messages/{}", id, message_id))
            .await;
        response.assert_status(axum::http::StatusCode::NO_CONTENT);

        let response = server.get(&format!("/api/sequences/{}/messages", id)).await;
        let body: Value = response.json();
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enrollment_batch_reports_partial_success() {
        let (server, _temp_dir) = setup_test_server().await;

        // Scrape some prospects first.
        let response = server
            .post("/api/sessions")
            .json(&json!({"name": "feed", "source_url": "https://example.com/feed"}))
            .await;
        let session: Value = response.json();
        let session_id = session["id"].as_str().unwrap().to_string();
        wait_for_session_status(&server, &session_id, "completed").await;

        let response = server
            .get(&format!("/api/sessions/{}/prospects", session_id))
            .await;
        let prospects: Value = response.json();
        let mut prospect_ids: Vec<String> = prospects
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(prospect_ids.len(), 6);
        prospect_ids.push(Uuid::new_v4().to_string());

        let sequence_id = create_sequence(&server, "enrollees").await;
        server
            .post(&format!("/api/sequences/{}/messages", sequence_id))
            .json(&json!({"position": 1, "delay_hours": 24, "content": "Hi"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .post(&format!("/api/sequences/{}/enrollments", sequence_id))
            .json(&json!({ "prospect_ids": prospect_ids }))
            .await;
        response.assert_status_ok();
        let report: Value = response.json();
        assert_eq!(report["success_count"], 6);
        assert_eq!(report["failures"].as_array().unwrap().len(), 1);

        // Idempotent overlap: nothing new, nothing failed.
        prospect_ids.pop();
        let response = server
            .post(&format!("/api/sequences/{}/enrollments", sequence_id))
            .json(&json!({ "prospect_ids": prospect_ids }))
            .await;
        let report: Value = response.json();
        assert_eq!(report["success_count"], 0);
        assert!(report["failures"].as_array().unwrap().is_empty());

        let response = server
            .get(&format!("/api/sequences/{}/enrollments", sequence_id))
            .await;
        let enrollments: Value = response.json();
        assert_eq!(enrollments.as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_unknown_sequence_is_404() {
        let (server, _temp_dir) = setup_test_server().await;

        let response = server
            .get(&format!("/api/sequences/{}", Uuid::new_v4()))
            .await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);

        let response = server
            .post(&format!("/api/sequences/{}/enrollments", Uuid::new_v4()))
            .json(&json!({"prospect_ids": [Uuid::new_v4()]}))
            .await;
        response.assert_status(axum::http::StatusCode::NOT_FOUND);
    }
}
