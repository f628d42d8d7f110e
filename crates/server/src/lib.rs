pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        .route(
            "/api/sessions",
            get(routes::list_sessions).post(routes::create_session),
        )
        .route(
            "/api/sessions/{id}",
            get(routes::get_session).delete(routes::delete_session),
        )
        .route("/api/sessions/{id}/pause", post(routes::pause_session))
        .route("/api/sessions/{id}/resume", post(routes::resume_session))
        .route("/api/sessions/{id}/stop", post(routes::stop_session))
        .route(
            "/api/sessions/{id}/prospects",
            get(routes::list_session_prospects),
        )
        .route(
            "/api/sequences",
            get(routes::list_sequences).post(routes::create_sequence),
        )
        .route(
            "/api/sequences/{id}",
            get(routes::get_sequence).delete(routes::delete_sequence),
        )
        .route(
            "/api/sequences/{id}/activate",
            post(routes::activate_sequence),
        )
        .route("/api/sequences/{id}/pause", post(routes::pause_sequence))
        .route("/api/sequences/{id}/resume", post(routes::resume_sequence))
        .route(
            "/api/sequences/{id}/messages",
            get(routes::list_messages).post(routes::add_message),
        )
        .route(
            "/api/sequences/{id}/messages/{message_id}",
            axum::routing::patch(routes::update_message).delete(routes::delete_message),
        )
        .route(
            "/api/sequences/{id}/enrollments",
            get(routes::list_enrollments).post(routes::enroll_prospects),
        )
        .route(
            "/api/sequences/{id}/enrollments/{enrollment_id}",
            axum::routing::delete(routes::remove_enrollment),
        )
        .route("/api/events", get(routes::sse::events_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
