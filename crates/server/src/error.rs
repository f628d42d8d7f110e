use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use outreach_core::CoreError;
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
    Database(db::DbError),
    Orchestrator(orchestrator::OrchestratorError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

fn core_error_response(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
        CoreError::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, "invalid_transition", err.to_string())
        }
        CoreError::PreconditionFailed(msg) => {
            (StatusCode::CONFLICT, "precondition_failed", msg.clone())
        }
    }
}

fn db_error_response(err: &db::DbError) -> (StatusCode, &'static str, String) {
    match err {
        db::DbError::Core(core) => core_error_response(core),
        db::DbError::SessionNotFound(id) => (
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Session not found: {}", id),
        ),
        db::DbError::SequenceNotFound(id) => (
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Sequence not found: {}", id),
        ),
        db::DbError::MessageNotFound(id) => (
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Message not found: {}", id),
        ),
        db::DbError::EnrollmentNotFound(id) => (
            StatusCode::NOT_FOUND,
            "not_found",
            format!("Enrollment not found: {}", id),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "database_error",
            "Database error occurred".to_string(),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            AppError::Database(err) => {
                if matches!(err, db::DbError::Sqlx(_) | db::DbError::Migration(_)) {
                    tracing::error!("Database error: {:?}", err);
                }
                db_error_response(&err)
            }
            AppError::Orchestrator(err) => match err {
                orchestrator::OrchestratorError::Database(db_err) => {
                    db_error_response(&db_err)
                }
                orchestrator::OrchestratorError::SlotBusy => (
                    StatusCode::CONFLICT,
                    "conflict",
                    "another scrape worker is already running".to_string(),
                ),
                orchestrator::OrchestratorError::NoWorker(id) => (
                    StatusCode::CONFLICT,
                    "conflict",
                    format!("no worker is running for session {}", id),
                ),
                other => {
                    tracing::error!("Orchestrator error: {:?}", other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        other.to_string(),
                    )
                }
            },
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<db::DbError> for AppError {
    fn from(err: db::DbError) -> Self {
        AppError::Database(err)
    }
}

impl From<orchestrator::OrchestratorError> for AppError {
    fn from(err: orchestrator::OrchestratorError) -> Self {
        AppError::Orchestrator(err)
    }
}
