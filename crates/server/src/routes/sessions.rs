use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use orchestrator::ScrapeRunner;
use outreach_core::{CreateSessionRequest, Prospect, ScrapeSession};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Create a session and start scraping it immediately.
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ScrapeSession>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name cannot be empty".to_string()));
    }

    let handle = ScrapeRunner::start(
        &payload.name,
        &payload.source_url,
        state.scrape_config.clone(),
        state.scrape_deps.clone(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(handle.session)))
}

pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScrapeSession>>, AppError> {
    let sessions = state.sessions.find_all().await?;
    Ok(Json(sessions))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScrapeSession>, AppError> {
    let session = state.sessions.find_by_id(id).await?;

    match session {
        Some(s) => Ok(Json(s)),
        None => Err(AppError::NotFound(format!("Session not found: {}", id))),
    }
}

pub async fn pause_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScrapeSession>, AppError> {
    let session = ScrapeRunner::pause(id, &state.scrape_deps).await?;
    Ok(Json(session))
}

pub async fn resume_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScrapeSession>, AppError> {
    let handle = ScrapeRunner::resume(id, state.scrape_config.clone(), state.scrape_deps.clone())
        .await?;
    Ok(Json(handle.session))
}

pub async fn stop_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScrapeSession>, AppError> {
    let session = ScrapeRunner::stop(id, &state.scrape_deps).await?;
    Ok(Json(session))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.sessions.delete(id).await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session not found: {}", id)))
    }
}

pub async fn list_session_prospects(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Prospect>>, AppError> {
    if state.sessions.find_by_id(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Session not found: {}", id)));
    }
    let prospects = state.prospects.find_by_session(id).await?;
    Ok(Json(prospects))
}
