use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use events::Event;
use outreach_core::{
    AddMessageRequest, CreateSequenceRequest, EnrollRequest, Enrollment, EnrollmentReport,
    Sequence, SequenceMessage, UpdateMessageRequest,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub async fn create_sequence(
    State(state): State<AppState>,
    Json(payload): Json<CreateSequenceRequest>,
) -> Result<(StatusCode, Json<Sequence>), AppError> {
    let sequence = state
        .sequences
        .create(
            &payload.name,
            &payload.description,
            payload.interval_days.unwrap_or(1),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(sequence)))
}

pub async fn list_sequences(
    State(state): State<AppState>,
) -> Result<Json<Vec<Sequence>>, AppError> {
    let sequences = state.sequences.find_all().await?;
    Ok(Json(sequences))
}

pub async fn get_sequence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Sequence>, AppError> {
    match state.sequences.find_by_id(id).await? {
        Some(s) => Ok(Json(s)),
        None => Err(AppError::NotFound(format!("Sequence not found: {}", id))),
    }
}

pub async fn delete_sequence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.sequences.delete(id).await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Sequence not found: {}", id)))
    }
}

pub async fn activate_sequence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Sequence>, AppError> {
    let sequence = state.sequences.activate(id).await?;
    state.event_bus.emit(Event::SequenceStatusChanged {
        sequence_id: id,
        from: "draft".to_string(),
        to: "active".to_string(),
    });
    Ok(Json(sequence))
}

pub async fn pause_sequence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Sequence>, AppError> {
    let sequence = state.sequences.pause(id).await?;
    state.event_bus.emit(Event::SequenceStatusChanged {
        sequence_id: id,
        from: "active".to_string(),
        to: "paused".to_string(),
    });
    Ok(Json(sequence))
}

pub async fn resume_sequence(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Sequence>, AppError> {
    let sequence = state.sequences.resume(id).await?;
    state.event_bus.emit(Event::SequenceStatusChanged {
        sequence_id: id,
        from: "paused".to_string(),
        to: "active".to_string(),
    });
    Ok(Json(sequence))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SequenceMessage>>, AppError> {
    if state.sequences.find_by_id(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Sequence not found: {}", id)));
    }
    let messages = state.sequences.messages(id).await?;
    Ok(Json(messages))
}

pub async fn add_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMessageRequest>,
) -> Result<(StatusCode, Json<SequenceMessage>), AppError> {
    let message = state
        .sequences
        .add_message(id, payload.position, payload.delay_hours, &payload.content)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn update_message(
    State(state): State<AppState>,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMessageRequest>,
) -> Result<Json<SequenceMessage>, AppError> {
    ensure_message_in_sequence(&state, id, message_id).await?;
    let message = state.sequences.update_message(message_id, &payload).await?;
    Ok(Json(message))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    ensure_message_in_sequence(&state, id, message_id).await?;
    let deleted = state.sequences.delete_message(message_id).await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "Message not found: {}",
            message_id
        )))
    }
}

/// Batch-add prospects; the report lists per-prospect failures and skips
/// duplicates silently.
pub async fn enroll_prospects(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EnrollRequest>,
) -> Result<Json<EnrollmentReport>, AppError> {
    let report = state.enrollments.enroll(id, &payload.prospect_ids).await?;
    Ok(Json(report))
}

pub async fn list_enrollments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    if state.sequences.find_by_id(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Sequence not found: {}", id)));
    }
    let enrollments = state.enrollments.find_by_sequence(id).await?;
    Ok(Json(enrollments))
}

pub async fn remove_enrollment(
    State(state): State<AppState>,
    Path((_id, enrollment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let removed = state.enrollments.remove(enrollment_id).await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "Enrollment not found: {}",
            enrollment_id
        )))
    }
}

async fn ensure_message_in_sequence(
    state: &AppState,
    sequence_id: Uuid,
    message_id: Uuid,
) -> Result<(), AppError> {
    let messages = state.sequences.messages(sequence_id).await?;
    if messages.iter().any(|m| m.id == message_id) {
        Ok(())
    } else {
        Err(AppError::NotFound(format!(
            "Message not found: {}",
            message_id
        )))
    }
}
