use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Upper bound on message steps per sequence.
pub const MAX_SEQUENCE_STEPS: i64 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SequenceStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Completed,
}

impl SequenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A reusable multi-step messaging campaign template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Default spacing hint surfaced to editors; per-message `delay_hours`
    /// is authoritative for scheduling.
    pub interval_days: i64,
    pub status: SequenceStatus,
    pub created_at: DateTime<Utc>,
}

impl Sequence {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        interval_days: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            interval_days,
            status: SequenceStatus::default(),
            created_at: Utc::now(),
        }
    }
}

/// One timed content unit within a sequence, identified by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceMessage {
    pub id: Uuid,
    pub sequence_id: Uuid,
    /// 1-based step number, unique within the sequence.
    pub position: i64,
    /// Hours since the previous step's send, or since enrollment for
    /// position 1. Always positive.
    pub delay_hours: i64,
    pub content: String,
}

impl SequenceMessage {
    pub fn new(
        sequence_id: Uuid,
        position: i64,
        delay_hours: i64,
        content: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let content = content.into();
        validate_message(position, delay_hours, &content)?;
        Ok(Self {
            id: Uuid::new_v4(),
            sequence_id,
            position,
            delay_hours,
            content,
        })
    }
}

pub fn validate_message(position: i64, delay_hours: i64, content: &str) -> Result<(), CoreError> {
    if !(1..=MAX_SEQUENCE_STEPS).contains(&position) {
        return Err(CoreError::validation(format!(
            "message position must be between 1 and {}, got {}",
            MAX_SEQUENCE_STEPS, position
        )));
    }
    if delay_hours <= 0 {
        return Err(CoreError::validation(format!(
            "message delay must be positive, got {} hours",
            delay_hours
        )));
    }
    if content.trim().is_empty() {
        return Err(CoreError::validation("message content cannot be empty"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSequenceRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub interval_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMessageRequest {
    pub position: i64,
    pub delay_hours: i64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateMessageRequest {
    pub delay_hours: Option<i64>,
    pub content: Option<String>,
}
