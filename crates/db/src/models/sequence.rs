use outreach_core::{Sequence, SequenceMessage, SequenceStatus};
use uuid::Uuid;

use super::{datetime_to_timestamp, timestamp_to_datetime};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SequenceRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub interval_days: i64,
    pub status: String,
    pub created_at: i64,
}

impl SequenceRow {
    pub fn into_domain(self) -> Sequence {
        Sequence {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            name: self.name,
            description: self.description,
            interval_days: self.interval_days,
            status: SequenceStatus::parse(&self.status).unwrap_or_default(),
            created_at: timestamp_to_datetime(self.created_at),
        }
    }
}

impl From<&Sequence> for SequenceRow {
    fn from(sequence: &Sequence) -> Self {
        Self {
            id: sequence.id.to_string(),
            name: sequence.name.clone(),
            description: sequence.description.clone(),
            interval_days: sequence.interval_days,
            status: sequence.status.as_str().to_string(),
            created_at: datetime_to_timestamp(sequence.created_at),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub id: String,
    pub sequence_id: String,
    pub position: i64,
    pub delay_hours: i64,
    pub content: String,
}

impl MessageRow {
    pub fn into_domain(self) -> SequenceMessage {
        SequenceMessage {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            sequence_id: Uuid::parse_str(&self.sequence_id).unwrap_or_default(),
            position: self.position,
            delay_hours: self.delay_hours,
            content: self.content,
        }
    }
}

impl From<&SequenceMessage> for MessageRow {
    fn from(message: &SequenceMessage) -> Self {
        Self {
            id: message.id.to_string(),
            sequence_id: message.sequence_id.to_string(),
            position: message.position,
            delay_hours: message.delay_hours,
            content: message.content.clone(),
        }
    }
}
