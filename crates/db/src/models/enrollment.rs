use outreach_core::{ConnectionStatus, Enrollment, EnrollmentStatus};
use uuid::Uuid;

use super::{datetime_to_timestamp, timestamp_to_datetime};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrollmentRow {
    pub id: String,
    pub sequence_id: String,
    pub prospect_id: String,
    pub current_step: i64,
    pub status: String,
    pub connection_status: String,
    pub send_attempts: i64,
    pub next_due_at: Option<i64>,
    pub enrolled_at: i64,
}

impl EnrollmentRow {
    pub fn into_domain(self) -> Enrollment {
        Enrollment {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            sequence_id: Uuid::parse_str(&self.sequence_id).unwrap_or_default(),
            prospect_id: Uuid::parse_str(&self.prospect_id).unwrap_or_default(),
            current_step: self.current_step,
            status: EnrollmentStatus::parse(&self.status).unwrap_or_default(),
            connection_status: ConnectionStatus::parse(&self.connection_status)
                .unwrap_or_default(),
            send_attempts: self.send_attempts,
            next_due_at: self.next_due_at.map(timestamp_to_datetime),
            enrolled_at: timestamp_to_datetime(self.enrolled_at),
        }
    }
}

impl From<&Enrollment> for EnrollmentRow {
    fn from(enrollment: &Enrollment) -> Self {
        Self {
            id: enrollment.id.to_string(),
            sequence_id: enrollment.sequence_id.to_string(),
            prospect_id: enrollment.prospect_id.to_string(),
            current_step: enrollment.current_step,
            status: enrollment.status.as_str().to_string(),
            connection_status: enrollment.connection_status.as_str().to_string(),
            send_attempts: enrollment.send_attempts,
            next_due_at: enrollment.next_due_at.map(datetime_to_timestamp),
            enrolled_at: datetime_to_timestamp(enrollment.enrolled_at),
        }
    }
}
