use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    #[default]
    Pending,
    Active,
    Paused,
    Completed,
    Failed,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    NotConnected,
    InvitationSent,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::InvitationSent => "invitation_sent",
            Self::Connected => "connected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_connected" => Some(Self::NotConnected),
            "invitation_sent" => Some(Self::InvitationSent),
            "connected" => Some(Self::Connected),
            _ => None,
        }
    }
}

/// A prospect's individual progress through a sequence.
///
/// `current_step` counts steps already sent; the next send is always
/// `current_step + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub sequence_id: Uuid,
    pub prospect_id: Uuid,
    pub current_step: i64,
    pub status: EnrollmentStatus,
    pub connection_status: ConnectionStatus,
    /// Consecutive transient send failures for the current step; reset on
    /// every successful send.
    pub send_attempts: i64,
    pub next_due_at: Option<DateTime<Utc>>,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(sequence_id: Uuid, prospect_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence_id,
            prospect_id,
            current_step: 0,
            status: EnrollmentStatus::default(),
            connection_status: ConnectionStatus::default(),
            send_attempts: 0,
            next_due_at: None,
            enrolled_at: Utc::now(),
        }
    }
}

/// Outcome of a batch enroll; partial success, never all-or-nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentReport {
    pub success_count: usize,
    pub failures: Vec<EnrollmentFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentFailure {
    pub prospect_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollRequest {
    pub prospect_ids: Vec<Uuid>,
}
