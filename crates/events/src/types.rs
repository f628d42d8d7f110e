//! Event types for the Outreach Studio event stream

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// All possible events in the system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Session events
    /// Scrape session changed lifecycle state
    #[serde(rename = "session.status_changed")]
    SessionStatusChanged {
        session_id: Uuid,
        from: String,
        to: String,
    },

    /// Scrape loop progress after a persisted page
    #[serde(rename = "session.progress")]
    SessionProgress {
        session_id: Uuid,
        scraped_profiles: i64,
        current_page: i64,
        total_prospects_count: Option<i64>,
        last_prospect_name: Option<String>,
    },

    // Sequence events
    /// Sequence changed lifecycle state
    #[serde(rename = "sequence.status_changed")]
    SequenceStatusChanged {
        sequence_id: Uuid,
        from: String,
        to: String,
    },

    /// A step was sent; `completed` marks the final step
    #[serde(rename = "enrollment.advanced")]
    EnrollmentAdvanced {
        enrollment_id: Uuid,
        sequence_id: Uuid,
        prospect_id: Uuid,
        step: i64,
        completed: bool,
    },

    /// An enrollment failed permanently
    #[serde(rename = "enrollment.failed")]
    EnrollmentFailed {
        enrollment_id: Uuid,
        sequence_id: Uuid,
        reason: String,
    },

    /// A connection request went out for a not-yet-connected prospect
    #[serde(rename = "connection.requested")]
    ConnectionRequested {
        enrollment_id: Uuid,
        prospect_id: Uuid,
    },

    // System events
    /// Generic error event
    #[serde(rename = "error")]
    Error {
        message: String,
        context: Option<String>,
    },
}

impl Event {
    /// Get the session ID associated with this event, if any
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            Event::SessionStatusChanged { session_id, .. } => Some(*session_id),
            Event::SessionProgress { session_id, .. } => Some(*session_id),
            _ => None,
        }
    }

    /// Get the sequence ID associated with this event, if any
    pub fn sequence_id(&self) -> Option<Uuid> {
        match self {
            Event::SequenceStatusChanged { sequence_id, .. } => Some(*sequence_id),
            Event::EnrollmentAdvanced { sequence_id, .. } => Some(*sequence_id),
            Event::EnrollmentFailed { sequence_id, .. } => Some(*sequence_id),
            _ => None,
        }
    }

    /// Stream label used for the SSE `event:` field
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SessionStatusChanged { .. } => "session.status_changed",
            Event::SessionProgress { .. } => "session.progress",
            Event::SequenceStatusChanged { .. } => "sequence.status_changed",
            Event::EnrollmentAdvanced { .. } => "enrollment.advanced",
            Event::EnrollmentFailed { .. } => "enrollment.failed",
            Event::ConnectionRequested { .. } => "connection.requested",
            Event::Error { .. } => "error",
        }
    }
}
