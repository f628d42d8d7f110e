//! Status presentation metadata.
//!
//! One lookup per status enum, consumed by presentation layers; keeps
//! label/color mappings out of the per-view code.

use serde::Serialize;

use crate::domain::{ConnectionStatus, EnrollmentStatus, SequenceStatus, SessionStatus};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StatusMeta {
    pub label: &'static str,
    pub color: &'static str,
}

pub fn session_meta(status: SessionStatus) -> StatusMeta {
    match status {
        SessionStatus::Initializing => StatusMeta { label: "Initializing", color: "gray" },
        SessionStatus::Running => StatusMeta { label: "Running", color: "green" },
        SessionStatus::Paused => StatusMeta { label: "Paused", color: "yellow" },
        SessionStatus::Completed => StatusMeta { label: "Completed", color: "blue" },
        SessionStatus::Error => StatusMeta { label: "Error", color: "red" },
        SessionStatus::Stopped => StatusMeta { label: "Stopped", color: "gray" },
    }
}

pub fn sequence_meta(status: SequenceStatus) -> StatusMeta {
    match status {
        SequenceStatus::Draft => StatusMeta { label: "Draft", color: "gray" },
        SequenceStatus::Active => StatusMeta { label: "Active", color: "green" },
        SequenceStatus::Paused => StatusMeta { label: "Paused", color: "yellow" },
        SequenceStatus::Completed => StatusMeta { label: "Completed", color: "blue" },
    }
}

pub fn enrollment_meta(status: EnrollmentStatus) -> StatusMeta {
    match status {
        EnrollmentStatus::Pending => StatusMeta { label: "Pending", color: "gray" },
        EnrollmentStatus::Active => StatusMeta { label: "Active", color: "green" },
        EnrollmentStatus::Paused => StatusMeta { label: "Paused", color: "yellow" },
        EnrollmentStatus::Completed => StatusMeta { label: "Completed", color: "blue" },
        EnrollmentStatus::Failed => StatusMeta { label: "Failed", color: "red" },
    }
}

pub fn connection_meta(status: ConnectionStatus) -> StatusMeta {
    match status {
        ConnectionStatus::NotConnected => StatusMeta { label: "Not connected", color: "gray" },
        ConnectionStatus::InvitationSent => StatusMeta { label: "Invitation sent", color: "yellow" },
        ConnectionStatus::Connected => StatusMeta { label: "Connected", color: "green" },
    }
}
