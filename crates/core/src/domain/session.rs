use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Initializing,
    Running,
    Paused,
    Completed,
    Error,
    Stopped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Stopped => "stopped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initializing" => Some(Self::Initializing),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }

    /// Terminal states accept no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Stopped)
    }

    /// A session in one of these states holds the global active-session slot.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    pub fn all() -> [SessionStatus; 6] {
        [
            Self::Initializing,
            Self::Running,
            Self::Paused,
            Self::Completed,
            Self::Error,
            Self::Stopped,
        ]
    }
}

/// Lifecycle commands accepted by a scrape session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    Start,
    Pause,
    Resume,
    Stop,
    Complete,
    Fail,
}

impl SessionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Complete => "complete",
            Self::Fail => "fail",
        }
    }

    pub fn all() -> [SessionEvent; 6] {
        [
            Self::Start,
            Self::Pause,
            Self::Resume,
            Self::Stop,
            Self::Complete,
            Self::Fail,
        ]
    }
}

/// One scraping run against an external prospect list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeSession {
    pub id: Uuid,
    pub name: String,
    pub source_url: String,
    pub status: SessionStatus,
    /// Last fully persisted page, 0 when no page has completed yet.
    pub current_page: i64,
    pub scraped_prospects_count: i64,
    pub total_prospects_count: Option<i64>,
    pub last_prospect_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ScrapeSession {
    pub fn new(name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            source_url: source_url.into(),
            status: SessionStatus::default(),
            current_page: 0,
            scraped_prospects_count: 0,
            total_prospects_count: None,
            last_prospect_name: None,
            started_at: Utc::now(),
            ended_at: None,
            deleted_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub name: String,
    pub source_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = ScrapeSession::new("Q3 leads", "https://example.com/search?q=founder");

        assert_eq!(session.status, SessionStatus::Initializing);
        assert_eq!(session.current_page, 0);
        assert_eq!(session.scraped_prospects_count, 0);
        assert!(session.ended_at.is_none());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(SessionStatus::Initializing.as_str(), "initializing");
        assert_eq!(SessionStatus::Running.as_str(), "running");
        assert_eq!(SessionStatus::parse("stopped"), Some(SessionStatus::Stopped));
        assert_eq!(SessionStatus::parse("bogus"), None);
    }

    #[test]
    fn test_terminal_and_active_partition() {
        for status in SessionStatus::all() {
            // A status never both holds the active slot and is terminal.
            assert!(!(status.is_terminal() && status.is_active()));
        }
        assert!(SessionStatus::Paused.is_active());
        assert!(SessionStatus::Error.is_terminal());
        assert!(!SessionStatus::Initializing.is_active());
    }
}
