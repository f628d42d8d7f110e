//! The platform automation boundary.
//!
//! Everything that actually touches the external platform (page scraping,
//! message delivery, connection requests) happens behind this trait. The
//! schedulers only see typed results and a three-way error taxonomy.

use async_trait::async_trait;
use outreach_core::NewProspect;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// How a driver failure should be handled upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverErrorKind {
    /// Worth retrying with backoff (throttling, timeouts, flaky network).
    Transient,
    /// The driver itself is unusable; the owning session moves to error.
    Fatal,
    /// This particular target is unreachable; no retry will help.
    Permanent,
}

impl DriverErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Fatal => "fatal",
            Self::Permanent => "permanent",
        }
    }
}

impl std::fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind} failure: {message}")]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Fatal,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == DriverErrorKind::Transient
    }
}

/// One page of scraped prospect records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectPage {
    pub prospects: Vec<NewProspect>,
    pub has_more: bool,
    /// Total result count when the platform reports one.
    #[serde(default)]
    pub total: Option<i64>,
}

/// Addressing information for an outbound action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectRef {
    pub prospect_id: Uuid,
    pub profile_url: String,
}

#[async_trait]
pub trait PlatformDriver: Send + Sync {
    /// Fetch one page of prospects from a source listing. Pages are
    /// 1-based.
    async fn fetch_prospect_page(
        &self,
        source_url: &str,
        page: i64,
    ) -> Result<ProspectPage, DriverError>;

    async fn send_message(
        &self,
        prospect: &ProspectRef,
        content: &str,
    ) -> Result<(), DriverError>;

    async fn send_connection_request(&self, prospect: &ProspectRef) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_kind() {
        assert_eq!(
            DriverError::transient("rate limited").to_string(),
            "transient failure: rate limited"
        );
        assert_eq!(
            DriverError::permanent("profile gone").to_string(),
            "permanent failure: profile gone"
        );
        assert!(DriverError::transient("x").is_transient());
        assert!(!DriverError::fatal("x").is_transient());
    }
}
