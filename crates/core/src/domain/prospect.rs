use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record scraped from the platform. Immutable after creation
/// except for soft deletion with its owning session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prospect {
    pub id: Uuid,
    pub session_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub job_title: String,
    /// Platform identity; unique within the owning session.
    pub profile_url: String,
    pub scraped_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Prospect {
    pub fn from_scraped(session_id: Uuid, scraped: NewProspect) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            first_name: scraped.first_name,
            last_name: scraped.last_name,
            company: scraped.company,
            job_title: scraped.job_title,
            profile_url: scraped.profile_url,
            scraped_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A prospect record as produced by the platform driver, before it is
/// assigned an identity and an owning session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewProspect {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub job_title: String,
    pub profile_url: String,
}
