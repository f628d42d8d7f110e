use outreach_core::{ScrapeSession, SessionStatus};
use uuid::Uuid;

use super::{datetime_to_timestamp, timestamp_to_datetime};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: String,
    pub name: String,
    pub source_url: String,
    pub status: String,
    pub current_page: i64,
    pub scraped_prospects_count: i64,
    pub total_prospects_count: Option<i64>,
    pub last_prospect_name: Option<String>,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub deleted_at: Option<i64>,
}

impl SessionRow {
    pub fn into_domain(self) -> ScrapeSession {
        ScrapeSession {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            name: self.name,
            source_url: self.source_url,
            status: SessionStatus::parse(&self.status).unwrap_or_default(),
            current_page: self.current_page,
            scraped_prospects_count: self.scraped_prospects_count,
            total_prospects_count: self.total_prospects_count,
            last_prospect_name: self.last_prospect_name,
            started_at: timestamp_to_datetime(self.started_at),
            ended_at: self.ended_at.map(timestamp_to_datetime),
            deleted_at: self.deleted_at.map(timestamp_to_datetime),
        }
    }
}

impl From<&ScrapeSession> for SessionRow {
    fn from(session: &ScrapeSession) -> Self {
        Self {
            id: session.id.to_string(),
            name: session.name.clone(),
            source_url: session.source_url.clone(),
            status: session.status.as_str().to_string(),
            current_page: session.current_page,
            scraped_prospects_count: session.scraped_prospects_count,
            total_prospects_count: session.total_prospects_count,
            last_prospect_name: session.last_prospect_name.clone(),
            started_at: datetime_to_timestamp(session.started_at),
            ended_at: session.ended_at.map(datetime_to_timestamp),
            deleted_at: session.deleted_at.map(datetime_to_timestamp),
        }
    }
}
