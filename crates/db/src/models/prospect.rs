use outreach_core::Prospect;
use uuid::Uuid;

use super::{datetime_to_timestamp, timestamp_to_datetime};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProspectRow {
    pub id: String,
    pub session_id: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub job_title: String,
    pub profile_url: String,
    pub scraped_at: i64,
    pub deleted_at: Option<i64>,
}

impl ProspectRow {
    pub fn into_domain(self) -> Prospect {
        Prospect {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            session_id: Uuid::parse_str(&self.session_id).unwrap_or_default(),
            first_name: self.first_name,
            last_name: self.last_name,
            company: self.company,
            job_title: self.job_title,
            profile_url: self.profile_url,
            scraped_at: timestamp_to_datetime(self.scraped_at),
            deleted_at: self.deleted_at.map(timestamp_to_datetime),
        }
    }
}

impl From<&Prospect> for ProspectRow {
    fn from(prospect: &Prospect) -> Self {
        Self {
            id: prospect.id.to_string(),
            session_id: prospect.session_id.to_string(),
            first_name: prospect.first_name.clone(),
            last_name: prospect.last_name.clone(),
            company: prospect.company.clone(),
            job_title: prospect.job_title.clone(),
            profile_url: prospect.profile_url.clone(),
            scraped_at: datetime_to_timestamp(prospect.scraped_at),
            deleted_at: prospect.deleted_at.map(datetime_to_timestamp),
        }
    }
}
