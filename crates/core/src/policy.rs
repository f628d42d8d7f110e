//! Quota and time-window policy.
//!
//! Pure decision functions: no clocks, no I/O. Callers supply `now` and the
//! used counter; the store owns the durable counters themselves.

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// The per-day quota buckets. Messages and connection requests are counted
/// separately; prospect scraping has its own bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Message,
    ConnectionRequest,
    ProspectScrape,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::ConnectionRequest => "connection_request",
            Self::ProspectScrape => "prospect_scrape",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(Self::Message),
            "connection_request" => Some(Self::ConnectionRequest),
            "prospect_scrape" => Some(Self::ProspectScrape),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quotas {
    pub messages: u32,
    pub connection_requests: u32,
    pub prospects: u32,
}

impl Default for Quotas {
    fn default() -> Self {
        Self {
            messages: 50,
            connection_requests: 25,
            prospects: 200,
        }
    }
}

/// Pacing rules for all outbound platform actions.
///
/// The timezone is a fixed UTC offset in minutes; quota days roll over at
/// local midnight in that offset. The send window is the half-open hour
/// range `[window_start_hour, window_end_hour)`; equal bounds mean the
/// window never closes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PacingPolicy {
    pub quotas: Quotas,
    pub window_start_hour: u32,
    pub window_end_hour: u32,
    pub utc_offset_minutes: i32,
    pub min_action_delay_secs: u64,
    pub max_action_delay_secs: u64,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            quotas: Quotas::default(),
            window_start_hour: 8,
            window_end_hour: 20,
            utc_offset_minutes: 0,
            min_action_delay_secs: 30,
            max_action_delay_secs: 120,
        }
    }
}

impl PacingPolicy {
    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }

    fn local(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.offset())
    }

    pub fn quota(&self, action: ActionType) -> u32 {
        match action {
            ActionType::Message => self.quotas.messages,
            ActionType::ConnectionRequest => self.quotas.connection_requests,
            ActionType::ProspectScrape => self.quotas.prospects,
        }
    }

    /// The local calendar day `now` falls into; used as the durable quota
    /// counter key. A send at 23:59:59 and one at 00:00:01 local land on
    /// different days.
    pub fn quota_day(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local(now).date_naive()
    }

    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        if self.window_start_hour == self.window_end_hour {
            return true;
        }
        let hour = self.local(now).hour();
        if self.window_start_hour < self.window_end_hour {
            hour >= self.window_start_hour && hour < self.window_end_hour
        } else {
            // Window crosses local midnight.
            hour >= self.window_start_hour || hour < self.window_end_hour
        }
    }

    /// Whether one more `action` is permitted right now, given `used`
    /// actions already recorded for the current local day.
    pub fn can_act(&self, action: ActionType, now: DateTime<Utc>, used: u32) -> bool {
        self.in_window(now) && used < self.quota(action)
    }

    /// How many more `action`s today's quota allows.
    pub fn remaining(&self, action: ActionType, used: u32) -> u32 {
        self.quota(action).saturating_sub(used)
    }
}
