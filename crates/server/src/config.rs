use std::path::Path;
use std::time::Duration;

use orchestrator::{ScrapeConfig, SequenceSchedulerConfig};
use outreach_core::policy::PacingPolicy;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

/// Application configuration, stored as JSON. Missing file or unparsable
/// content falls back to defaults with a warning; the server always comes
/// up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// Base URL of the automation bridge the platform driver talks to.
    pub bridge_url: String,
    pub bridge_timeout_secs: u64,
    pub pacing: PacingPolicy,
    pub scrape: ScrapeSettings,
    pub scheduler: SchedulerSettings,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:outreach.db".to_string(),
            bind_addr: "127.0.0.1:3001".to_string(),
            bridge_url: "http://127.0.0.1:4500".to_string(),
            bridge_timeout_secs: 30,
            pacing: PacingPolicy::default(),
            scrape: ScrapeSettings::default(),
            scheduler: SchedulerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub page_timeout_secs: u64,
    pub max_page_retries: u32,
    pub retry_base_secs: u64,
    pub retry_max_secs: u64,
    pub page_delay_secs: u64,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            page_timeout_secs: 30,
            max_page_retries: 3,
            retry_base_secs: 2,
            retry_max_secs: 60,
            page_delay_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub pass_interval_secs: u64,
    pub batch_limit: i64,
    pub send_timeout_secs: u64,
    pub transient_backoff_secs: u64,
    pub max_transient_attempts: u32,
    pub connection_grace_hours: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            pass_interval_secs: 60,
            batch_limit: 50,
            send_timeout_secs: 30,
            transient_backoff_secs: 15 * 60,
            max_transient_attempts: 5,
            connection_grace_hours: 24,
        }
    }
}

impl OutreachConfig {
    pub async fn read(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "Config file does not exist, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    debug!(path = %path.display(), "Config loaded successfully");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                Self::default()
            }
        }
    }

    pub fn scrape_config(&self) -> ScrapeConfig {
        ScrapeConfig {
            page_timeout: Duration::from_secs(self.scrape.page_timeout_secs),
            max_page_retries: self.scrape.max_page_retries,
            retry_base_delay: Duration::from_secs(self.scrape.retry_base_secs),
            retry_max_delay: Duration::from_secs(self.scrape.retry_max_secs),
            page_delay: Duration::from_secs(self.scrape.page_delay_secs),
        }
    }

    pub fn scheduler_config(&self) -> SequenceSchedulerConfig {
        SequenceSchedulerConfig {
            pass_interval: Duration::from_secs(self.scheduler.pass_interval_secs),
            batch_limit: self.scheduler.batch_limit,
            send_timeout: Duration::from_secs(self.scheduler.send_timeout_secs),
            transient_backoff: Duration::from_secs(self.scheduler.transient_backoff_secs),
            max_transient_attempts: self.scheduler.max_transient_attempts,
            connection_grace: Duration::from_secs(self.scheduler.connection_grace_hours * 60 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_read_nonexistent_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = OutreachConfig::read(&temp_dir.path().join("missing.json")).await;
        assert_eq!(config.bind_addr, "127.0.0.1:3001");
        assert_eq!(config.scheduler.pass_interval_secs, 60);
    }

    #[tokio::test]
    async fn test_config_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("outreach.json");
        tokio::fs::write(
            &path,
            r#"{"bind_addr": "0.0.0.0:8080", "pacing": {"quotas": {"messages": 5, "connection_requests": 2, "prospects": 50}, "window_start_hour": 9, "window_end_hour": 17, "utc_offset_minutes": 60, "min_action_delay_secs": 10, "max_action_delay_secs": 40}}"#,
        )
        .await
        .unwrap();

        let config = OutreachConfig::read(&path).await;
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.pacing.quotas.messages, 5);
        assert_eq!(config.pacing.utc_offset_minutes, 60);
        // Untouched sections keep defaults.
        assert_eq!(config.database_url, "sqlite:outreach.db");
        assert_eq!(config.scrape.max_page_retries, 3);
    }

    #[tokio::test]
    async fn test_config_garbage_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("outreach.json");
        tokio::fs::write(&path, "not json at all").await.unwrap();

        let config = OutreachConfig::read(&path).await;
        assert_eq!(config.bridge_timeout_secs, 30);
    }

    #[test]
    fn test_duration_conversions() {
        let config = OutreachConfig::default();
        assert_eq!(config.scrape_config().page_timeout, Duration::from_secs(30));
        assert_eq!(
            config.scheduler_config().connection_grace,
            Duration::from_secs(24 * 60 * 60)
        );
    }
}
