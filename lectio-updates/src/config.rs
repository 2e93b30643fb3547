//! Update engine configuration.

use crate::error::{UpdateError, UpdateResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for fetching and applying dataset updates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Base URL of the update API (e.g., "https://api.lectio.app").
    pub api_base_url: String,

    /// Per-request timeout for manifest fetches (seconds).
    pub request_timeout_secs: u64,

    /// Minimum time between two non-forced checks (seconds).
    pub cooldown_secs: u64,

    /// Tick interval of the background scheduler (seconds).
    pub check_interval_secs: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.lectio.app".to_string(),
            request_timeout_secs: 10,
            cooldown_secs: 24 * 60 * 60,
            check_interval_secs: 6 * 60 * 60,
        }
    }
}

impl UpdateConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(raw: &str) -> UpdateResult<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| UpdateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> UpdateResult<()> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(UpdateError::Config(format!(
                "api_base_url must be an http(s) URL, got {:?}",
                self.api_base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(UpdateError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.check_interval_secs == 0 {
            return Err(UpdateError::Config(
                "check_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.cooldown_secs).unwrap_or(i64::MAX))
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}
