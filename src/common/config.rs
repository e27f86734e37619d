use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;

use crate::dashboard::SyncSettings;

/// Console configuration, read from the environment (and `.env`) once at
/// startup:
///
/// - `BACKEND_URL`         base URL of the bot service (required)
/// - `POLL_INTERVAL_SECS`  background refresh period (default 30)
/// - `REQUEST_TIMEOUT_MS`  per-request deadline (default 5000)
/// - `LOGS_LIMIT`          log entries requested per refresh (default 50)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DashboardConfig {
    pub backend_url: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_logs_limit")]
    pub logs_limit: usize,
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_logs_limit() -> usize {
    50
}

impl DashboardConfig {
    /// Loads `.env` if present, then the process environment. `overrides`
    /// win over both.
    pub fn from_env<I>(overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        dotenv::dotenv().ok();
        Self::from_pairs(std::env::vars().chain(overrides))
    }

    /// Parses an explicit set of variables; later pairs replace earlier ones.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = pairs.into_iter().collect();
        let cfg = envy::from_iter::<_, Self>(vars).context("parsing console configuration")?;
        cfg.validated()
    }

    fn validated(mut self) -> Result<Self> {
        let url = Url::parse(&self.backend_url)
            .with_context(|| format!("BACKEND_URL {:?} is not a valid URL", self.backend_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("BACKEND_URL must use http or https, got {}", url.scheme());
        }
        if self.poll_interval_secs == 0 {
            bail!("POLL_INTERVAL_SECS must be at least 1");
        }
        if self.request_timeout_ms == 0 {
            bail!("REQUEST_TIMEOUT_MS must be at least 1");
        }
        self.backend_url = self.backend_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            poll_interval: self.poll_interval(),
            request_timeout: self.request_timeout(),
            logs_limit: self.logs_limit,
        }
    }
}
