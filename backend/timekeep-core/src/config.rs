// src/config.rs

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::api_client::{ApiConfig, DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS};

pub const ENV_PREFIX: &str = "TIMEKEEP_";
pub const DEFAULT_NOTIFICATION_STATE_FILE: &str = "timekeep_notifications.json";

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_display_refresh_millis() -> u64 {
    1000
}

fn default_day_check_secs() -> u64 {
    60
}

fn default_notification_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_NOTIFICATION_STATE_FILE)
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    // Collaborator API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    pub api_token: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    // Background refresh
    #[serde(default = "default_display_refresh_millis")]
    pub display_refresh_millis: u64,
    #[serde(default = "default_day_check_secs")]
    pub day_check_secs: u64,

    // Delivered and unread overtime decisions, shared between runs
    #[serde(default = "default_notification_state_path")]
    pub notification_state_path: PathBuf,

    // Payroll
    #[serde(default)]
    pub staff_house: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        envy::prefixed(ENV_PREFIX).from_env::<AppConfig>()
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(vars)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_base_url.clone(),
            bearer_token: self.api_token.clone(),
            timeout_secs: self.http_timeout_secs,
        }
    }

    pub fn display_refresh(&self) -> Duration {
        Duration::from_millis(self.display_refresh_millis.max(1))
    }

    pub fn day_check(&self) -> Duration {
        Duration::from_secs(self.day_check_secs.max(1))
    }
}
