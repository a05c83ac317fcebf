// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use crate::session::monitor::MonitorSettings;
use crate::socket::backoff::ReconnectPolicy;

/// Configuration for the live notification client.
#[derive(Debug, Clone, clap::Args)]
pub struct LiveConfig {
    /// Backend API base URL.
    #[arg(long, default_value = "http://localhost:8000/api", env = "LOTTO_API_URL")]
    pub api_url: String,

    /// WebSocket host (`host[:port]`). Derived from the API URL if unset.
    #[arg(long, env = "LOTTO_WS_HOST")]
    pub ws_host: Option<String>,

    /// Credential file. Defaults to `<state dir>/credentials.json`.
    #[arg(long, env = "LOTTO_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Access token to log in with, replacing any stored credential.
    #[arg(long, env = "LOTTO_ACCESS_TOKEN", requires = "refresh_token", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Refresh token paired with `--access-token`.
    #[arg(long, env = "LOTTO_REFRESH_TOKEN", requires = "access_token", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Token check interval in milliseconds.
    #[arg(long, default_value_t = 60_000, env = "LOTTO_CHECK_INTERVAL_MS")]
    pub check_interval_ms: u64,

    /// Refresh the access token when it has this many milliseconds left.
    #[arg(long, default_value_t = 300_000, env = "LOTTO_REFRESH_BUFFER_MS")]
    pub refresh_buffer_ms: u64,

    /// First reconnect delay in milliseconds.
    #[arg(long, default_value_t = 1000, env = "LOTTO_RECONNECT_INTERVAL_MS")]
    pub reconnect_interval_ms: u64,

    /// Upper bound on the reconnect delay in milliseconds.
    #[arg(long, default_value_t = 30_000, env = "LOTTO_MAX_RECONNECT_DELAY_MS")]
    pub max_reconnect_delay_ms: u64,

    /// Consecutive automatic reconnects before giving up.
    #[arg(long, default_value_t = 10, env = "LOTTO_MAX_RECONNECT_ATTEMPTS")]
    pub max_reconnect_attempts: u32,

    /// Push subscription (JSON string) to register once authenticated.
    #[arg(long, env = "LOTTO_PUSH_SUBSCRIPTION")]
    pub push_subscription: Option<String>,
}

impl LiveConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn refresh_buffer(&self) -> Duration {
        Duration::from_millis(self.refresh_buffer_ms)
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings { check_interval: self.check_interval(), refresh_buffer: self.refresh_buffer() }
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            interval: Duration::from_millis(self.reconnect_interval_ms),
            max_delay: Duration::from_millis(self.max_reconnect_delay_ms),
            max_attempts: self.max_reconnect_attempts,
            ..ReconnectPolicy::default()
        }
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.credentials.clone().unwrap_or_else(|| state_dir().join("credentials.json"))
    }
}

/// Resolve the state directory.
///
/// Checks `LOTTO_LIVE_STATE_DIR`, then `$XDG_STATE_HOME/lotto-live`,
/// then `$HOME/.local/state/lotto-live`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LOTTO_LIVE_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("lotto-live");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/lotto-live");
    }
    PathBuf::from(".lotto-live")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
