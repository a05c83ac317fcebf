// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic credential check: refresh ahead of expiry, log out once the
//! refresh token is gone.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::ErrorKind;
use crate::session::{claims, epoch_ms, SessionControl};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub check_interval: Duration,
    /// Refresh once the access token has this long or less to live.
    pub refresh_buffer: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self { check_interval: Duration::from_secs(60), refresh_buffer: Duration::from_secs(5 * 60) }
    }
}

/// Outcome of one [`TokenMonitor::check_tokens`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCheck {
    /// One or both tokens absent; monitoring stopped.
    Missing,
    /// Refresh token expired or unreadable; logout started, monitoring stopped.
    SessionExpired,
    /// Refresh started. `expires_in` is `None` when the access token could
    /// not be decoded.
    Refreshing { expires_in: Option<Duration> },
    Valid { expires_in: Duration },
    /// The store could not be read; monitoring continues.
    StoreUnavailable,
}

impl TokenCheck {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Refreshing { .. } | Self::Valid { .. })
    }
}

pub struct TokenMonitor {
    me: Weak<TokenMonitor>,
    session: Arc<dyn SessionControl>,
    settings: MonitorSettings,
    running: Mutex<Option<CancellationToken>>,
}

impl TokenMonitor {
    pub fn new(session: Arc<dyn SessionControl>, settings: MonitorSettings) -> Arc<Self> {
        Arc::new_cyclic(|me| Self { me: me.clone(), session, settings, running: Mutex::new(None) })
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Check now, then every `check_interval`. Replaces any running loop.
    pub fn start_monitoring(&self) -> TokenCheck {
        self.stop_monitoring();

        let cancel = CancellationToken::new();
        *self.running.lock() = Some(cancel.clone());
        tokio::spawn(tick_loop(self.me.clone(), self.settings.check_interval, cancel));
        tracing::info!(interval_ms = self.settings.check_interval.as_millis() as u64, "token monitoring started");

        self.check_tokens()
    }

    pub fn stop_monitoring(&self) {
        if let Some(cancel) = self.running.lock().take() {
            cancel.cancel();
            tracing::info!("token monitoring stopped");
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn check_tokens(&self) -> TokenCheck {
        self.check_tokens_at(epoch_ms())
    }

    pub fn check_tokens_at(&self, now_ms: u64) -> TokenCheck {
        let credential = match self.session.stored_credential() {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                self.stop_monitoring();
                return TokenCheck::Missing;
            }
            Err(e) => {
                tracing::warn!(err = %e, kind = %ErrorKind::Credential, "token check failed");
                return TokenCheck::StoreUnavailable;
            }
        };

        if claims::is_expired(&credential.refresh, now_ms / 1000) {
            tracing::info!("refresh token expired, logging out");
            self.session.force_logout();
            self.stop_monitoring();
            return TokenCheck::SessionExpired;
        }

        match claims::millis_until_expiry(&credential.access, now_ms) {
            Ok(remaining) if remaining <= self.settings.refresh_buffer.as_millis() as i64 => {
                let expires_in = Duration::from_millis(remaining.max(0) as u64);
                tracing::info!(expires_in_secs = expires_in.as_secs(), "access token expiring, refreshing");
                self.session.request_refresh();
                TokenCheck::Refreshing { expires_in: Some(expires_in) }
            }
            Ok(remaining) => TokenCheck::Valid { expires_in: Duration::from_millis(remaining as u64) },
            Err(e) => {
                tracing::warn!(err = %e, kind = %ErrorKind::Credential, "access token unreadable, refreshing");
                self.session.request_refresh();
                TokenCheck::Refreshing { expires_in: None }
            }
        }
    }
}

impl Drop for TokenMonitor {
    fn drop(&mut self) {
        if let Some(cancel) = self.running.get_mut().take() {
            cancel.cancel();
        }
    }
}

async fn tick_loop(monitor: Weak<TokenMonitor>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(monitor) = monitor.upgrade() else { break };
                let check = monitor.check_tokens();
                tracing::debug!(?check, "token check");
            }
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
