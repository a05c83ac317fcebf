// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated session: credential pair, refresh flow, logout, and the
//! auth-state channel other components follow.

pub mod claims;
pub mod monitor;
pub mod refresh;
pub mod store;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::api::ApiClient;
use crate::error::ErrorKind;
use crate::session::refresh::RefreshPlan;
use crate::session::store::{Credential, CredentialStore};

/// Snapshot published on every auth transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthState {
    pub authenticated: bool,
    /// Epoch ms of the last successful refresh.
    pub last_refresh: Option<u64>,
}

/// The slice of [`Session`] the token monitor drives.
pub trait SessionControl: Send + Sync {
    fn stored_credential(&self) -> anyhow::Result<Option<Credential>>;
    fn is_authenticated(&self) -> bool;
    /// Start a refresh without waiting for it.
    fn request_refresh(&self);
    /// Start a logout without waiting for it.
    fn force_logout(&self);
}

pub struct Session {
    me: Weak<Session>,
    store: Arc<dyn CredentialStore>,
    api: ApiClient,
    state: watch::Sender<AuthState>,
    refresh_timer: Mutex<Option<(u64, AbortHandle)>>,
    timer_seq: AtomicU64,
    refreshing: AtomicBool,
}

/// Clears the in-flight flag when a refresh finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>, api: ApiClient) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            store,
            api,
            state: watch::Sender::new(AuthState::default()),
            refresh_timer: Mutex::new(None),
            timer_seq: AtomicU64::new(0),
            refreshing: AtomicBool::new(false),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn auth_state(&self) -> AuthState {
        *self.state.borrow()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().authenticated
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn credential(&self) -> anyhow::Result<Option<Credential>> {
        self.store.load()
    }

    /// Current access token, if any is stored.
    pub fn access_token(&self) -> Option<String> {
        match self.store.load() {
            Ok(credential) => credential.map(|c| c.access),
            Err(e) => {
                tracing::warn!(err = %e, kind = %ErrorKind::Credential, "credential load failed");
                None
            }
        }
    }

    /// Adopt a freshly issued credential pair.
    pub fn login(&self, credential: Credential) -> anyhow::Result<()> {
        self.store.save(&credential)?;
        self.state.send_modify(|s| s.authenticated = true);
        tracing::info!(access_expiry = ?credential.access_expiry(), "session authenticated");
        self.schedule_refresh(&credential.access, false);
        Ok(())
    }

    /// Restore the session from the store at startup. Returns whether the
    /// session ends up authenticated.
    pub async fn init(&self) -> anyhow::Result<bool> {
        let Some(credential) = self.store.load()? else {
            tracing::info!("no stored credential");
            return Ok(false);
        };

        let now = epoch_ms() / 1000;
        if claims::is_expired(&credential.refresh, now) {
            tracing::info!("stored refresh token expired, logging out");
            self.logout().await;
            return Ok(false);
        }

        if claims::is_expired(&credential.access, now) {
            tracing::info!("stored access token expired, refreshing");
            return match self.refresh().await {
                Ok(_) => Ok(true),
                Err(e) => {
                    tracing::warn!(err = %e, "startup refresh failed");
                    Ok(false)
                }
            };
        }

        self.state.send_modify(|s| s.authenticated = true);
        tracing::info!(access_expiry = ?credential.access_expiry(), "session restored");
        self.schedule_refresh(&credential.access, false);
        Ok(true)
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// A missing refresh token is an error that leaves the session alone. A
    /// rejected refresh clears the credential and logs out.
    pub async fn refresh(&self) -> anyhow::Result<String> {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            anyhow::bail!("refresh already in flight");
        }
        let _in_flight = InFlight(&self.refreshing);

        let Some(current) = self.store.load()? else {
            anyhow::bail!("no refresh token stored");
        };

        match self.api.refresh_token(&current.refresh).await {
            Ok(resp) => {
                let credential = Credential {
                    access: resp.access,
                    refresh: resp.refresh.unwrap_or(current.refresh),
                };
                self.store.save(&credential)?;
                let now = epoch_ms();
                self.state.send_replace(AuthState { authenticated: true, last_refresh: Some(now) });
                tracing::info!(access_expiry = ?credential.access_expiry(), "access token refreshed");
                self.schedule_refresh(&credential.access, true);
                Ok(credential.access)
            }
            Err(e) => {
                tracing::warn!(err = %e, kind = %ErrorKind::Credential, "token refresh rejected");
                self.logout().await;
                Err(e)
            }
        }
    }

    /// End the session. The backend call is best effort; local state is
    /// always cleared.
    pub async fn logout(&self) {
        self.cancel_refresh_timer();

        match self.store.load() {
            Ok(Some(credential)) => {
                if let Err(e) = self.api.logout(&credential.refresh).await {
                    tracing::debug!(err = %e, "logout request failed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(err = %e, "credential load failed during logout"),
        }

        if let Err(e) = self.store.clear() {
            tracing::warn!(err = %e, kind = %ErrorKind::Credential, "credential clear failed");
        }
        self.state.send_replace(AuthState::default());
        tracing::info!("session logged out");
    }

    /// Arm the proactive refresh one minute before `access` expires.
    ///
    /// Right after a refresh, a token already inside that window is left to
    /// the monitor so a short-lived token cannot loop the refresh endpoint.
    fn schedule_refresh(&self, access: &str, after_refresh: bool) {
        self.cancel_refresh_timer();

        let delay = match RefreshPlan::for_token(access, epoch_ms()) {
            RefreshPlan::At(delay) => delay,
            RefreshPlan::Now if !after_refresh => {
                self.request_refresh();
                return;
            }
            plan => {
                tracing::debug!(?plan, "proactive refresh not scheduled");
                return;
            }
        };

        let seq = self.timer_seq.fetch_add(1, Ordering::Relaxed);
        let me = self.me.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(session) = me.upgrade() else { return };
            {
                let mut slot = session.refresh_timer.lock();
                if matches!(*slot, Some((armed, _)) if armed == seq) {
                    *slot = None;
                }
            }
            if let Err(e) = session.refresh().await {
                tracing::debug!(err = %e, "proactive refresh failed");
            }
        });
        tracing::debug!(delay_ms = delay.as_millis() as u64, "proactive refresh scheduled");
        *self.refresh_timer.lock() = Some((seq, handle.abort_handle()));
    }

    fn cancel_refresh_timer(&self) {
        if let Some((_, handle)) = self.refresh_timer.lock().take() {
            handle.abort();
        }
    }

    pub fn refresh_scheduled(&self) -> bool {
        self.refresh_timer.lock().as_ref().is_some_and(|(_, handle)| !handle.is_finished())
    }
}

impl SessionControl for Session {
    fn stored_credential(&self) -> anyhow::Result<Option<Credential>> {
        self.store.load()
    }

    fn is_authenticated(&self) -> bool {
        Session::is_authenticated(self)
    }

    fn request_refresh(&self) {
        let Some(session) = self.me.upgrade() else { return };
        tokio::spawn(async move {
            if let Err(e) = session.refresh().await {
                tracing::debug!(err = %e, "requested refresh failed");
            }
        });
    }

    fn force_logout(&self) {
        let Some(session) = self.me.upgrade() else { return };
        tokio::spawn(async move { session.logout().await });
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_refresh_timer();
    }
}

pub(crate) fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
