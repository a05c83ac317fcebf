// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification bridge: keeps the socket connected while the session is
//! authenticated and republishes notification traffic as [`BridgeEvent`]s.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::session::{AuthState, Session};
use crate::socket::event::{EventKind, Notification, SocketEvent};
use crate::socket::service::SocketHandle;
use crate::socket::transport::ConnectOptions;

/// Where the notification socket lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    secure: bool,
    host: String,
}

impl Endpoint {
    /// Derive from the API base URL. `ws_host` overrides the host; the scheme
    /// always follows the API (`https` → `wss`).
    pub fn new(api_url: &str, ws_host: Option<&str>) -> anyhow::Result<Self> {
        let url = reqwest::Url::parse(api_url)?;
        let secure = url.scheme() == "https";
        let host = match ws_host.filter(|h| !h.is_empty()) {
            Some(host) => host.trim_end_matches('/').to_owned(),
            None => {
                let Some(name) = url.host_str() else {
                    anyhow::bail!("api url {api_url} has no host");
                };
                match url.port() {
                    Some(port) => format!("{name}:{port}"),
                    None => name.to_owned(),
                }
            }
        };
        Ok(Self { secure, host })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn notifications_uri(&self, token: &str) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}/ws/notifications/?token={token}", self.host)
    }
}

/// What bridge subscribers see.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    Connection { connected: bool },
    Notification(Box<Notification>),
    Error(String),
}

pub struct NotificationBridge {
    socket: SocketHandle,
    session: Arc<Session>,
    endpoint: Endpoint,
    events: broadcast::Sender<BridgeEvent>,
}

impl NotificationBridge {
    pub fn new(socket: SocketHandle, session: Arc<Session>, endpoint: Endpoint) -> Self {
        let (events, _) = broadcast::channel(64);
        Self { socket, session, endpoint, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    pub fn socket(&self) -> &SocketHandle {
        &self.socket
    }

    /// Register socket handlers, then follow the session's auth state until
    /// `shutdown` fires.
    pub async fn start(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let tx = self.events.clone();
        self.socket
            .on(EventKind::Connect, move |_| {
                tracing::info!("notification socket connected");
                let _ = tx.send(BridgeEvent::Connection { connected: true });
                Ok(())
            })
            .await?;

        let tx = self.events.clone();
        self.socket
            .on(EventKind::Notification, move |event| {
                if let SocketEvent::Notification { notification: Some(notification), .. } = event {
                    tracing::info!(
                        id = notification.id,
                        notification_type = %notification.notification_type,
                        high_priority = notification.is_high_priority(),
                        "notification received"
                    );
                    let _ = tx.send(BridgeEvent::Notification(notification.clone()));
                }
                Ok(())
            })
            .await?;

        let tx = self.events.clone();
        self.socket
            .on(EventKind::Error, move |event| {
                if let SocketEvent::Error { message, .. } = event {
                    let _ = tx.send(BridgeEvent::Error(message.clone()));
                }
                Ok(())
            })
            .await?;

        let tx = self.events.clone();
        self.socket
            .on(EventKind::Disconnect, move |event| {
                if let SocketEvent::Disconnect(info) = event {
                    tracing::info!(code = info.code, reason = %info.reason, "notification socket closed");
                }
                let _ = tx.send(BridgeEvent::Connection { connected: false });
                Ok(())
            })
            .await?;

        tokio::spawn(follow_auth(
            self.session.subscribe(),
            Arc::clone(&self.session),
            self.socket.clone(),
            self.endpoint.clone(),
            shutdown,
        ));
        Ok(())
    }

    /// Register a push subscription with the backend. Any failure reads as
    /// `false`.
    pub async fn subscribe_push(&self, subscription: &str) -> bool {
        let Some(access) = self.session.access_token() else {
            tracing::debug!("push subscription skipped, not logged in");
            return false;
        };
        match self.session.api().subscribe_notifications(&access, subscription).await {
            Ok(accepted) => {
                tracing::info!(accepted, "push subscription registered");
                accepted
            }
            Err(e) => {
                tracing::warn!(err = %e, "push subscription failed");
                false
            }
        }
    }
}

async fn follow_auth(
    mut auth: watch::Receiver<AuthState>,
    session: Arc<Session>,
    socket: SocketHandle,
    endpoint: Endpoint,
    shutdown: CancellationToken,
) {
    // Access token the socket endpoint was built from.
    let mut following: Option<String> = None;
    loop {
        let authenticated = auth.borrow_and_update().authenticated;
        if authenticated {
            match session.access_token() {
                Some(token) if following.as_deref() != Some(token.as_str()) => {
                    let uri = endpoint.notifications_uri(&token);
                    if following.is_some() {
                        tracing::debug!("access token rotated, retargeting notification socket");
                        socket.retarget(uri);
                    } else {
                        socket.connect(uri, ConnectOptions::default());
                    }
                    following = Some(token);
                }
                _ => {}
            }
        } else if following.take().is_some() {
            socket.disconnect();
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = auth.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
