// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lotto-live: resilient notification socket and JWT session upkeep for the
//! lottery backend.

pub mod api;
pub mod config;
pub mod error;
pub mod notify;
pub mod session;
pub mod socket;
pub mod test_support;

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::config::LiveConfig;
use crate::notify::{BridgeEvent, Endpoint, NotificationBridge};
use crate::session::monitor::TokenMonitor;
use crate::session::store::{Credential, FileCredentialStore};
use crate::session::Session;
use crate::socket::event::{EventKind, SocketEvent};
use crate::socket::service::spawn_ws_socket;

/// Run the client until ctrl-c.
pub async fn run(config: LiveConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, shutting down");
            }
            shutdown.cancel();
        });
    }
    run_until(config, shutdown).await
}

/// Run the client until `shutdown` fires.
pub async fn run_until(config: LiveConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let endpoint = Endpoint::new(&config.api_url, config.ws_host.as_deref())?;
    let store = FileCredentialStore::new(config.credentials_path());
    tracing::debug!(path = %store.path().display(), "credential store");
    let session = Session::new(Arc::new(store), ApiClient::new(config.api_url.clone()));

    match (config.access_token.clone(), config.refresh_token.clone()) {
        (Some(access), Some(refresh)) => session.login(Credential::new(access, refresh))?,
        _ => {
            if !session.init().await? {
                tracing::warn!("not logged in; waiting for credentials");
            }
        }
    }

    let socket = spawn_ws_socket(config.reconnect_policy(), shutdown.clone());
    socket
        .on(EventKind::ReconnectFailed, |event| {
            if let SocketEvent::ReconnectFailed { attempts, max } = event {
                tracing::warn!(attempts, max, "notification socket gave up reconnecting");
            }
            Ok(())
        })
        .await?;

    let bridge = NotificationBridge::new(socket.clone(), Arc::clone(&session), endpoint);
    tokio::spawn(print_notifications(bridge.subscribe(), shutdown.clone()));
    bridge.start(shutdown.clone()).await?;

    let monitor = TokenMonitor::new(session.clone(), config.monitor_settings());
    let mut auth = session.subscribe();
    let mut pushed = false;
    loop {
        let authenticated = auth.borrow_and_update().authenticated;
        if authenticated && !monitor.is_monitoring() {
            monitor.start_monitoring();
        }
        if authenticated && !pushed {
            if let Some(subscription) = config.push_subscription.as_deref() {
                pushed = bridge.subscribe_push(subscription).await;
            }
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

    monitor.stop_monitoring();
    socket.disconnect();
    Ok(())
}

/// Write each notification to stdout as one JSON line.
async fn print_notifications(mut events: broadcast::Receiver<BridgeEvent>, shutdown: CancellationToken) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => event,
        };
        match event {
            Ok(BridgeEvent::Notification(notification)) => match serde_json::to_string(&notification) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(err = %e, "notification not printable"),
            },
            Ok(BridgeEvent::Connection { connected }) => tracing::debug!(connected, "connection changed"),
            Ok(BridgeEvent::Error(message)) => tracing::debug!(%message, "socket error"),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "notification output lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
