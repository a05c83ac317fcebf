// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use tokio::sync::mpsc;

use super::*;
use crate::api::ApiClient;
use crate::session::store::{Credential, MemoryCredentialStore};
use crate::socket::backoff::ReconnectPolicy;
use crate::socket::manager::ConnectionManager;
use crate::socket::service::spawn_socket;
use crate::socket::service::SocketStatus;
use crate::socket::transport::{CloseInfo, ReadyState, TransportEvent};
use crate::socket::Signal;
use crate::test_support::{
    ensure_crypto_provider, fake_jwt, now_secs, FakeTransport, ManualClock, TransportCall,
};

#[yare::parameterized(
    plain = { "http://localhost:8000/api", None, "ws://localhost:8000/ws/notifications/?token=t" },
    tls = { "https://lotto.example.com/api", None, "wss://lotto.example.com/ws/notifications/?token=t" },
    default_port_dropped = { "https://lotto.example.com:443/api/", None, "wss://lotto.example.com/ws/notifications/?token=t" },
    override_host = { "https://api.example.com/api", Some("live.example.com:9000"), "wss://live.example.com:9000/ws/notifications/?token=t" },
    empty_override = { "http://10.0.0.2:8000/api", Some(""), "ws://10.0.0.2:8000/ws/notifications/?token=t" },
)]
fn notifications_uri(api_url: &str, ws_host: Option<&str>, expected: &str) -> anyhow::Result<()> {
    let endpoint = Endpoint::new(api_url, ws_host)?;
    assert_eq!(endpoint.notifications_uri("t"), expected);
    Ok(())
}

#[test]
fn rejects_hostless_api_url() {
    assert!(Endpoint::new("not a url", None).is_err());
    assert!(Endpoint::new("file:///tmp/api", None).is_err());
}

struct Rig {
    bridge: NotificationBridge,
    session: Arc<Session>,
    transport: FakeTransport,
    signals: mpsc::UnboundedSender<Signal>,
    shutdown: CancellationToken,
}

async fn rig() -> anyhow::Result<Rig> {
    ensure_crypto_provider();
    let transport = FakeTransport::new();
    let manager =
        ConnectionManager::new(transport.clone(), ManualClock::new(), ReconnectPolicy::default());
    let (signals, signal_rx) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let socket = spawn_socket(manager, signal_rx, shutdown.clone());

    let session = Session::new(
        Arc::new(MemoryCredentialStore::new()),
        ApiClient::new("http://127.0.0.1:1/api"),
    );
    let bridge = NotificationBridge::new(
        socket,
        Arc::clone(&session),
        Endpoint::new("http://lotto.test/api", None)?,
    );
    bridge.start(shutdown.clone()).await?;
    Ok(Rig { bridge, session, transport, signals, shutdown })
}

async fn eventually(what: &str, mut check: impl FnMut() -> bool) -> anyhow::Result<()> {
    for _ in 0..200 {
        if check() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    anyhow::bail!("timed out waiting for {what}")
}

async fn status_until(
    bridge: &NotificationBridge,
    what: &str,
    check: impl Fn(&SocketStatus) -> bool,
) -> anyhow::Result<SocketStatus> {
    for _ in 0..200 {
        let status = bridge.socket().status().await?;
        if check(&status) {
            return Ok(status);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    anyhow::bail!("timed out waiting for {what}")
}

async fn next_event(rx: &mut broadcast::Receiver<BridgeEvent>) -> anyhow::Result<BridgeEvent> {
    Ok(tokio::time::timeout(Duration::from_secs(2), rx.recv()).await??)
}

#[tokio::test]
async fn follows_login_and_logout() -> anyhow::Result<()> {
    let rig = rig().await?;
    let mut events = rig.bridge.subscribe();
    assert!(rig.transport.opened().is_empty());

    let access = fake_jwt(now_secs() + 3600);
    rig.session.login(Credential::new(access.clone(), fake_jwt(now_secs() + 86_400)))?;
    eventually("open", || rig.transport.last_opened().is_some()).await?;

    let expected_uri = format!("ws://lotto.test/ws/notifications/?token={access}");
    let id = match rig.transport.calls().first() {
        Some(TransportCall::Open { id, uri }) if *uri == expected_uri => *id,
        other => anyhow::bail!("unexpected first call {other:?}"),
    };

    rig.signals.send(Signal::Transport { id, event: TransportEvent::Open })?;
    assert_eq!(next_event(&mut events).await?, BridgeEvent::Connection { connected: true });

    let frame = serde_json::json!({
        "type": "notification",
        "notification": {
            "id": 11,
            "title": "Draw results",
            "message": "Draw #42 is in",
            "notification_type": "draw_results",
            "created_at": "2026-01-01T00:00:00Z",
            "related_object_id": 42,
            "related_object_type": "draw",
        },
    });
    rig.signals
        .send(Signal::Transport { id, event: TransportEvent::Message(frame.to_string()) })?;
    match next_event(&mut events).await? {
        BridgeEvent::Notification(n) => {
            assert_eq!(n.id, 11);
            assert_eq!(n.related_object_id, Some(42));
            assert!(!n.is_read);
        }
        other => anyhow::bail!("expected notification, got {other:?}"),
    }

    rig.session.logout().await;
    assert_eq!(next_event(&mut events).await?, BridgeEvent::Connection { connected: false });
    eventually("close", || {
        rig.transport.calls().iter().any(|c| matches!(c, TransportCall::Close { id: closed, .. } if *closed == id))
    })
    .await?;

    rig.shutdown.cancel();
    Ok(())
}

#[tokio::test]
async fn transport_errors_are_republished() -> anyhow::Result<()> {
    let rig = rig().await?;
    let mut events = rig.bridge.subscribe();

    rig.session.login(Credential::new(fake_jwt(now_secs() + 3600), fake_jwt(now_secs() + 86_400)))?;
    eventually("open", || rig.transport.last_opened().is_some()).await?;
    let id = rig.transport.last_opened().ok_or_else(|| anyhow::anyhow!("not opened"))?;

    rig.signals
        .send(Signal::Transport { id, event: TransportEvent::Error("reset by peer".to_owned()) })?;
    assert_eq!(next_event(&mut events).await?, BridgeEvent::Error("reset by peer".to_owned()));
    Ok(())
}

#[tokio::test]
async fn push_subscription_needs_a_session() -> anyhow::Result<()> {
    let rig = rig().await?;
    assert!(!rig.bridge.subscribe_push(r#"{"endpoint":"https://push.test/1"}"#).await);

    rig.session.login(Credential::new(fake_jwt(now_secs() + 3600), fake_jwt(now_secs() + 86_400)))?;
    // Backend unreachable.
    assert!(!rig.bridge.subscribe_push(r#"{"endpoint":"https://push.test/1"}"#).await);
    Ok(())
}

#[tokio::test]
async fn rotated_token_retargets_the_socket() -> anyhow::Result<()> {
    let rig = rig().await?;
    let refresh = fake_jwt(now_secs() + 86_400);
    let first = fake_jwt(now_secs() + 3600);
    rig.session.login(Credential::new(first.clone(), refresh.clone()))?;
    eventually("open", || rig.transport.last_opened().is_some()).await?;
    let id = rig.transport.last_opened().ok_or_else(|| anyhow::anyhow!("not opened"))?;
    rig.signals.send(Signal::Transport { id, event: TransportEvent::Open })?;

    // A live connection stays up; only the stored endpoint moves.
    let second = fake_jwt(now_secs() + 7200);
    rig.session.login(Credential::new(second.clone(), refresh.clone()))?;
    let second_uri = format!("ws://lotto.test/ws/notifications/?token={second}");
    let status = status_until(&rig.bridge, "retarget", |s| {
        s.endpoint.as_deref() == Some(second_uri.as_str())
    })
    .await?;
    assert_eq!(status.state, ReadyState::Open);
    assert_eq!(rig.transport.opened(), vec![id]);

    // Once the server closes cleanly, the next rotation connects with the new token.
    rig.signals.send(Signal::Transport {
        id,
        event: TransportEvent::Close(CloseInfo { was_clean: true, code: 1000, reason: String::new() }),
    })?;
    status_until(&rig.bridge, "close", |s| s.state == ReadyState::Closed).await?;
    let third = fake_jwt(now_secs() + 10_800);
    rig.session.login(Credential::new(third.clone(), refresh))?;
    let third_uri = format!("ws://lotto.test/ws/notifications/?token={third}");
    eventually("reopen", || {
        rig.transport
            .calls()
            .iter()
            .any(|c| matches!(c, TransportCall::Open { uri, .. } if *uri == third_uri))
    })
    .await?;
    assert_eq!(rig.transport.opened().len(), 2);

    rig.shutdown.cancel();
    Ok(())
}
