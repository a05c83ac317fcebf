// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: fake transport, manual clock, token builders.

use std::sync::{Arc, Once};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;

use crate::socket::clock::{Clock, TimerId};
use crate::socket::transport::{ConnectOptions, ConnectionId, Transport};

/// Everything the fake transport was asked to do, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Open { id: ConnectionId, uri: String },
    Send { id: ConnectionId, text: String },
    Close { id: ConnectionId, code: u16 },
}

#[derive(Debug, Default)]
struct FakeTransportState {
    calls: Vec<TransportCall>,
    fail_open: bool,
    fail_send: bool,
}

/// Transport that records calls. Tests feed callbacks to the manager directly.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeTransportState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().calls.clone()
    }

    /// Ids passed to `open`, in order.
    pub fn opened(&self) -> Vec<ConnectionId> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                TransportCall::Open { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Texts sent on `id`, in order.
    pub fn sent_on(&self, id: ConnectionId) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                TransportCall::Send { id: sent, text } if *sent == id => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_opened(&self) -> Option<ConnectionId> {
        self.opened().last().copied()
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.state.lock().fail_send = fail;
    }
}

impl Transport for FakeTransport {
    fn open(&mut self, id: ConnectionId, uri: &str, _options: &ConnectOptions) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        if state.fail_open {
            anyhow::bail!("refused: {uri}");
        }
        state.calls.push(TransportCall::Open { id, uri: uri.to_owned() });
        Ok(())
    }

    fn send(&mut self, id: ConnectionId, text: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        if state.fail_send {
            anyhow::bail!("send failed");
        }
        state.calls.push(TransportCall::Send { id, text: text.to_owned() });
        Ok(())
    }

    fn close(&mut self, id: ConnectionId, code: u16, _reason: &str) {
        self.state.lock().calls.push(TransportCall::Close { id, code });
    }
}

#[derive(Debug, Default)]
struct ManualClockState {
    next_id: u64,
    pending: Vec<(TimerId, Duration)>,
    cancelled: Vec<TimerId>,
}

/// Clock whose timers fire only when the test says so.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualClockState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timers set and not yet cancelled or taken.
    pub fn pending(&self) -> Vec<(TimerId, Duration)> {
        self.state.lock().pending.clone()
    }

    pub fn cancelled(&self) -> Vec<TimerId> {
        self.state.lock().cancelled.clone()
    }

    /// Remove and return the oldest pending timer, as if it fired.
    pub fn take_next(&self) -> Option<(TimerId, Duration)> {
        let mut state = self.state.lock();
        if state.pending.is_empty() {
            None
        } else {
            Some(state.pending.remove(0))
        }
    }
}

impl Clock for ManualClock {
    fn set_timer(&mut self, delay: Duration) -> TimerId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = TimerId(state.next_id);
        state.pending.push((id, delay));
        id
    }

    fn cancel_timer(&mut self, id: TimerId) {
        let mut state = self.state.lock();
        state.pending.retain(|(pending, _)| *pending != id);
        state.cancelled.push(id);
    }
}

static CRYPTO: Once = Once::new();

/// Install the rustls crypto provider (needed for reqwest even on plain HTTP).
pub fn ensure_crypto_provider() {
    CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Current time as epoch seconds.
pub fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Unsigned JWT-shaped token with the given `exp` claim.
pub fn fake_jwt(exp: u64) -> String {
    fake_jwt_with(&serde_json::json!({ "exp": exp, "token_type": "access" }))
}

/// Unsigned JWT-shaped token with arbitrary claims.
pub fn fake_jwt_with(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}
