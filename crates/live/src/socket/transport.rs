// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Close code for a normal, client- or server-initiated closure.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close code reported when the connection dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Identifies one transport connection. Callbacks tagged with an id other
/// than the manager's current one come from a detached connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseInfo {
    pub was_clean: bool,
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    /// Closure initiated by this client.
    pub fn client() -> Self {
        Self { was_clean: true, code: NORMAL_CLOSURE, reason: "client".to_owned() }
    }

    /// Connection lost without a close handshake.
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self { was_clean: false, code: ABNORMAL_CLOSURE, reason: reason.into() }
    }

    /// Whether this closure should trigger an automatic reconnect.
    pub fn wants_reconnect(&self) -> bool {
        !self.was_clean && self.code != NORMAL_CLOSURE
    }
}

/// Callbacks a transport reports for a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Open,
    Message(String),
    Close(CloseInfo),
    Error(String),
}

/// Per-connection options, kept alongside the URI for automatic reconnects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Extra headers on the upgrade request.
    pub headers: Vec<(String, String)>,
    pub connect_timeout: Option<Duration>,
}

/// Bidirectional socket primitive.
///
/// Implementations deliver [`TransportEvent`]s for `id` asynchronously; none
/// of these calls may block.
pub trait Transport: Send {
    /// Begin opening a connection. An `Err` means the attempt could not even
    /// start (e.g. malformed URI).
    fn open(&mut self, id: ConnectionId, uri: &str, options: &ConnectOptions) -> anyhow::Result<()>;

    fn send(&mut self, id: ConnectionId, text: &str) -> anyhow::Result<()>;

    /// Close and forget `id`. No further events for it are expected.
    fn close(&mut self, id: ConnectionId, code: u16, reason: &str);
}
