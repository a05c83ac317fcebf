// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection state machine: `Closed → Connecting → Open → Closing → Closed`.
//!
//! All mutation goes through `&mut self`, so the owner decides the threading
//! model. [`crate::socket::service`] runs one manager per task.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ErrorKind;
use crate::socket::backoff::ReconnectPolicy;
use crate::socket::bus::{EventBus, Handler, SubscriptionId};
use crate::socket::clock::{Clock, TimerId};
use crate::socket::event::{EventKind, Payload, SocketEvent};
use crate::socket::transport::{
    CloseInfo, ConnectOptions, ConnectionId, ReadyState, Transport, TransportEvent, NORMAL_CLOSURE,
};

/// Result of [`ConnectionManager::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the open transport.
    Sent,
    /// Held in the outbox until the next successful open.
    Queued,
    /// Empty payload; nothing sent or queued.
    Rejected,
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Owns one logical WebSocket connection.
pub struct ConnectionManager<T, C> {
    transport: T,
    clock: C,
    policy: ReconnectPolicy,
    bus: EventBus,
    state: ReadyState,
    /// Live transport connection. Callbacks for any other id are ignored.
    current: Option<ConnectionId>,
    next_connection: u64,
    endpoint: Option<String>,
    options: ConnectOptions,
    reconnect_attempts: u32,
    reconnect_timer: Option<TimerId>,
    /// Set once the reconnect budget is spent. Sends stop reconnecting until
    /// an explicit `connect()` clears it.
    gave_up: bool,
    outbox: VecDeque<String>,
}

impl<T: Transport, C: Clock> ConnectionManager<T, C> {
    pub fn new(transport: T, clock: C, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            clock,
            policy,
            bus: EventBus::new(),
            state: ReadyState::Closed,
            current: None,
            next_connection: 0,
            endpoint: None,
            options: ConnectOptions::default(),
            reconnect_attempts: 0,
            reconnect_timer: None,
            gave_up: false,
            outbox: VecDeque::new(),
        }
    }

    // -- Commands ------------------------------------------------------------

    /// Tear down any existing connection and open a new one. Resets the
    /// reconnect budget.
    pub fn connect(&mut self, uri: impl Into<String>, options: ConnectOptions) {
        self.reconnect_attempts = 0;
        self.gave_up = false;
        self.establish(uri.into(), options);
    }

    /// Close the connection and cancel any scheduled reconnect. A no-op when
    /// there is nothing to close. A later `send` still reconnects to the last
    /// endpoint.
    pub fn disconnect(&mut self) {
        let had_timer = self.reconnect_timer.is_some();
        self.cancel_reconnect_timer();
        let had_connection = self.teardown();
        if had_connection || had_timer {
            tracing::debug!(endpoint = ?self.endpoint, "disconnected by client");
            self.emit(SocketEvent::Disconnect(CloseInfo::client()));
        }
    }

    /// Reconnect to the last endpoint unless a connection is already open or
    /// in progress.
    pub fn reconnect(&mut self) {
        self.cancel_reconnect_timer();
        if matches!(self.state, ReadyState::Open | ReadyState::Connecting) {
            return;
        }
        if let Some(uri) = self.endpoint.clone() {
            let options = self.options.clone();
            self.connect(uri, options);
        }
    }

    /// Point later reconnects at `uri` without disturbing a live, pending or
    /// scheduled connection. With none of those, connect to `uri` now.
    pub fn retarget(&mut self, uri: impl Into<String>) {
        let uri = uri.into();
        if self.reconnect_in_progress() {
            self.endpoint = Some(uri);
            return;
        }
        let options = self.options.clone();
        self.connect(uri, options);
    }

    /// Send now when open; otherwise queue and kick off a reconnect if none
    /// is in progress. Never fails for a closed connection.
    pub fn send(&mut self, payload: impl Into<Payload>) -> SendOutcome {
        let Some(text) = payload.into().into_wire() else {
            return SendOutcome::Rejected;
        };

        if let (ReadyState::Open, Some(id)) = (self.state, self.current) {
            match self.transport.send(id, &text) {
                Ok(()) => return SendOutcome::Sent,
                Err(e) => {
                    tracing::debug!(conn = %id, err = %e, "transport send failed, queueing");
                    self.outbox.push_back(text);
                    self.emit(SocketEvent::Error {
                        kind: ErrorKind::Transport,
                        message: e.to_string(),
                    });
                    return SendOutcome::Queued;
                }
            }
        }

        self.outbox.push_back(text);
        if !self.gave_up && !self.reconnect_in_progress() {
            if let Some(uri) = self.endpoint.clone() {
                let options = self.options.clone();
                self.connect(uri, options);
            }
        }
        SendOutcome::Queued
    }

    pub fn on(&mut self, kind: EventKind, handler: Handler) -> SubscriptionId {
        self.bus.on(kind, handler)
    }

    pub fn off(&mut self, kind: &EventKind, id: Option<SubscriptionId>) -> usize {
        self.bus.off(kind, id)
    }

    // -- Callbacks -----------------------------------------------------------

    /// Apply a transport callback. Callbacks from detached connections are
    /// dropped.
    pub fn handle_transport(&mut self, id: ConnectionId, event: TransportEvent) {
        if self.current != Some(id) {
            tracing::trace!(conn = %id, "dropping callback from detached connection");
            return;
        }
        match event {
            TransportEvent::Open => self.handle_open(id),
            TransportEvent::Message(text) => self.handle_message(&text),
            TransportEvent::Close(info) => self.handle_close(id, info),
            TransportEvent::Error(message) => {
                tracing::debug!(conn = %id, err = %message, "transport error");
                self.emit(SocketEvent::Error { kind: ErrorKind::Transport, message });
            }
        }
    }

    /// Apply a timer firing. Only the outstanding reconnect timer matters.
    pub fn handle_timer(&mut self, id: TimerId) {
        if self.reconnect_timer != Some(id) {
            return;
        }
        self.reconnect_timer = None;
        self.reconnect_attempts += 1;
        let attempt = self.reconnect_attempts;
        tracing::debug!(attempt, endpoint = ?self.endpoint, "reconnect attempt");
        self.emit(SocketEvent::ReconnectAttempt { attempt });
        if let Some(uri) = self.endpoint.clone() {
            let options = self.options.clone();
            self.establish(uri, options);
        }
    }

    fn handle_open(&mut self, id: ConnectionId) {
        self.state = ReadyState::Open;
        self.reconnect_attempts = 0;

        let mut pending = std::mem::take(&mut self.outbox);
        while let Some(text) = pending.pop_front() {
            if let Err(e) = self.transport.send(id, &text) {
                tracing::debug!(conn = %id, err = %e, "outbox flush failed");
                pending.push_front(text);
                pending.append(&mut self.outbox);
                self.outbox = pending;
                break;
            }
        }

        tracing::info!(conn = %id, endpoint = ?self.endpoint, "socket connected");
        self.emit(SocketEvent::Connect { timestamp_ms: epoch_ms() });
    }

    fn handle_message(&mut self, text: &str) {
        let payload = Payload::parse(text);
        let specialized = SocketEvent::from_discriminant(&payload);
        self.emit(SocketEvent::Message(payload));
        if let Some(event) = specialized {
            self.emit(event);
        }
    }

    fn handle_close(&mut self, id: ConnectionId, info: CloseInfo) {
        self.state = ReadyState::Closed;
        self.current = None;
        tracing::info!(
            conn = %id,
            code = info.code,
            clean = info.was_clean,
            reason = %info.reason,
            "socket closed"
        );
        let reconnect = info.wants_reconnect();
        self.emit(SocketEvent::Close(info.clone()));
        self.emit(SocketEvent::Disconnect(info));
        if reconnect {
            self.schedule_reconnect();
        }
    }

    // -- Internals -----------------------------------------------------------

    fn establish(&mut self, uri: String, options: ConnectOptions) {
        self.cancel_reconnect_timer();
        if self.teardown() {
            self.emit(SocketEvent::Disconnect(CloseInfo::client()));
        }

        self.next_connection += 1;
        let id = ConnectionId(self.next_connection);
        self.current = Some(id);
        self.state = ReadyState::Connecting;
        let result = self.transport.open(id, &uri, &options);
        self.endpoint = Some(uri);
        self.options = options;

        if let Err(e) = result {
            tracing::warn!(conn = %id, kind = %ErrorKind::Transport, err = %e, "socket open failed");
            self.current = None;
            self.state = ReadyState::Closed;
            self.emit(SocketEvent::Error { kind: ErrorKind::Transport, message: e.to_string() });
            self.schedule_reconnect();
        }
    }

    /// Detach and close the live transport, if any. Returns whether one existed.
    fn teardown(&mut self) -> bool {
        let Some(id) = self.current.take() else {
            self.state = ReadyState::Closed;
            return false;
        };
        if matches!(self.state, ReadyState::Open | ReadyState::Connecting) {
            self.state = ReadyState::Closing;
            self.transport.close(id, NORMAL_CLOSURE, "client");
        }
        self.state = ReadyState::Closed;
        true
    }

    fn schedule_reconnect(&mut self) {
        self.cancel_reconnect_timer();
        if self.policy.exhausted(self.reconnect_attempts) {
            self.gave_up = true;
            tracing::warn!(
                attempts = self.reconnect_attempts,
                kind = %ErrorKind::Transport,
                "reconnect attempts exhausted"
            );
            self.emit(SocketEvent::ReconnectFailed {
                attempts: self.reconnect_attempts,
                max: self.policy.max_attempts,
            });
            return;
        }
        let delay = self.policy.delay(self.reconnect_attempts);
        tracing::debug!(
            attempt = self.reconnect_attempts + 1,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );
        self.reconnect_timer = Some(self.clock.set_timer(delay));
    }

    fn cancel_reconnect_timer(&mut self) {
        if let Some(id) = self.reconnect_timer.take() {
            self.clock.cancel_timer(id);
        }
    }

    fn reconnect_in_progress(&self) -> bool {
        self.reconnect_timer.is_some()
            || matches!(self.state, ReadyState::Connecting | ReadyState::Open)
    }

    fn emit(&mut self, event: SocketEvent) {
        self.bus.emit(&event);
    }

    // -- Queries -------------------------------------------------------------

    pub fn state(&self) -> ReadyState {
        self.state
    }

    pub fn is_connecting(&self) -> bool {
        self.state == ReadyState::Connecting
    }

    pub fn is_open(&self) -> bool {
        self.state == ReadyState::Open
    }

    pub fn is_closing(&self) -> bool {
        self.state == ReadyState::Closing
    }

    pub fn is_closed(&self) -> bool {
        self.state == ReadyState::Closed
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn reconnect_scheduled(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    pub fn pending_len(&self) -> usize {
        self.outbox.len()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
