// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resilient WebSocket client: one logical connection with queued sends,
//! exponential-backoff reconnect, and typed event dispatch.
//!
//! [`manager::ConnectionManager`] is the single-owner state machine. It never
//! touches the network or the timer wheel directly; it drives a [`Transport`]
//! and a [`Clock`] and is fed their callbacks as [`Signal`]s by the task in
//! [`service`].

pub mod backoff;
pub mod bus;
pub mod clock;
pub mod event;
pub mod manager;
pub mod service;
pub mod transport;
pub mod ws;

pub use clock::{Clock, TimerId};
pub use transport::{ConnectionId, Transport, TransportEvent};

/// Callback delivered from a transport or clock back into the connection task.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Transport { id: ConnectionId, event: TransportEvent },
    Timer(TimerId),
}
