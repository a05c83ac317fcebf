// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task that owns a [`ConnectionManager`] and the cloneable handle used to
//! drive it.
//!
//! Commands, transport callbacks and timer firings are applied one at a time
//! on the owning task. Handlers may call back into a [`SocketHandle`] (for
//! example `disconnect()` from a `disconnect` handler); those commands are
//! applied after the current dispatch finishes.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::socket::backoff::ReconnectPolicy;
use crate::socket::bus::{Handler, SubscriptionId};
use crate::socket::clock::{Clock, TokioClock};
use crate::socket::event::{EventKind, Payload, SocketEvent};
use crate::socket::manager::{ConnectionManager, SendOutcome};
use crate::socket::transport::{ConnectOptions, ReadyState, Transport};
use crate::socket::ws::WsTransport;
use crate::socket::Signal;

/// Snapshot of connection state, for queries from outside the task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketStatus {
    pub state: ReadyState,
    pub reconnect_attempts: u32,
    pub reconnect_scheduled: bool,
    pub pending: usize,
    pub endpoint: Option<String>,
}

enum Command {
    Connect { uri: String, options: ConnectOptions },
    Disconnect,
    Reconnect,
    Retarget { uri: String },
    Send { payload: Payload, reply: Option<oneshot::Sender<SendOutcome>> },
    Subscribe { kind: EventKind, handler: Handler, reply: oneshot::Sender<SubscriptionId> },
    Unsubscribe { kind: EventKind, id: Option<SubscriptionId> },
    Status { reply: oneshot::Sender<SocketStatus> },
}

/// Cloneable handle to a running socket task.
#[derive(Clone)]
pub struct SocketHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SocketHandle {
    /// Open a connection, replacing any existing one.
    pub fn connect(&self, uri: impl Into<String>, options: ConnectOptions) {
        let _ = self.commands.send(Command::Connect { uri: uri.into(), options });
    }

    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    pub fn reconnect(&self) {
        let _ = self.commands.send(Command::Reconnect);
    }

    /// Switch the endpoint used by later reconnects, connecting now if the
    /// socket is idle.
    pub fn retarget(&self, uri: impl Into<String>) {
        let _ = self.commands.send(Command::Retarget { uri: uri.into() });
    }

    /// Send or queue without waiting for the outcome.
    pub fn send_nowait(&self, payload: impl Into<Payload>) {
        let _ = self.commands.send(Command::Send { payload: payload.into(), reply: None });
    }

    pub async fn send(&self, payload: impl Into<Payload>) -> anyhow::Result<SendOutcome> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Send { payload: payload.into(), reply: Some(reply) })?;
        Ok(rx.await?)
    }

    pub async fn on<F>(&self, kind: EventKind, handler: F) -> anyhow::Result<SubscriptionId>
    where
        F: FnMut(&SocketEvent) -> anyhow::Result<()> + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Subscribe { kind, handler: Box::new(handler), reply })?;
        Ok(rx.await?)
    }

    /// Unsubscribe one handler, or all handlers of `kind` when `id` is `None`.
    pub fn off(&self, kind: EventKind, id: Option<SubscriptionId>) {
        let _ = self.commands.send(Command::Unsubscribe { kind, id });
    }

    pub async fn status(&self) -> anyhow::Result<SocketStatus> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Status { reply })?;
        Ok(rx.await?)
    }

    fn command(&self, command: Command) -> anyhow::Result<()> {
        self.commands.send(command).map_err(|_| anyhow::anyhow!("socket task stopped"))
    }
}

/// Spawn the production socket: tokio-tungstenite transport, tokio timers.
pub fn spawn_ws_socket(policy: ReconnectPolicy, shutdown: CancellationToken) -> SocketHandle {
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    let transport = WsTransport::new(signal_tx.clone());
    let clock = TokioClock::new(signal_tx);
    spawn_socket(ConnectionManager::new(transport, clock, policy), signal_rx, shutdown)
}

/// Spawn a task that owns `manager` until `shutdown` fires or every handle
/// is dropped.
pub fn spawn_socket<T, C>(
    mut manager: ConnectionManager<T, C>,
    mut signals: mpsc::UnboundedReceiver<Signal>,
    shutdown: CancellationToken,
) -> SocketHandle
where
    T: Transport + 'static,
    C: Clock + 'static,
{
    let (commands, mut command_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            // Callbacks already delivered are applied before later commands.
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                Some(signal) = signals.recv() => match signal {
                    Signal::Transport { id, event } => manager.handle_transport(id, event),
                    Signal::Timer(id) => manager.handle_timer(id),
                },
                command = command_rx.recv() => match command {
                    Some(command) => apply(&mut manager, command),
                    None => break,
                },
            }
        }
        manager.disconnect();
        tracing::debug!("socket task stopped");
    });
    SocketHandle { commands }
}

fn apply<T: Transport, C: Clock>(manager: &mut ConnectionManager<T, C>, command: Command) {
    match command {
        Command::Connect { uri, options } => manager.connect(uri, options),
        Command::Disconnect => manager.disconnect(),
        Command::Reconnect => manager.reconnect(),
        Command::Retarget { uri } => manager.retarget(uri),
        Command::Send { payload, reply } => {
            let outcome = manager.send(payload);
            if let Some(reply) = reply {
                let _ = reply.send(outcome);
            }
        }
        Command::Subscribe { kind, handler, reply } => {
            let _ = reply.send(manager.on(kind, handler));
        }
        Command::Unsubscribe { kind, id } => {
            manager.off(&kind, id);
        }
        Command::Status { reply } => {
            let _ = reply.send(SocketStatus {
                state: manager.state(),
                reconnect_attempts: manager.reconnect_attempts(),
                reconnect_scheduled: manager.reconnect_scheduled(),
                pending: manager.pending_len(),
                endpoint: manager.endpoint().map(str::to_owned),
            });
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
