// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Transport`] over tokio-tungstenite. Each connection runs on its own
//! task and reports back through the shared [`Signal`] channel.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::socket::transport::{CloseInfo, ConnectOptions, ConnectionId, Transport, TransportEvent};
use crate::socket::Signal;

/// Close code reported when the peer sent a close frame without a status.
const NO_STATUS_RECEIVED: u16 = 1005;

enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

struct LiveSocket {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
    cancel: CancellationToken,
}

pub struct WsTransport {
    signals: mpsc::UnboundedSender<Signal>,
    live: Option<LiveSocket>,
}

impl WsTransport {
    pub fn new(signals: mpsc::UnboundedSender<Signal>) -> Self {
        Self { signals, live: None }
    }
}

impl Transport for WsTransport {
    fn open(&mut self, id: ConnectionId, uri: &str, options: &ConnectOptions) -> anyhow::Result<()> {
        if let Some(previous) = self.live.take() {
            previous.cancel.cancel();
        }

        let request = build_request(uri, options)?;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(run_connection(
            id,
            request,
            options.connect_timeout,
            outbound_rx,
            cancel.clone(),
            self.signals.clone(),
        ));
        self.live = Some(LiveSocket { id, outbound, cancel });
        Ok(())
    }

    fn send(&mut self, id: ConnectionId, text: &str) -> anyhow::Result<()> {
        match &self.live {
            Some(live) if live.id == id => live
                .outbound
                .send(Outbound::Text(text.to_owned()))
                .map_err(|_| anyhow::anyhow!("{id} writer gone")),
            _ => anyhow::bail!("{id} is not the live connection"),
        }
    }

    fn close(&mut self, id: ConnectionId, code: u16, reason: &str) {
        match self.live.take() {
            Some(live) if live.id == id => {
                let _ = live.outbound.send(Outbound::Close { code, reason: reason.to_owned() });
                live.cancel.cancel();
            }
            other => self.live = other,
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            live.cancel.cancel();
        }
    }
}

fn build_request(uri: &str, options: &ConnectOptions) -> anyhow::Result<Request> {
    let mut request = uri.into_client_request()?;
    for (name, value) in &options.headers {
        request
            .headers_mut()
            .insert(HeaderName::from_bytes(name.as_bytes())?, HeaderValue::from_str(value)?);
    }
    Ok(request)
}

async fn run_connection(
    id: ConnectionId,
    request: Request,
    connect_timeout: Option<Duration>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    cancel: CancellationToken,
    signals: mpsc::UnboundedSender<Signal>,
) {
    let emit = |event: TransportEvent| {
        let _ = signals.send(Signal::Transport { id, event });
    };

    let attempt = async {
        let connect = tokio_tungstenite::connect_async(request);
        let result = match connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| anyhow::anyhow!("connect timed out after {limit:?}"))?,
            None => connect.await,
        };
        Ok::<_, anyhow::Error>(result?)
    };
    let connected = tokio::select! {
        _ = cancel.cancelled() => return,
        result = attempt => result,
    };

    let stream = match connected {
        Ok((stream, _)) => stream,
        Err(e) => {
            tracing::debug!(conn = %id, err = %e, "ws connect failed");
            emit(TransportEvent::Error(e.to_string()));
            emit(TransportEvent::Close(CloseInfo::abnormal(e.to_string())));
            return;
        }
    };
    emit(TransportEvent::Open);

    let (mut write, mut read) = stream.split();
    let mut close: Option<CloseInfo> = None;

    loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        tracing::debug!(conn = %id, err = %e, "ws write failed");
                        emit(TransportEvent::Error(e.to_string()));
                        close = Some(CloseInfo::abnormal(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    // Detached by the manager: no further callbacks.
                    let frame = CloseFrame { code: CloseCode::from(code), reason: reason.into() };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    return;
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    return;
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => emit(TransportEvent::Message(text.as_str().to_owned())),
                Some(Ok(Message::Close(frame))) => {
                    // Keep reading so the close reply is flushed; the stream
                    // ends once the handshake completes.
                    close = Some(match frame {
                        Some(frame) => CloseInfo {
                            was_clean: true,
                            code: u16::from(frame.code),
                            reason: frame.reason.as_str().to_owned(),
                        },
                        None => CloseInfo {
                            was_clean: true,
                            code: NO_STATUS_RECEIVED,
                            reason: String::new(),
                        },
                    });
                }
                Some(Ok(_)) => {} // Ignore binary, ping, pong.
                Some(Err(e)) => {
                    if close.is_none() {
                        tracing::debug!(conn = %id, err = %e, "ws read failed");
                        emit(TransportEvent::Error(e.to_string()));
                        close = Some(CloseInfo::abnormal(e.to_string()));
                    }
                    break;
                }
                None => break,
            },
        }
    }

    emit(TransportEvent::Close(close.unwrap_or_else(|| CloseInfo::abnormal("connection lost"))));
}
