// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket event kinds and their typed payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorKind;
use crate::socket::transport::CloseInfo;

/// Field of an inbound JSON frame that selects specialized dispatch.
pub const DISCRIMINANT_FIELD: &str = "type";

/// Subscription key. Every [`SocketEvent`] maps to exactly one kind;
/// [`EventKind::All`] is reserved for subscribers that want everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Message,
    Notification,
    Disconnect,
    Close,
    Error,
    ReconnectAttempt,
    ReconnectFailed,
    /// Inbound frame whose discriminant is not one of the kinds above.
    Custom(String),
    All,
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connect => "connect",
            Self::Message => "message",
            Self::Notification => "notification",
            Self::Disconnect => "disconnect",
            Self::Close => "close",
            Self::Error => "error",
            Self::ReconnectAttempt => "reconnect_attempt",
            Self::ReconnectFailed => "reconnect_failed",
            Self::Custom(name) => name,
            Self::All => "all",
        }
    }

    /// Shorthand for subscribing to a discriminant-named event.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message body: parsed JSON when the text parses, the raw text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// Parse inbound text, keeping the raw string on failure.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text.to_owned()),
        }
    }

    /// Discriminant value, if the payload is an object carrying a non-empty
    /// string `type` field.
    pub fn discriminant(&self) -> Option<&str> {
        match self {
            Self::Json(value) => value
                .get(DISCRIMINANT_FIELD)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty()),
            Self::Text(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// Serialize for the wire. `None` for empty text and JSON `null`, which
    /// are never sent.
    pub fn into_wire(self) -> Option<String> {
        match self {
            Self::Text(text) if text.is_empty() => None,
            Self::Text(text) => Some(text),
            Self::Json(Value::Null) => None,
            Self::Json(Value::String(text)) if text.is_empty() => None,
            Self::Json(Value::String(text)) => Some(text),
            Self::Json(value) => Some(value.to_string()),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Push notification as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_object_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_object_type: Option<String>,
}

impl Notification {
    /// Decode from a `notification` frame. The body normally sits under a
    /// nested `notification` key; a flat frame is accepted as well.
    pub fn from_frame(frame: &Value) -> Option<Self> {
        let body = frame.get("notification").unwrap_or(frame);
        Self::deserialize(body).ok()
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority.as_deref() == Some("high")
    }
}

/// Events emitted by the connection manager.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// Transport reached `Open` and the outbox was flushed.
    Connect { timestamp_ms: u64 },
    /// Every inbound frame, parsed or raw.
    Message(Payload),
    /// Inbound frame with `type == "notification"`. `notification` is `None`
    /// when the body does not decode; `payload` always holds the raw frame.
    Notification { notification: Option<Box<Notification>>, payload: Value },
    /// Inbound frame with any other discriminant.
    Typed { name: String, payload: Value },
    /// Connection gone, either closed by the client or by the transport.
    Disconnect(CloseInfo),
    /// Transport reported closure.
    Close(CloseInfo),
    Error { kind: ErrorKind, message: String },
    ReconnectAttempt { attempt: u32 },
    ReconnectFailed { attempts: u32, max: u32 },
}

impl SocketEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connect { .. } => EventKind::Connect,
            Self::Message(_) => EventKind::Message,
            Self::Notification { .. } => EventKind::Notification,
            Self::Typed { name, .. } => EventKind::Custom(name.clone()),
            Self::Disconnect(_) => EventKind::Disconnect,
            Self::Close(_) => EventKind::Close,
            Self::Error { .. } => EventKind::Error,
            Self::ReconnectAttempt { .. } => EventKind::ReconnectAttempt,
            Self::ReconnectFailed { .. } => EventKind::ReconnectFailed,
        }
    }

    /// Build the specialized event for a parsed inbound frame, if it carries
    /// a discriminant.
    pub fn from_discriminant(payload: &Payload) -> Option<Self> {
        let name = payload.discriminant()?;
        let value = payload.as_json()?.clone();
        if name == EventKind::Notification.as_str() {
            let notification = Notification::from_frame(&value).map(Box::new);
            if notification.is_none() {
                tracing::warn!(
                    kind = %ErrorKind::Protocol,
                    "notification frame has unexpected shape, delivered undecoded"
                );
            }
            return Some(Self::Notification { notification, payload: value });
        }
        Some(Self::Typed { name: name.to_owned(), payload: value })
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
