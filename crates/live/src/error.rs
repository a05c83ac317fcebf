// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure classes surfaced by the live client.
///
/// Carried on [`SocketEvent::Error`](crate::socket::event::SocketEvent) and
/// used as the `kind` field on warning logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection refused, dropped, or closed abnormally. Retried.
    Transport,
    /// Inbound frame could not be interpreted. Recovered locally.
    Protocol,
    /// Refresh credential invalid or expired. Fatal to the session.
    Credential,
    /// A subscriber callback failed. Isolated to that subscriber.
    Handler,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "TRANSPORT",
            Self::Protocol => "PROTOCOL",
            Self::Credential => "CREDENTIAL",
            Self::Handler => "HANDLER",
        }
    }

    /// Whether the client recovers from this failure without user action.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Credential)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
