// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered, failure-isolated event dispatch.

use std::collections::HashMap;

use crate::error::ErrorKind;
use crate::socket::event::{EventKind, SocketEvent};

/// Subscriber callback. An `Err` is logged and does not affect other handlers.
pub type Handler = Box<dyn FnMut(&SocketEvent) -> anyhow::Result<()> + Send>;

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Event kind → handlers in subscription order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    handlers: HashMap<EventKind, Vec<(SubscriptionId, Handler)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, kind: EventKind, handler: Handler) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.handlers.entry(kind).or_default().push((id, handler));
        id
    }

    /// Remove one handler, or every handler for `kind` when `id` is `None`.
    /// Returns how many were removed.
    pub fn off(&mut self, kind: &EventKind, id: Option<SubscriptionId>) -> usize {
        match id {
            None => self.handlers.remove(kind).map_or(0, |list| list.len()),
            Some(id) => {
                let Some(list) = self.handlers.get_mut(kind) else {
                    return 0;
                };
                let before = list.len();
                list.retain(|(sub, _)| *sub != id);
                let removed = before - list.len();
                if list.is_empty() {
                    self.handlers.remove(kind);
                }
                removed
            }
        }
    }

    pub fn handler_count(&self, kind: &EventKind) -> usize {
        self.handlers.get(kind).map_or(0, Vec::len)
    }

    /// Deliver to the event's own subscribers, then to `all` subscribers.
    pub fn emit(&mut self, event: &SocketEvent) {
        let kind = event.kind();
        self.dispatch(&kind, &kind, event);
        self.dispatch(&EventKind::All, &kind, event);
    }

    fn dispatch(&mut self, key: &EventKind, kind: &EventKind, event: &SocketEvent) {
        let Some(list) = self.handlers.get_mut(key) else {
            return;
        };
        for (id, handler) in list.iter_mut() {
            if let Err(e) = handler(event) {
                tracing::warn!(
                    event = %kind,
                    subscriber = %key,
                    subscription = id.0,
                    kind = %ErrorKind::Handler,
                    err = %e,
                    "socket event handler failed"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
