// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use parking_lot::Mutex;

use super::*;
use crate::socket::event::Payload;

fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Handler {
    let log = Arc::clone(log);
    let tag = tag.to_owned();
    Box::new(move |event| {
        log.lock().push(format!("{tag}:{}", event.kind()));
        Ok(())
    })
}

fn message(text: &str) -> SocketEvent {
    SocketEvent::Message(Payload::Text(text.to_owned()))
}

#[test]
fn handlers_fire_in_subscription_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut bus = EventBus::new();
    bus.on(EventKind::Message, recorder(&log, "a"));
    bus.on(EventKind::Message, recorder(&log, "b"));
    bus.on(EventKind::Connect, recorder(&log, "c"));

    bus.emit(&message("hi"));

    assert_eq!(*log.lock(), vec!["a:message", "b:message"]);
}

#[test]
fn all_subscribers_see_every_event_after_specific_ones() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut bus = EventBus::new();
    bus.on(EventKind::All, recorder(&log, "all"));
    bus.on(EventKind::Message, recorder(&log, "msg"));

    bus.emit(&message("hi"));
    bus.emit(&SocketEvent::ReconnectAttempt { attempt: 1 });

    assert_eq!(*log.lock(), vec!["msg:message", "all:message", "all:reconnect_attempt"]);
}

#[test]
fn failing_handler_does_not_block_siblings() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut bus = EventBus::new();
    bus.on(EventKind::Message, Box::new(|_| anyhow::bail!("subscriber broke")));
    bus.on(EventKind::Message, recorder(&log, "after"));
    bus.on(EventKind::All, Box::new(|_| anyhow::bail!("all broke")));
    bus.on(EventKind::All, recorder(&log, "all"));

    bus.emit(&message("hi"));

    assert_eq!(*log.lock(), vec!["after:message", "all:message"]);
}

#[test]
fn off_removes_single_handler() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut bus = EventBus::new();
    let first = bus.on(EventKind::Message, recorder(&log, "a"));
    bus.on(EventKind::Message, recorder(&log, "b"));

    assert_eq!(bus.off(&EventKind::Message, Some(first)), 1);
    assert_eq!(bus.off(&EventKind::Message, Some(first)), 0);
    bus.emit(&message("hi"));

    assert_eq!(*log.lock(), vec!["b:message"]);
    assert_eq!(bus.handler_count(&EventKind::Message), 1);
}

#[test]
fn off_without_id_clears_kind() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut bus = EventBus::new();
    bus.on(EventKind::Message, recorder(&log, "a"));
    bus.on(EventKind::Message, recorder(&log, "b"));
    bus.on(EventKind::Connect, recorder(&log, "c"));

    assert_eq!(bus.off(&EventKind::Message, None), 2);
    bus.emit(&message("hi"));
    bus.emit(&SocketEvent::Connect { timestamp_ms: 0 });

    assert_eq!(*log.lock(), vec!["c:connect"]);
    assert_eq!(bus.off(&EventKind::Error, None), 0);
}

#[test]
fn custom_kinds_are_keyed_by_name() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut bus = EventBus::new();
    bus.on(EventKind::custom("winning"), recorder(&log, "w"));
    bus.on(EventKind::custom("draw"), recorder(&log, "d"));

    bus.emit(&SocketEvent::Typed { name: "winning".to_owned(), payload: serde_json::json!({}) });

    assert_eq!(*log.lock(), vec!["w:winning"]);
}
