// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;

#[test]
fn parse_keeps_raw_text_on_failure() {
    let payload = Payload::parse("pong");
    assert_eq!(payload, Payload::Text("pong".to_owned()));
    assert_eq!(payload.discriminant(), None);
    assert!(SocketEvent::from_discriminant(&payload).is_none());
}

#[test]
fn parse_json_and_read_discriminant() {
    let payload = Payload::parse(r#"{"type":"winning","id":7}"#);
    assert_eq!(payload.discriminant(), Some("winning"));

    let event = SocketEvent::from_discriminant(&payload);
    assert_eq!(
        event,
        Some(SocketEvent::Typed { name: "winning".to_owned(), payload: json!({"type":"winning","id":7}) })
    );
    assert_eq!(event.map(|e| e.kind()), Some(EventKind::custom("winning")));
}

#[yare::parameterized(
    number = { r#"{"type":5}"# },
    empty = { r#"{"type":""}"# },
    missing = { r#"{"kind":"winning"}"# },
    array = { r#"["winning"]"# },
    scalar = { "42" },
)]
fn no_discriminant(text: &str) {
    assert_eq!(Payload::parse(text).discriminant(), None);
}

#[test]
fn notification_frame_decodes_nested_body() -> anyhow::Result<()> {
    let frame = json!({
        "type": "notification",
        "notification": {
            "id": 12,
            "title": "Draw results",
            "message": "You won!",
            "notification_type": "winning",
            "is_read": false,
            "created_at": "2026-10-01T12:00:00Z",
            "priority": "high",
            "data": {"ticket_id": 99}
        }
    });
    let payload = Payload::Json(frame.clone());

    match SocketEvent::from_discriminant(&payload) {
        Some(SocketEvent::Notification { notification: Some(notification), payload }) => {
            assert_eq!(notification.id, 12);
            assert_eq!(notification.notification_type, "winning");
            assert!(notification.is_high_priority());
            assert_eq!(notification.related_object_id, None);
            assert_eq!(payload, frame);
        }
        other => anyhow::bail!("expected notification, got {other:?}"),
    }
    Ok(())
}

#[test]
fn malformed_notification_frame_still_dispatches_undecoded() -> anyhow::Result<()> {
    let frame = json!({"type": "notification", "notification": {"id": "x"}});
    let payload = Payload::Json(frame.clone());

    match SocketEvent::from_discriminant(&payload) {
        Some(event @ SocketEvent::Notification { notification: None, .. }) => {
            assert_eq!(event.kind(), EventKind::Notification);
            assert_eq!(event, SocketEvent::Notification { notification: None, payload: frame });
        }
        other => anyhow::bail!("expected undecoded notification, got {other:?}"),
    }
    Ok(())
}

#[test]
fn reserved_names_stay_custom() {
    let payload = Payload::parse(r#"{"type":"error","detail":"bad"}"#);
    let event = SocketEvent::from_discriminant(&payload);
    assert_eq!(event.map(|e| e.kind()), Some(EventKind::custom("error")));
}

#[yare::parameterized(
    text = { Payload::Text("hello".to_owned()), Some("hello") },
    empty_text = { Payload::Text(String::new()), None },
    null = { Payload::Json(Value::Null), None },
    json_string = { Payload::Json(json!("raw")), Some("raw") },
    object = { Payload::Json(json!({"a":1})), Some(r#"{"a":1}"#) },
)]
fn wire_serialization(payload: Payload, expected: Option<&str>) {
    assert_eq!(payload.into_wire().as_deref(), expected);
}

#[test]
fn kind_names() {
    assert_eq!(EventKind::ReconnectAttempt.as_str(), "reconnect_attempt");
    assert_eq!(EventKind::ReconnectFailed.to_string(), "reconnect_failed");
    assert_eq!(EventKind::custom("draw").as_str(), "draw");
}
