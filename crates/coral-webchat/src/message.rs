//! The guest chat frame.
//!
//! Frames on the per-session event stream reuse the notification envelope
//! layout, but their `eventBody` has a fixed shape. A [`ChatFrame`] is
//! immutable after decode.

use chrono::{DateTime, Utc};
use coral_events::EnvelopeMetadata;
use serde::{Deserialize, Serialize};

use crate::member::Member;

/// One frame received on a guest chat session's event stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFrame {
    /// Dot-separated topic name.
    pub topic_name: String,
    /// Frame payload.
    #[serde(default)]
    pub event_body: ChatEventBody,
    /// Transport metadata; `type` discriminates the payload kind.
    #[serde(default, skip_serializing_if = "EnvelopeMetadata::is_empty")]
    pub metadata: EnvelopeMetadata,
    /// Envelope schema version.
    #[serde(default)]
    pub version: String,
}

/// Payload of a guest chat frame. All fields are optional on the wire.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatEventBody {
    /// Message identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Sender of a message or typing indicator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Member>,
    /// Subject of a member-change frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    /// Message body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Body type, e.g. `standard`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    /// Free-form server message, e.g. `WebSocket Heartbeat`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Server timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatFrame {
    /// Whether this frame is the server's websocket heartbeat.
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        self.topic_name.eq_ignore_ascii_case("channel.metadata")
            && self.event_body.message.as_deref() == Some("WebSocket Heartbeat")
    }

    /// The metadata `type` discriminator, lowercased; empty when absent.
    #[must_use]
    pub fn kind(&self) -> String {
        self.metadata
            .kind
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::MemberState;

    #[test]
    fn decodes_message_frame() {
        let json = r#"{
            "topicName": "v2.conversations.chats.c-1.messages",
            "eventBody": {
                "id": "msg-1",
                "sender": {"id": "m-1", "displayName": "Agent", "state": "CONNECTED"},
                "body": "hello",
                "bodyType": "standard",
                "timestamp": "2026-08-28T10:00:00Z"
            },
            "metadata": {"correlationId": "corr-1", "type": "message"},
            "version": "2"
        }"#;
        let frame: ChatFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.kind(), "message");
        assert_eq!(frame.event_body.body.as_deref(), Some("hello"));
        assert!(!frame.is_heartbeat());
        let sender = frame.event_body.sender.unwrap();
        assert_eq!(sender.id.as_str(), "m-1");
        assert_eq!(sender.state, MemberState::Connected);
    }

    #[test]
    fn heartbeat_detection_requires_message_text() {
        let heartbeat: ChatFrame = serde_json::from_str(
            r#"{"topicName": "channel.metadata", "eventBody": {"message": "WebSocket Heartbeat"}, "version": "2"}"#,
        )
        .unwrap();
        assert!(heartbeat.is_heartbeat());

        let other: ChatFrame = serde_json::from_str(
            r#"{"topicName": "channel.metadata", "eventBody": {"message": "something else"}, "version": "2"}"#,
        )
        .unwrap();
        assert!(!other.is_heartbeat());
    }

    #[test]
    fn kind_is_empty_without_metadata() {
        let frame: ChatFrame =
            serde_json::from_str(r#"{"topicName": "t", "version": "2"}"#).unwrap();
        assert_eq!(frame.kind(), "");
    }

    #[test]
    fn round_trips_populated_optional_fields() {
        let json = r#"{
            "topicName": "v2.conversations.chats.c-1.members",
            "eventBody": {
                "member": {"id": "m-2", "state": "DISCONNECTED"},
                "timestamp": "2026-08-28T10:00:00Z"
            },
            "metadata": {"correlationId": "corr-2", "type": "member-change"},
            "version": "2"
        }"#;
        let frame: ChatFrame = serde_json::from_str(json).unwrap();
        let encoded = serde_json::to_string(&frame).unwrap();
        let back: ChatFrame = serde_json::from_str(&encoded).unwrap();
        assert_eq!(back.metadata, frame.metadata);
        assert_eq!(
            back.event_body.member.unwrap().state,
            MemberState::Disconnected
        );
        assert!(back.event_body.timestamp.is_some());
    }
}
