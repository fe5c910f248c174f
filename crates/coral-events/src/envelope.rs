//! The notification wire envelope.
//!
//! Every frame pushed on a notification channel is one JSON envelope:
//!
//! ```json
//! { "topicName": "v2.users.1234.activity",
//!   "eventBody": { ... },
//!   "metadata": { "correlationId": "...", "type": "..." },
//!   "version": "2" }
//! ```
//!
//! The `eventBody` shape varies by topic; it stays a raw [`Value`] here and
//! is decoded by the matching topic variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One frame received on a notification channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicEnvelope {
    /// Dot-separated topic name, e.g. `v2.conversations.chats.<id>.messages`.
    pub topic_name: String,
    /// Topic-specific payload, decoded by the matching topic variant.
    #[serde(default)]
    pub event_body: Value,
    /// Transport metadata.
    #[serde(default, skip_serializing_if = "EnvelopeMetadata::is_empty")]
    pub metadata: EnvelopeMetadata,
    /// Envelope schema version.
    #[serde(default)]
    pub version: String,
}

/// Envelope metadata block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    /// Server-side correlation identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Payload discriminator, e.g. `member-change` or `message`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl EnvelopeMetadata {
    /// Whether both metadata fields are absent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.correlation_id.is_none() && self.kind.is_none()
    }
}

impl TopicEnvelope {
    /// Whether this frame is the server's websocket heartbeat.
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        self.topic_name.eq_ignore_ascii_case("channel.metadata")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
