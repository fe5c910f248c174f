//! Chat message topic.

use chrono::{DateTime, Utc};
use coral_core::CoralError;
use serde::{Deserialize, Serialize};

use crate::envelope::TopicEnvelope;
use crate::topic::Topic;

const PREFIX: &str = "v2.conversations.chats.";
const SUFFIX: &str = ".messages";

/// A chat participant as carried in topic payloads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatMember {
    /// Member identifier.
    pub id: String,
    /// Display name, when the platform supplies one.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    /// Role, e.g. `CUSTOMER` or `AGENT`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role: String,
    /// Connection state, e.g. `CONNECTED` or `DISCONNECTED`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
}

/// A message posted into a chat conversation.
///
/// The conversation ID is derived from the topic name, which is ground truth
/// over any duplicate in the body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageTopic {
    /// The full topic name.
    pub name: String,
    /// Conversation identifier, as embedded in the topic name.
    pub conversation_id: String,
    /// The member that sent the message.
    pub sender: ChatMember,
    /// Message body.
    pub body: String,
    /// Body type, e.g. `standard`.
    pub body_type: String,
    /// Server timestamp of the message, when supplied.
    pub timestamp: Option<DateTime<Utc>>,
    /// Correlation identifier from the envelope metadata.
    pub correlation_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Body {
    sender: ChatMember,
    body: String,
    body_type: String,
    timestamp: Option<DateTime<Utc>>,
}

impl ChatMessageTopic {
    /// Whether a topic name belongs to this variant.
    #[must_use]
    pub fn matches(topic_name: &str) -> bool {
        topic_name.starts_with(PREFIX) && topic_name.ends_with(SUFFIX)
    }

    /// The subscription topic name for a conversation.
    #[must_use]
    pub fn topic_for(conversation_id: &str) -> String {
        format!("{PREFIX}{conversation_id}{SUFFIX}")
    }

    pub(crate) fn decode(envelope: &TopicEnvelope) -> Result<Topic, CoralError> {
        let body: Body = serde_json::from_value(envelope.event_body.clone())?;
        // Strip each affix at most once; the subject may itself contain dots.
        let name = &envelope.topic_name;
        let subject = name.strip_prefix(PREFIX).unwrap_or(name);
        let conversation_id = subject.strip_suffix(SUFFIX).unwrap_or(subject).to_owned();
        Ok(Topic::ChatMessage(Self {
            name: envelope.topic_name.clone(),
            conversation_id,
            sender: body.sender,
            body: body.body,
            body_type: body.body_type,
            timestamp: body.timestamp,
            correlation_id: envelope.metadata.correlation_id.clone(),
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
