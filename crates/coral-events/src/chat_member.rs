//! Guest chat member-change topic.

use chrono::{DateTime, Utc};
use coral_core::{ConversationId, CoralError};
use serde::{Deserialize, Serialize};

use crate::chat_message::ChatMember;
use crate::envelope::TopicEnvelope;
use crate::topic::Topic;

const PREFIX: &str = "v2.conversations.chats.";
const SUFFIX: &str = ".members";

/// A member joined, left, or changed state in a guest chat conversation.
///
/// The conversation ID comes from the topic name and must be a well-formed
/// UUID; a malformed one fails the decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatGuestMemberTopic {
    /// The full topic name.
    pub name: String,
    /// Conversation identifier parsed from the topic name.
    pub conversation_id: ConversationId,
    /// The member the change applies to.
    pub member: ChatMember,
    /// Metadata discriminator, `member-change` on the wire today.
    pub kind: String,
    /// Server timestamp of the change, when supplied.
    pub timestamp: Option<DateTime<Utc>>,
    /// Correlation identifier from the envelope metadata.
    pub correlation_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Body {
    member: ChatMember,
    timestamp: Option<DateTime<Utc>>,
}

impl ChatGuestMemberTopic {
    /// Whether a topic name belongs to this variant.
    #[must_use]
    pub fn matches(topic_name: &str) -> bool {
        topic_name.starts_with(PREFIX) && topic_name.ends_with(SUFFIX)
    }

    /// The subscription topic name for a conversation.
    #[must_use]
    pub fn topic_for(conversation_id: ConversationId) -> String {
        format!("{PREFIX}{conversation_id}{SUFFIX}")
    }

    pub(crate) fn decode(envelope: &TopicEnvelope) -> Result<Topic, CoralError> {
        let body: Body = serde_json::from_value(envelope.event_body.clone())?;
        let name = &envelope.topic_name;
        let subject = name.strip_prefix(PREFIX).unwrap_or(name);
        let conversation_id: ConversationId =
            subject.strip_suffix(SUFFIX).unwrap_or(subject).parse()?;
        Ok(Topic::ChatGuestMember(Self {
            name: envelope.topic_name.clone(),
            conversation_id,
            member: body.member,
            kind: envelope.metadata.kind.clone().unwrap_or_default(),
            timestamp: body.timestamp,
            correlation_id: envelope.metadata.correlation_id.clone(),
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const CONVERSATION: &str = "f1c9b5e2-6d3a-4a4e-9c6a-0c3f2d1e8b7a";

    #[test]
    fn matches_member_names() {
        assert!(ChatGuestMemberTopic::matches("v2.conversations.chats.abc.members"));
        assert!(!ChatGuestMemberTopic::matches("v2.conversations.chats.abc.messages"));
    }

    #[test]
    fn topic_for_builds_name() {
        let id: ConversationId = CONVERSATION.parse().unwrap();
        assert_eq!(
            ChatGuestMemberTopic::topic_for(id),
            format!("v2.conversations.chats.{CONVERSATION}.members")
        );
    }

    #[test]
    fn decodes_member_change() {
        let json = format!(
            r#"{{
                "topicName": "v2.conversations.chats.{CONVERSATION}.members",
                "eventBody": {{
                    "member": {{"id": "m-1", "state": "DISCONNECTED", "role": "CUSTOMER"}},
                    "timestamp": "2026-08-28T10:00:00Z"
                }},
                "metadata": {{"correlationId": "corr-2", "type": "member-change"}},
                "version": "2"
            }}"#
        );
        let envelope: TopicEnvelope = serde_json::from_str(&json).unwrap();
        let topic = ChatGuestMemberTopic::decode(&envelope).unwrap();
        assert_matches!(topic, Topic::ChatGuestMember(t) => {
            assert_eq!(t.conversation_id, CONVERSATION.parse().unwrap());
            assert_eq!(t.member.id, "m-1");
            assert_eq!(t.member.state, "DISCONNECTED");
            assert_eq!(t.kind, "member-change");
            assert_eq!(t.correlation_id.as_deref(), Some("corr-2"));
        });
    }

    #[test]
    fn malformed_conversation_id_fails_decode() {
        let json = r#"{
            "topicName": "v2.conversations.chats.not-a-uuid.members",
            "eventBody": {"member": {"id": "m-1"}},
            "metadata": {"type": "member-change"},
            "version": "2"
        }"#;
        let envelope: TopicEnvelope = serde_json::from_str(json).unwrap();
        let result = ChatGuestMemberTopic::decode(&envelope);
        assert_matches!(result, Err(CoralError::ArgumentInvalid { .. }));
    }
}
