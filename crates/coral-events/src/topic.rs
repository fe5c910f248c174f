//! The closed [`Topic`] enum and the ordered decode registry.
//!
//! Every topic kind the client understands is a variant here. Decoding walks
//! a static table of `(predicate, decoder)` pairs in registration order and
//! the first matching predicate wins; a name no predicate claims yields
//! [`CoralError::UnrecognizedTopic`] so the caller can log the raw envelope.

use coral_core::CoralError;

use crate::chat_member::ChatGuestMemberTopic;
use crate::chat_message::ChatMessageTopic;
use crate::envelope::TopicEnvelope;
use crate::user_activity::UserActivityTopic;

/// A decoded notification topic.
#[derive(Clone, Debug, PartialEq)]
pub enum Topic {
    /// A message posted into a chat conversation.
    ChatMessage(ChatMessageTopic),
    /// A member change in a guest chat conversation.
    ChatGuestMember(ChatGuestMemberTopic),
    /// Presence or routing activity for a user.
    UserActivity(UserActivityTopic),
}

type Predicate = fn(&str) -> bool;
type Decoder = fn(&TopicEnvelope) -> Result<Topic, CoralError>;

/// Decode registry, tried in order; first matching predicate wins.
///
/// `.messages` is registered before `.members` so the narrower suffix checks
/// stay independent of each other.
const REGISTRY: &[(Predicate, Decoder)] = &[
    (ChatMessageTopic::matches, ChatMessageTopic::decode),
    (ChatGuestMemberTopic::matches, ChatGuestMemberTopic::decode),
    (UserActivityTopic::matches, UserActivityTopic::decode),
];

impl Topic {
    /// Decode an envelope into the first matching topic variant.
    pub fn from_envelope(envelope: &TopicEnvelope) -> Result<Self, CoralError> {
        for (matches, decode) in REGISTRY {
            if matches(&envelope.topic_name) {
                return decode(envelope);
            }
        }
        Err(CoralError::UnrecognizedTopic {
            topic_name: envelope.topic_name.clone(),
        })
    }

    /// Decode a raw websocket frame: envelope first, then the topic.
    pub fn from_json(payload: &str) -> Result<Self, CoralError> {
        let envelope: TopicEnvelope = serde_json::from_str(payload)?;
        Self::from_envelope(&envelope)
    }

    /// The full topic name as received.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::ChatMessage(t) => &t.name,
            Self::ChatGuestMember(t) => &t.name,
            Self::UserActivity(t) => &t.name,
        }
    }

    /// The correlation identifier, when the envelope carried one.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::ChatMessage(t) => t.correlation_id.as_deref(),
            Self::ChatGuestMember(t) => t.correlation_id.as_deref(),
            Self::UserActivity(t) => t.correlation_id.as_deref(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
