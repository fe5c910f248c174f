//! User activity topic.

use chrono::{DateTime, Utc};
use coral_core::CoralError;
use serde::{Deserialize, Serialize};

use crate::envelope::TopicEnvelope;
use crate::topic::Topic;

const PREFIX: &str = "v2.users.";
const SUFFIX: &str = ".activity";

/// A user's presence snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPresence {
    /// Presence definition identifier.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// System presence, e.g. `Available` or `Away`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub system_presence: String,
    /// Free-form presence message.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// A user's routing status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingStatus {
    /// Status, e.g. `IDLE` or `INTERACTING`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    /// When the status took effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

/// Presence or routing activity for one user.
///
/// The subject user ID is extracted from the topic name. The body is decoded
/// forward-compatibly: unknown fields are ignored and every known field is
/// optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivityTopic {
    /// The full topic name.
    pub name: String,
    /// Subject user identifier, as embedded in the topic name.
    pub user_id: String,
    /// Presence snapshot, when supplied.
    pub presence: Option<UserPresence>,
    /// Routing status, when supplied.
    pub routing_status: Option<RoutingStatus>,
    /// Queues the user is currently active on.
    pub active_queue_ids: Vec<String>,
    /// Correlation identifier from the envelope metadata.
    pub correlation_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Body {
    presence: Option<UserPresence>,
    routing_status: Option<RoutingStatus>,
    active_queue_ids: Vec<String>,
}

impl UserActivityTopic {
    /// Whether a topic name belongs to this variant.
    #[must_use]
    pub fn matches(topic_name: &str) -> bool {
        topic_name.starts_with(PREFIX) && topic_name.ends_with(SUFFIX)
    }

    /// The subscription topic name for a user.
    #[must_use]
    pub fn topic_for(user_id: &str) -> String {
        format!("{PREFIX}{user_id}{SUFFIX}")
    }

    pub(crate) fn decode(envelope: &TopicEnvelope) -> Result<Topic, CoralError> {
        let body: Body = serde_json::from_value(envelope.event_body.clone())?;
        let name = &envelope.topic_name;
        let subject = name.strip_prefix(PREFIX).unwrap_or(name);
        let user_id = subject.strip_suffix(SUFFIX).unwrap_or(subject).to_owned();
        Ok(Topic::UserActivity(Self {
            name: envelope.topic_name.clone(),
            user_id,
            presence: body.presence,
            routing_status: body.routing_status,
            active_queue_ids: body.active_queue_ids,
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

    #[test]
    fn matches_activity_names() {
        assert!(UserActivityTopic::matches("v2.users.1234.activity"));
        assert!(!UserActivityTopic::matches("v2.users.1234.presence"));
        assert!(!UserActivityTopic::matches("v2.conversations.chats.1234.activity"));
    }

    #[test]
    fn topic_for_builds_name() {
        assert_eq!(UserActivityTopic::topic_for("1234"), "v2.users.1234.activity");
    }

    #[test]
    fn subject_extracted_from_name() {
        let json = r#"{
            "topicName": "v2.users.1234.activity",
            "eventBody": {
                "presence": {"systemPresence": "Available"},
                "routingStatus": {"status": "IDLE"},
                "activeQueueIds": ["q-1", "q-2"]
            },
            "metadata": {"correlationId": "corr-3"},
            "version": "2"
        }"#;
        let envelope: TopicEnvelope = serde_json::from_str(json).unwrap();
        let topic = UserActivityTopic::decode(&envelope).unwrap();
        assert_matches!(topic, Topic::UserActivity(t) => {
            assert_eq!(t.user_id, "1234");
            assert_eq!(t.presence.unwrap().system_presence, "Available");
            assert_eq!(t.routing_status.unwrap().status, "IDLE");
            assert_eq!(t.active_queue_ids, vec!["q-1", "q-2"]);
            assert_eq!(t.correlation_id.as_deref(), Some("corr-3"));
        });
    }

    #[test]
    fn unknown_body_fields_ignored() {
        let json = r#"{
            "topicName": "v2.users.1234.activity",
            "eventBody": {"dateActiveQueuesChanged": "2026-08-28T10:00:00Z", "extra": {"nested": 1}},
            "version": "2"
        }"#;
        let envelope: TopicEnvelope = serde_json::from_str(json).unwrap();
        let topic = UserActivityTopic::decode(&envelope).unwrap();
        assert_matches!(topic, Topic::UserActivity(t) => {
            assert!(t.presence.is_none());
            assert!(t.routing_status.is_none());
            assert!(t.active_queue_ids.is_empty());
        });
    }
}
