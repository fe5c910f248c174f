//! Chat members and their connection state.

use chrono::{DateTime, Utc};
use coral_core::MemberId;
use serde::{Deserialize, Serialize};

/// Connection state of a chat member.
///
/// Unknown states decode as [`MemberState::Other`] so new platform states
/// never fail a frame decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemberState {
    /// The member is being alerted about the conversation.
    Alerting,
    /// The member is connected.
    Connected,
    /// The member left the conversation.
    Disconnected,
    /// The member is typing.
    Typing,
    /// A state this client does not know about.
    Other(String),
}

impl MemberState {
    /// Whether the member has left the conversation.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Canonical wire form, e.g. `"CONNECTED"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Alerting => "ALERTING",
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
            Self::Typing => "TYPING",
            Self::Other(state) => state,
        }
    }
}

impl Default for MemberState {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for MemberState {
    fn from(state: String) -> Self {
        match state.to_ascii_uppercase().as_str() {
            "ALERTING" => Self::Alerting,
            "CONNECTED" => Self::Connected,
            "DISCONNECTED" => Self::Disconnected,
            "TYPING" => Self::Typing,
            _ => Self::Other(state),
        }
    }
}

impl From<MemberState> for String {
    fn from(state: MemberState) -> Self {
        state.as_str().to_owned()
    }
}

/// A participant in a guest chat conversation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Member {
    /// Member identifier.
    pub id: MemberId,
    /// Display name, when known.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    /// Role, e.g. `CUSTOMER` or `AGENT`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role: String,
    /// Current connection state.
    pub state: MemberState,
    /// When the member joined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_date: Option<DateTime<Utc>>,
    /// Avatar image, when supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Member {
    /// Whether this member has left the conversation.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.state.is_disconnected()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_states_decode() {
        for (wire, expected) in [
            ("ALERTING", MemberState::Alerting),
            ("CONNECTED", MemberState::Connected),
            ("DISCONNECTED", MemberState::Disconnected),
            ("TYPING", MemberState::Typing),
        ] {
            let state: MemberState = serde_json::from_str(&format!("\"{wire}\"")).unwrap();
            assert_eq!(state, expected);
            assert_eq!(state.as_str(), wire);
        }
    }

    #[test]
    fn unknown_state_is_preserved() {
        let state: MemberState = serde_json::from_str("\"ON_HOLD\"").unwrap();
        assert_eq!(state, MemberState::Other("ON_HOLD".to_owned()));
        assert_eq!(serde_json::to_string(&state).unwrap(), "\"ON_HOLD\"");
        assert!(!state.is_disconnected());
    }

    #[test]
    fn state_decode_is_case_insensitive() {
        let state: MemberState = serde_json::from_str("\"connected\"").unwrap();
        assert_eq!(state, MemberState::Connected);
    }

    #[test]
    fn disconnected_helpers() {
        assert!(MemberState::Disconnected.is_disconnected());
        assert!(!MemberState::Connected.is_disconnected());
        let member = Member {
            id: MemberId::from("m-1"),
            state: MemberState::Disconnected,
            ..Member::default()
        };
        assert!(member.is_disconnected());
    }

    #[test]
    fn member_decodes_from_wire_shape() {
        let json = r#"{
            "id": "m-1",
            "displayName": "Guest",
            "role": "CUSTOMER",
            "state": "CONNECTED",
            "joinDate": "2026-08-28T10:00:00Z"
        }"#;
        let member: Member = serde_json::from_str(json).unwrap();
        assert_eq!(member.id.as_str(), "m-1");
        assert_eq!(member.display_name, "Guest");
        assert_eq!(member.state, MemberState::Connected);
        assert!(member.join_date.is_some());
        assert!(member.avatar_url.is_none());
    }

    #[test]
    fn member_with_missing_fields_defaults() {
        let member: Member = serde_json::from_str(r#"{"id": "m-2"}"#).unwrap();
        assert_eq!(member.state, MemberState::default());
        assert!(member.display_name.is_empty());
    }
}
