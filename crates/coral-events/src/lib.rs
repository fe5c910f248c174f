//! # coral-events
//!
//! Notification topics and the notification channel for the Coral CX
//! platform.
//!
//! - **`TopicEnvelope`**: the JSON wire envelope every notification frame
//!   arrives in
//! - **`Topic`**: closed enum of the topic kinds the client understands,
//!   decoded through a static ordered registry (first match wins, unknown
//!   names surface as `UnrecognizedTopic`)
//! - **`NotificationChannel`**: one websocket connection per channel, with a
//!   receive-loop task forwarding decoded topics on a bounded mpsc channel

#![deny(unsafe_code)]

pub mod channel;
pub mod chat_member;
pub mod chat_message;
pub mod envelope;
pub mod topic;
pub mod user_activity;

pub use channel::{NotificationChannel, ReceivedTopic};
pub use chat_member::ChatGuestMemberTopic;
pub use chat_message::{ChatMember, ChatMessageTopic};
pub use envelope::{EnvelopeMetadata, TopicEnvelope};
pub use topic::Topic;
pub use user_activity::{RoutingStatus, UserActivityTopic, UserPresence};
