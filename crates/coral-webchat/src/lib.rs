//! # coral-webchat
//!
//! Guest chat conversations for the Coral CX platform.
//!
//! - **`create_conversation`**: create a guest conversation and obtain the
//!   session JWT and event stream URI
//! - **`GuestChatSession`**: one websocket session per conversation, with a
//!   `Connecting → Open → Closing → Closed` lifecycle, an in-order receive
//!   loop, and an idempotent two-path `close`
//! - **`Member` / `MemberState`**: the roster vocabulary; unknown states
//!   decode forward-compatibly
//! - **`ChatFrame`**: the immutable frame received on the event stream

#![deny(unsafe_code)]

pub mod create;
pub mod member;
pub mod message;
pub mod session;

pub use create::{CreatedMember, GuestConversation, GuestInfo, RoutingTarget, create_conversation};
pub use member::{Member, MemberState};
pub use message::{ChatEventBody, ChatFrame};
pub use session::{ChatSessionInfo, GuestChatSession, MessageHandlers, SessionState};
