//! The guest chat session state machine.
//!
//! A [`GuestChatSession`] owns the websocket connection to one conversation's
//! event stream and the member roster. Frames are processed strictly in
//! order; callbacks run inline in the receive loop, so an event is fully
//! handled before the next one is read.
//!
//! The only automatic termination is the local member going `DISCONNECTED`:
//! the `on_closed` callback fires first, then the socket is torn down and the
//! loop returns. Everything else either dispatches or is logged and skipped.

use std::collections::HashMap;

use coral_core::{ApiClient, ConversationId, CoralError, MemberId};
use futures::StreamExt;
use metrics::{counter, gauge};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use crate::create::GuestConversation;
use crate::member::Member;
use crate::message::ChatFrame;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Consecutive transient read errors tolerated before the loop gives up.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 5;

/// Lifecycle of a guest chat session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created but not yet connected.
    Connecting,
    /// Connected; the receive loop may run.
    Open,
    /// Teardown in progress.
    Closing,
    /// Torn down; terminal.
    Closed,
}

/// Cheap snapshot of session identity handed to callbacks.
#[derive(Clone, Debug)]
pub struct ChatSessionInfo {
    /// The conversation this session belongs to.
    pub conversation_id: ConversationId,
    /// The local (guest) member.
    pub local_member_id: MemberId,
}

type Handler = Box<dyn Fn(&ChatSessionInfo, &ChatFrame, &Member) + Send + Sync>;

/// Callbacks invoked by the receive loop. Unset callbacks are skipped.
#[derive(Default)]
pub struct MessageHandlers {
    on_closed: Option<Handler>,
    on_state_changed: Option<Handler>,
    on_message: Option<Handler>,
    on_typing: Option<Handler>,
}

impl MessageHandlers {
    /// No callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once when the session closes because the local member
    /// disconnected, before teardown.
    #[must_use]
    pub fn on_closed(
        mut self,
        handler: impl Fn(&ChatSessionInfo, &ChatFrame, &Member) + Send + Sync + 'static,
    ) -> Self {
        self.on_closed = Some(Box::new(handler));
        self
    }

    /// Called on every non-terminating member state change.
    #[must_use]
    pub fn on_state_changed(
        mut self,
        handler: impl Fn(&ChatSessionInfo, &ChatFrame, &Member) + Send + Sync + 'static,
    ) -> Self {
        self.on_state_changed = Some(Box::new(handler));
        self
    }

    /// Called for messages from members other than the local one.
    #[must_use]
    pub fn on_message(
        mut self,
        handler: impl Fn(&ChatSessionInfo, &ChatFrame, &Member) + Send + Sync + 'static,
    ) -> Self {
        self.on_message = Some(Box::new(handler));
        self
    }

    /// Called for typing indicators.
    #[must_use]
    pub fn on_typing(
        mut self,
        handler: impl Fn(&ChatSessionInfo, &ChatFrame, &Member) + Send + Sync + 'static,
    ) -> Self {
        self.on_typing = Some(Box::new(handler));
        self
    }
}

/// One guest chat conversation's websocket session.
pub struct GuestChatSession {
    conversation_id: ConversationId,
    jwt: String,
    event_stream_uri: String,
    local_member_id: MemberId,
    members: HashMap<MemberId, Member>,
    state: SessionState,
    echo_typing_from_self: bool,
    client: Option<ApiClient>,
    socket: Option<Socket>,
    cancel: CancellationToken,
}

impl GuestChatSession {
    /// Build a session from a freshly created conversation.
    #[must_use]
    pub fn new(client: ApiClient, conversation: GuestConversation) -> Self {
        let local_member = Member {
            id: conversation.member.id.clone(),
            ..Member::default()
        };
        let mut members = HashMap::new();
        let _ = members.insert(local_member.id.clone(), local_member);
        Self {
            conversation_id: conversation.id,
            jwt: conversation.jwt,
            event_stream_uri: conversation.event_stream_uri,
            local_member_id: conversation.member.id,
            members,
            state: SessionState::Connecting,
            echo_typing_from_self: true,
            client: Some(client),
            socket: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Whether the local member's own typing indicators reach `on_typing`.
    ///
    /// Defaults to `true`; messages never echo regardless.
    #[must_use]
    pub fn with_echo_typing_from_self(mut self, echo: bool) -> Self {
        self.echo_typing_from_self = echo;
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The conversation this session belongs to.
    #[must_use]
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// The local member's identifier.
    #[must_use]
    pub fn member_id(&self) -> &MemberId {
        &self.local_member_id
    }

    /// Look up a member in the roster.
    pub fn get_member(&self, id: &MemberId) -> Result<&Member, CoralError> {
        self.members.get(id).ok_or_else(|| CoralError::NotFound {
            kind: "member",
            id: id.to_string(),
        })
    }

    /// Insert or replace a roster member.
    pub fn update_member(&mut self, member: Member) {
        let _ = self.members.insert(member.id.clone(), member);
    }

    /// Dial the conversation's event stream.
    ///
    /// On failure the member is removed from the conversation best-effort
    /// before the error is returned; the session is then closed.
    #[tracing::instrument(skip_all, fields(conversation_id = %self.conversation_id))]
    pub async fn connect(&mut self) -> Result<(), CoralError> {
        if self.socket.is_some() {
            return Ok(());
        }
        match connect_async(&self.event_stream_uri).await {
            Ok((socket, _)) => {
                self.socket = Some(socket);
                self.state = SessionState::Open;
                counter!("coral_chat_connections_total").increment(1);
                gauge!("coral_chat_sessions_active").increment(1.0);
                tracing::info!("guest chat connected");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, "could not dial event stream, leaving conversation");
                if let Some(client) = self.client.take() {
                    if let Err(leave_error) = client
                        .delete_with_authorization(&self.member_path(), &self.authorization())
                        .await
                    {
                        tracing::warn!(error = %leave_error, "could not leave conversation");
                    }
                }
                self.state = SessionState::Closed;
                Err(CoralError::connection(error))
            }
        }
    }

    /// Run the receive loop until the session terminates.
    ///
    /// Frames are handled strictly in order. Returns `Ok` when the session
    /// ended normally (local disconnect or [`close`](Self::close)); socket
    /// failures return a [`CoralError::Connection`] after teardown.
    #[tracing::instrument(skip_all, fields(conversation_id = %self.conversation_id))]
    pub async fn handle_messages(&mut self, handlers: &MessageHandlers) -> Result<(), CoralError> {
        if self.socket.is_none() {
            return Err(CoralError::Connection {
                message: "session is not connected".to_owned(),
            });
        }
        let mut consecutive_errors: u32 = 0;
        loop {
            let Some(socket) = self.socket.as_mut() else {
                return Ok(());
            };
            let cancel = self.cancel.clone();
            let frame = tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                frame = socket.next() => frame,
            };
            match frame {
                None => {
                    self.teardown_socket().await;
                    return Err(CoralError::Connection {
                        message: "event stream ended".to_owned(),
                    });
                }
                Some(Err(error)) if is_fatal(&error) => {
                    self.teardown_socket().await;
                    return Err(CoralError::connection(error));
                }
                Some(Err(error)) => {
                    consecutive_errors += 1;
                    counter!("coral_chat_read_errors_total").increment(1);
                    tracing::warn!(%error, consecutive_errors, "read error on event stream");
                    if consecutive_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                        self.teardown_socket().await;
                        return Err(CoralError::Connection {
                            message: "read error budget exhausted".to_owned(),
                        });
                    }
                }
                Some(Ok(Message::Text(text))) => {
                    consecutive_errors = 0;
                    if self.dispatch(handlers, text.as_str()) {
                        self.teardown_socket().await;
                        return Ok(());
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    tracing::debug!("server sent close frame");
                }
                Some(Ok(_)) => {
                    consecutive_errors = 0;
                }
            }
        }
    }

    /// Handle one frame; returns `true` when the session must terminate.
    fn dispatch(&mut self, handlers: &MessageHandlers, raw: &str) -> bool {
        let frame: ChatFrame = match serde_json::from_str(raw) {
            Ok(frame) => frame,
            Err(error) => {
                tracing::warn!(%error, raw, "malformed frame");
                return false;
            }
        };
        let topic = frame.topic_name.to_ascii_lowercase();
        if topic == "channel.metadata" {
            if frame.is_heartbeat() {
                tracing::trace!("heartbeat");
            } else {
                tracing::warn!(raw, "unknown channel.metadata frame");
            }
            return false;
        }
        if topic == format!("v2.conversations.chats.{}.members", self.conversation_id) {
            return self.dispatch_member_change(handlers, &frame, raw);
        }
        if topic == format!("v2.conversations.chats.{}.messages", self.conversation_id) {
            self.dispatch_message(handlers, &frame, raw);
            return false;
        }
        tracing::warn!(topic_name = %frame.topic_name, raw, "unrecognized frame");
        false
    }

    fn dispatch_member_change(
        &mut self,
        handlers: &MessageHandlers,
        frame: &ChatFrame,
        raw: &str,
    ) -> bool {
        if frame.kind() != "member-change" {
            tracing::warn!(kind = %frame.kind(), raw, "unknown member frame type");
            return false;
        }
        let Some(event_member) = frame.event_body.member.clone() else {
            tracing::warn!(raw, "member-change frame without a member");
            return false;
        };
        let mut member = self.resolve_member(&event_member);
        member.state = event_member.state.clone();

        // The guest leaving ends the whole chat.
        if event_member.id == self.local_member_id && event_member.state.is_disconnected() {
            tracing::info!("local member disconnected, closing session");
            self.state = SessionState::Closing;
            if let Some(on_closed) = &handlers.on_closed {
                on_closed(&self.info(), frame, &member);
            }
            return true;
        }

        if let Some(on_state_changed) = &handlers.on_state_changed {
            on_state_changed(&self.info(), frame, &member);
        }
        let _ = self.members.insert(member.id.clone(), member);
        false
    }

    fn dispatch_message(&mut self, handlers: &MessageHandlers, frame: &ChatFrame, raw: &str) {
        let Some(sender) = frame.event_body.sender.clone() else {
            tracing::warn!(raw, "message frame without a sender");
            return;
        };
        let resolved = self.resolve_member(&sender);
        let from_self = sender.id == self.local_member_id;
        match frame.kind().as_str() {
            "message" => {
                counter!("coral_chat_messages_total").increment(1);
                if from_self {
                    tracing::trace!("suppressing echo of own message");
                } else if let Some(on_message) = &handlers.on_message {
                    on_message(&self.info(), frame, &resolved);
                }
            }
            "typing-indicator" => {
                if !from_self || self.echo_typing_from_self {
                    if let Some(on_typing) = &handlers.on_typing {
                        on_typing(&self.info(), frame, &resolved);
                    }
                }
            }
            kind => {
                tracing::warn!(kind, raw, "unknown message frame type");
            }
        }
    }

    /// Send a chat message as the local member.
    pub async fn send_message(&self, body: &str) -> Result<(), CoralError> {
        let client = self.require_client()?;
        let _: serde_json::Value = client
            .post_with_authorization(
                &format!("{}/messages", self.member_path()),
                &self.authorization(),
                &serde_json::json!({"body": body, "bodyType": "standard"}),
            )
            .await?;
        Ok(())
    }

    /// Signal that the local member is typing.
    pub async fn send_typing(&self) -> Result<(), CoralError> {
        let client = self.require_client()?;
        let _: serde_json::Value = client
            .post_with_authorization(
                &format!("{}/typing", self.member_path()),
                &self.authorization(),
                &serde_json::json!({}),
            )
            .await?;
        Ok(())
    }

    /// Close the session.
    ///
    /// Exactly one teardown path runs: the socket is closed when held,
    /// otherwise the member leaves the conversation over HTTP. Calling
    /// `close` on a closed session is a no-op.
    #[tracing::instrument(skip_all, fields(conversation_id = %self.conversation_id))]
    pub async fn close(&mut self) -> Result<(), CoralError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closing;
        self.cancel.cancel();
        if self.socket.is_some() {
            self.teardown_socket().await;
        } else if let Some(client) = self.client.take() {
            client
                .delete_with_authorization(&self.member_path(), &self.authorization())
                .await?;
            tracing::info!("left conversation");
        }
        self.state = SessionState::Closed;
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn info(&self) -> ChatSessionInfo {
        ChatSessionInfo {
            conversation_id: self.conversation_id,
            local_member_id: self.local_member_id.clone(),
        }
    }

    /// Roster lookup with the frame's own member as fallback, so dispatch
    /// never aborts on an unknown member.
    fn resolve_member(&self, event_member: &Member) -> Member {
        self.members.get(&event_member.id).cloned().unwrap_or_else(|| {
            tracing::warn!(member_id = %event_member.id, "member not in roster, using frame member");
            event_member.clone()
        })
    }

    fn require_client(&self) -> Result<&ApiClient, CoralError> {
        self.client.as_ref().ok_or_else(|| CoralError::Connection {
            message: "session is closed".to_owned(),
        })
    }

    fn member_path(&self) -> String {
        format!(
            "webchat/guest/conversations/{}/members/{}",
            self.conversation_id, self.local_member_id
        )
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.jwt)
    }

    async fn teardown_socket(&mut self) {
        self.cancel.cancel();
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None).await;
            gauge!("coral_chat_sessions_active").decrement(1.0);
        }
        self.client = None;
        self.state = SessionState::Closed;
    }
}

fn is_fatal(error: &tokio_tungstenite::tungstenite::Error) -> bool {
    use tokio_tungstenite::tungstenite::Error;
    matches!(error, Error::ConnectionClosed | Error::AlreadyClosed)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
