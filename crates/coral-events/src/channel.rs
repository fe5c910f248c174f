//! The notification channel.
//!
//! A [`NotificationChannel`] owns one long-lived websocket connection to the
//! notification service. Opening a channel is a two-step handshake: a REST
//! call creates the channel record (`POST /notifications/channels`), then the
//! returned `connectUri` is dialed. A dedicated tokio task reads frames,
//! decodes them through the topic registry, and forwards decoded topics on a
//! bounded mpsc channel.
//!
//! The hand-off channel is bounded and the forward is a blocking send: a slow
//! consumer stalls frame decoding rather than growing an unbounded queue.
//! Heartbeat frames are observed and trace-logged, never forwarded.

use chrono::{DateTime, Utc};
use coral_core::{ApiClient, ChannelId, CoralError};
use futures::{Stream, StreamExt};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::envelope::TopicEnvelope;
use crate::topic::Topic;

/// Capacity of the topic hand-off channel.
const QUEUE_DEPTH: usize = 64;

/// Consecutive transient read errors tolerated before the loop gives up.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 5;

/// A decoded topic handed to the consumer, with enough context to act on it.
///
/// Every received topic carries a usable [`ApiClient`], so consumers can make
/// follow-up API calls without threading the client separately.
#[derive(Clone, Debug)]
pub struct ReceivedTopic {
    /// The decoded topic.
    pub topic: Topic,
    /// The channel the topic arrived on.
    pub channel_id: ChannelId,
    /// Client for follow-up API calls.
    pub client: ApiClient,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelRecord {
    id: ChannelId,
    connect_uri: String,
    #[serde(default)]
    expires: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct SubscriptionEntry<'a> {
    id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct SubscriptionList {
    #[serde(default)]
    entities: Vec<SubscriptionId>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionId {
    id: String,
}

/// A notification channel and its receive loop.
#[derive(Debug)]
pub struct NotificationChannel {
    id: ChannelId,
    connect_uri: String,
    expires: Option<DateTime<Utc>>,
    client: ApiClient,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl NotificationChannel {
    /// Create a channel, dial its websocket, and start the receive loop.
    ///
    /// Returns the channel handle and the receiver that decoded topics arrive
    /// on. Dropping the receiver stops the loop at the next forward.
    #[tracing::instrument(skip_all)]
    pub async fn open(
        client: ApiClient,
    ) -> Result<(Self, mpsc::Receiver<ReceivedTopic>), CoralError> {
        let record: ChannelRecord = client
            .post("notifications/channels", &serde_json::json!({}))
            .await?;
        tracing::info!(channel_id = %record.id, "notification channel created");

        let (socket, _) = connect_async(&record.connect_uri)
            .await
            .map_err(CoralError::connection)?;
        counter!("coral_channel_connections_total").increment(1);

        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(receive_loop(
            socket,
            tx,
            client.clone(),
            record.id.clone(),
            cancel.clone(),
        ));

        let channel = Self {
            id: record.id,
            connect_uri: record.connect_uri,
            expires: record.expires,
            client,
            cancel,
            task: Some(task),
        };
        Ok((channel, rx))
    }

    /// The channel identifier.
    #[must_use]
    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    /// The websocket URI the channel is connected to.
    #[must_use]
    pub fn connect_uri(&self) -> &str {
        &self.connect_uri
    }

    /// When the server will expire the channel, if reported.
    #[must_use]
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    /// Subscribe the channel to topic names; returns the accepted names.
    #[tracing::instrument(skip_all, fields(channel_id = %self.id, count = topics.len()))]
    pub async fn subscribe(&self, topics: &[String]) -> Result<Vec<String>, CoralError> {
        let entries: Vec<SubscriptionEntry<'_>> = topics
            .iter()
            .map(|topic| SubscriptionEntry { id: topic })
            .collect();
        let list: SubscriptionList = self
            .client
            .post(
                &format!("notifications/channels/{}/subscriptions", self.id),
                &entries,
            )
            .await?;
        Ok(list.entities.into_iter().map(|entry| entry.id).collect())
    }

    /// Stop the receive loop and delete the channel record.
    ///
    /// Idempotent; the server-side delete is best-effort.
    #[tracing::instrument(skip_all, fields(channel_id = %self.id))]
    pub async fn close(&mut self) -> Result<(), CoralError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        self.cancel.cancel();
        if let Err(error) = task.await {
            tracing::warn!(%error, "receive loop did not shut down cleanly");
        }
        if let Err(error) = self
            .client
            .delete(&format!("notifications/channels/{}", self.id))
            .await
        {
            tracing::warn!(%error, "could not delete notification channel");
        }
        tracing::info!("notification channel closed");
        Ok(())
    }
}

impl Drop for NotificationChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn is_fatal(error: &tokio_tungstenite::tungstenite::Error) -> bool {
    use tokio_tungstenite::tungstenite::Error;
    matches!(error, Error::ConnectionClosed | Error::AlreadyClosed)
}

async fn receive_loop<S>(
    mut socket: S,
    tx: mpsc::Sender<ReceivedTopic>,
    client: ApiClient,
    channel_id: ChannelId,
    cancel: CancellationToken,
) where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let mut consecutive_errors: u32 = 0;
    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => break,
            frame = socket.next() => frame,
        };
        match frame {
            None => {
                tracing::warn!(channel_id = %channel_id, "notification stream ended");
                break;
            }
            Some(Err(error)) if is_fatal(&error) => {
                tracing::warn!(channel_id = %channel_id, %error, "notification socket closed");
                break;
            }
            Some(Err(error)) => {
                consecutive_errors += 1;
                counter!("coral_channel_read_errors_total").increment(1);
                tracing::warn!(
                    channel_id = %channel_id,
                    %error,
                    consecutive_errors,
                    "read error on notification socket"
                );
                if consecutive_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                    tracing::error!(channel_id = %channel_id, "read error budget exhausted");
                    break;
                }
            }
            Some(Ok(Message::Text(text))) => {
                consecutive_errors = 0;
                let envelope: TopicEnvelope = match serde_json::from_str(text.as_str()) {
                    Ok(envelope) => envelope,
                    Err(error) => {
                        tracing::warn!(%error, raw = text.as_str(), "undecodable frame");
                        continue;
                    }
                };
                if envelope.is_heartbeat() {
                    tracing::trace!(channel_id = %channel_id, "heartbeat");
                    continue;
                }
                match Topic::from_envelope(&envelope) {
                    Ok(topic) => {
                        counter!("coral_channel_topics_total").increment(1);
                        let received = ReceivedTopic {
                            topic,
                            channel_id: channel_id.clone(),
                            client: client.clone(),
                        };
                        // Blocking send: backpressure from a slow consumer.
                        // Cancellation must still interrupt a parked forward.
                        let sent = tokio::select! {
                            () = cancel.cancelled() => break,
                            sent = tx.send(received) => sent,
                        };
                        if sent.is_err() {
                            tracing::debug!("topic receiver dropped, stopping loop");
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, raw = text.as_str(), "dropping frame");
                    }
                }
            }
            Some(Ok(Message::Close(_))) => {
                tracing::info!(channel_id = %channel_id, "server closed notification socket");
                break;
            }
            Some(Ok(_)) => {
                // Ping/pong/binary frames carry no topics.
                consecutive_errors = 0;
            }
        }
    }
    counter!("coral_channel_disconnections_total").increment(1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
