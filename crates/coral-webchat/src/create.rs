//! Guest chat conversation creation.

use coral_core::{ApiClient, ConversationId, CoralError, DeploymentId, MemberId};
use serde::{Deserialize, Serialize};

/// Where the conversation should be routed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingTarget {
    /// Target type, e.g. `QUEUE`.
    pub target_type: String,
    /// Target address, e.g. the queue name.
    pub target_address: String,
    /// Requested priority, when routing supports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl RoutingTarget {
    /// Route to a queue by name.
    #[must_use]
    pub fn queue(name: impl Into<String>) -> Self {
        Self {
            target_type: "QUEUE".to_owned(),
            target_address: name.into(),
            priority: None,
        }
    }
}

/// The guest joining the conversation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestInfo {
    /// Name shown to agents.
    pub display_name: String,
    /// Avatar image, when the guest has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_image_url: Option<String>,
    /// Deployment-defined extra fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<serde_json::Value>,
}

impl GuestInfo {
    /// A guest with just a display name.
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            avatar_image_url: None,
            custom_fields: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePayload<'a> {
    organization_id: &'a str,
    deployment_id: &'a DeploymentId,
    routing_target: &'a RoutingTarget,
    member_info: &'a GuestInfo,
}

/// A created guest chat conversation, ready to be connected.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestConversation {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Session JWT; authenticates all guest calls for this conversation.
    pub jwt: String,
    /// WebSocket URI of the session's event stream.
    pub event_stream_uri: String,
    /// The local (guest) member created by the platform.
    pub member: CreatedMember,
}

/// The guest member record in a create response.
#[derive(Clone, Debug, Deserialize)]
pub struct CreatedMember {
    /// The local member's identifier.
    pub id: MemberId,
}

/// Create a guest chat conversation.
///
/// The organization must already be known on the client (fetched during
/// authorize). Construction-time API errors propagate verbatim.
#[tracing::instrument(skip_all, fields(deployment = %deployment))]
pub async fn create_conversation(
    client: &ApiClient,
    deployment: &DeploymentId,
    target: &RoutingTarget,
    guest: &GuestInfo,
) -> Result<GuestConversation, CoralError> {
    let organization = client
        .organization()
        .ok_or(CoralError::ArgumentMissing {
            field: "organization",
        })?;
    let payload = CreatePayload {
        organization_id: &organization.id,
        deployment_id: deployment,
        routing_target: target,
        member_info: guest,
    };
    let conversation: GuestConversation =
        client.post("webchat/guest/conversations", &payload).await?;
    tracing::info!(conversation_id = %conversation.id, "guest conversation created");
    Ok(conversation)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
