//! Authorization grants.
//!
//! A grant knows how to obtain an [`AccessToken`] from the login service.
//! Only the client-credentials grant is implemented; the
//! [`AuthorizationGrant`] trait keeps other grant kinds pluggable.
//!
//! `authorize` follows a fixed order: validate, reset the stored token,
//! exchange, store, publish the update, then a best-effort organization
//! fetch. Callers observing the grant mid-authorize therefore see either no
//! credential or the complete new one, never a stale mix.

use std::fmt;

use async_trait::async_trait;
use coral_core::{AccessToken, ApiClient, CoralError};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// AuthorizationGrant
// ─────────────────────────────────────────────────────────────────────────────

/// A strategy for obtaining an access token.
#[async_trait]
pub trait AuthorizationGrant: Send + Sync {
    /// Obtain a fresh token, store it on the grant and the client.
    async fn authorize(&mut self, client: &ApiClient) -> Result<AccessToken, CoralError>;

    /// The currently stored token.
    fn access_token(&self) -> &AccessToken;
}

/// Payload delivered on the token-updated sink after a successful authorize.
#[derive(Clone, Debug)]
pub struct UpdatedAccessToken {
    /// The freshly stored token.
    pub token: AccessToken,
    /// Caller-supplied context attached to the grant, passed through
    /// untouched.
    pub custom_data: Option<serde_json::Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// ClientCredentialsGrant
// ─────────────────────────────────────────────────────────────────────────────

/// The OAuth client-credentials grant.
pub struct ClientCredentialsGrant {
    client_id: Uuid,
    secret: String,
    token: AccessToken,
    custom_data: Option<serde_json::Value>,
    token_updated: Option<mpsc::Sender<UpdatedAccessToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
}

impl ClientCredentialsGrant {
    /// Create a grant for an OAuth client.
    #[must_use]
    pub fn new(client_id: Uuid, secret: impl Into<String>) -> Self {
        Self {
            client_id,
            secret: secret.into(),
            token: AccessToken::default(),
            custom_data: None,
            token_updated: None,
        }
    }

    /// Attach caller context that is passed through on every token update.
    #[must_use]
    pub fn with_custom_data(mut self, data: serde_json::Value) -> Self {
        self.custom_data = Some(data);
        self
    }

    /// Attach a token-updated sink.
    ///
    /// At most one subscriber; the send blocks and happens strictly after
    /// the new token has been stored on the grant and the client.
    #[must_use]
    pub fn with_token_updated(mut self, sender: mpsc::Sender<UpdatedAccessToken>) -> Self {
        self.token_updated = Some(sender);
        self
    }

    fn validate(&self) -> Result<(), CoralError> {
        if self.client_id.is_nil() {
            return Err(CoralError::ArgumentMissing { field: "client_id" });
        }
        if self.secret.is_empty() {
            return Err(CoralError::ArgumentMissing { field: "secret" });
        }
        Ok(())
    }
}

#[async_trait]
impl AuthorizationGrant for ClientCredentialsGrant {
    #[tracing::instrument(skip_all, fields(client_id = %self.client_id))]
    async fn authorize(&mut self, client: &ApiClient) -> Result<AccessToken, CoralError> {
        self.validate()?;

        self.token.reset();
        client.reset_access_token();

        let authorization =
            ApiClient::basic_authorization(&self.client_id.to_string(), &self.secret);
        let response: TokenResponse = client
            .post_login_form(&authorization, &[("grant_type", "client_credentials")])
            .await?;

        let token = AccessToken::new(
            response.token_type,
            response.access_token,
            response.expires_in,
        );
        self.token = token.clone();
        client.set_access_token(token.clone());
        tracing::info!(expires_at = %token.expires_at, "access token acquired");

        if let Some(sender) = &self.token_updated {
            let update = UpdatedAccessToken {
                token: token.clone(),
                custom_data: self.custom_data.clone(),
            };
            if sender.send(update).await.is_err() {
                tracing::warn!("token update receiver dropped");
            }
        }

        // The organization is informational; failing to fetch it never
        // fails the authorize.
        if let Err(error) = client.get_my_organization().await {
            tracing::warn!(%error, "could not fetch organization");
        }

        Ok(token)
    }

    fn access_token(&self) -> &AccessToken {
        &self.token
    }
}

impl fmt::Debug for ClientCredentialsGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsGrant")
            .field("client_id", &self.client_id)
            .field("secret", &"***")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
