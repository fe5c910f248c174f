//! HTTP client for the Coral CX platform API.
//!
//! [`ApiClient`] is a thin wrapper over [`reqwest`] that knows the platform's
//! URL layout, attaches the current bearer credential, and turns non-2xx
//! responses into typed [`ApiError`]s with the server-supplied status, code,
//! and context id preserved.
//!
//! The client holds the current [`AccessToken`] in a shared cell. Call sites
//! take a snapshot read per request; the authorization grant overwrites the
//! cell wholesale after a successful exchange.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::{ApiError, CoralError};
use crate::organization::Organization;
use crate::token::AccessToken;

// ─────────────────────────────────────────────────────────────────────────────
// ApiClient
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client bound to one platform region.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_url: String,
    login_url: String,
    token: Arc<RwLock<AccessToken>>,
    organization: Arc<RwLock<Option<Organization>>>,
}

impl ApiClient {
    /// Create a client for a platform region, e.g. `"coralcx.com"`.
    #[must_use]
    pub fn new(region: &str) -> Self {
        Self::with_urls(
            format!("https://api.{region}"),
            format!("https://login.{region}"),
        )
    }

    /// Create a client with explicit API and login base URLs.
    #[must_use]
    pub fn with_urls(api_url: impl Into<String>, login_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: trim_trailing_slash(api_url.into()),
            login_url: trim_trailing_slash(login_url.into()),
            token: Arc::new(RwLock::new(AccessToken::default())),
            organization: Arc::new(RwLock::new(None)),
        }
    }

    /// Base URL of the REST API, without a trailing slash.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Base URL of the login service, without a trailing slash.
    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Snapshot of the current access token.
    #[must_use]
    pub fn access_token(&self) -> AccessToken {
        self.token.read().clone()
    }

    /// Replace the stored access token wholesale.
    pub fn set_access_token(&self, token: AccessToken) {
        *self.token.write() = token;
    }

    /// Clear the stored access token.
    pub fn reset_access_token(&self) {
        self.token.write().reset();
    }

    /// The organization fetched after the last successful authorize, if any.
    #[must_use]
    pub fn organization(&self) -> Option<Organization> {
        self.organization.read().clone()
    }

    pub(crate) fn set_organization(&self, organization: Organization) {
        *self.organization.write() = Some(organization);
    }

    /// `Basic` authorization header value for the OAuth token exchange.
    #[must_use]
    pub fn basic_authorization(client_id: &str, secret: &str) -> String {
        let encoded = BASE64.encode(format!("{client_id}:{secret}"));
        format!("Basic {encoded}")
    }

    // ── Bearer-authenticated REST calls ──────────────────────────────────────

    /// `GET` a relative API path and decode the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CoralError> {
        let request = self
            .http
            .get(self.rest_url(path))
            .header("Authorization", self.bearer());
        self.execute_json(request).await
    }

    /// `POST` a JSON payload to a relative API path and decode the response.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, CoralError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .http
            .post(self.rest_url(path))
            .header("Authorization", self.bearer())
            .json(body);
        self.execute_json(request).await
    }

    /// `DELETE` a relative API path, discarding any response body.
    pub async fn delete(&self, path: &str) -> Result<(), CoralError> {
        let request = self
            .http
            .delete(self.rest_url(path))
            .header("Authorization", self.bearer());
        self.execute(request).await.map(|_| ())
    }

    // ── Explicitly-authorized calls (token exchange, guest JWT) ──────────────

    /// `POST` a JSON payload with an explicit `Authorization` header value.
    ///
    /// Guest chat endpoints authenticate with the conversation JWT rather
    /// than the client's bearer token.
    pub async fn post_with_authorization<B, T>(
        &self,
        path: &str,
        authorization: &str,
        body: &B,
    ) -> Result<T, CoralError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .http
            .post(self.rest_url(path))
            .header("Authorization", authorization)
            .json(body);
        self.execute_json(request).await
    }

    /// `DELETE` with an explicit `Authorization` header value.
    pub async fn delete_with_authorization(
        &self,
        path: &str,
        authorization: &str,
    ) -> Result<(), CoralError> {
        let request = self
            .http
            .delete(self.rest_url(path))
            .header("Authorization", authorization);
        self.execute(request).await.map(|_| ())
    }

    /// `POST` a form to the login service's `/oauth/token` endpoint.
    pub async fn post_login_form<T: DeserializeOwned>(
        &self,
        authorization: &str,
        form: &[(&str, &str)],
    ) -> Result<T, CoralError> {
        let request = self
            .http
            .post(format!("{}/oauth/token", self.login_url))
            .header("Authorization", authorization)
            .form(form);
        self.execute_json(request).await
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn rest_url(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.api_url, path.trim_start_matches('/'))
    }

    fn bearer(&self) -> String {
        self.token.read().authorization_header()
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, CoralError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), %body, "API request failed");
        Err(ApiError::from_body(status.as_u16(), &body).into())
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, CoralError> {
        let response = self.execute(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token cell stays out of Debug output.
        f.debug_struct("ApiClient")
            .field("api_url", &self.api_url)
            .field("login_url", &self.login_url)
            .finish_non_exhaustive()
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        let _ = url.pop();
    }
    url
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde::Deserialize;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Pong {
        ok: bool,
    }

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::with_urls(server.uri(), server.uri())
    }

    #[test]
    fn region_url_construction() {
        let client = ApiClient::new("coralcx.com");
        assert_eq!(client.api_url(), "https://api.coralcx.com");
        assert_eq!(client.login_url(), "https://login.coralcx.com");
    }

    #[test]
    fn trailing_slashes_trimmed() {
        let client = ApiClient::with_urls("https://api.example.com//", "https://login.example.com/");
        assert_eq!(client.api_url(), "https://api.example.com");
        assert_eq!(client.login_url(), "https://login.example.com");
    }

    #[test]
    fn basic_authorization_encodes_pair() {
        let value = ApiClient::basic_authorization("id", "secret");
        assert_eq!(value, format!("Basic {}", BASE64.encode("id:secret")));
    }

    #[test]
    fn token_cell_is_shared_across_clones() {
        let client = ApiClient::new("example.com");
        let clone = client.clone();
        client.set_access_token(AccessToken::new("Bearer", "tok", 60));
        assert_eq!(clone.access_token().token, "tok");
        clone.reset_access_token();
        assert!(!client.access_token().is_valid());
    }

    #[tokio::test]
    async fn get_attaches_bearer_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/ping"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.set_access_token(AccessToken::new("Bearer", "tok", 60));
        let pong: Pong = client.get("ping").await.unwrap();
        assert!(pong.ok);
    }

    #[tokio::test]
    async fn non_2xx_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/ping"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "status": 401,
                "code": "bad.credentials",
                "message": "authentication required",
                "contextId": "ctx-9"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: Result<Pong, _> = client.get("ping").await;
        assert_matches!(result, Err(CoralError::Api(e)) => {
            assert_eq!(e.status, 401);
            assert_eq!(e.code, "bad.credentials");
            assert_eq!(e.context_id.as_deref(), Some("ctx-9"));
        });
    }

    #[tokio::test]
    async fn delete_discards_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v2/notifications/channels/ch-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.delete("notifications/channels/ch-1").await.unwrap();
    }

    #[tokio::test]
    async fn explicit_authorization_overrides_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/webchat/guest/conversations/c/messages"))
            .and(header("Authorization", "Bearer guest-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.set_access_token(AccessToken::new("Bearer", "client-token", 60));
        let pong: Pong = client
            .post_with_authorization(
                "webchat/guest/conversations/c/messages",
                "Bearer guest-jwt",
                &serde_json::json!({"body": "hi"}),
            )
            .await
            .unwrap();
        assert!(pong.ok);
    }

    #[tokio::test]
    async fn login_form_posts_to_oauth_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header("Authorization", "Basic abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let pong: Pong = client
            .post_login_form("Basic abc", &[("grant_type", "client_credentials")])
            .await
            .unwrap();
        assert!(pong.ok);
    }
}
