//! Organization record.

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::errors::CoralError;

/// The organization a credential belongs to, as returned by
/// `GET /organizations/me`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Organization {
    /// Organization identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short name used in platform URLs.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub third_party_org_name: String,
    /// Default language tag, e.g. `"en-US"`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_language: String,
    /// Default country code.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_country_code: String,
    /// Domain under which the organization is served.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub domain: String,
    /// Current state, e.g. `"active"`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
    /// Version counter maintained by the platform.
    pub version: u32,
    /// Whether voicemail is enabled for the organization.
    pub voicemail_enabled: bool,
}

impl ApiClient {
    /// Fetch the organization the current credential belongs to and cache it
    /// on the client.
    pub async fn get_my_organization(&self) -> Result<Organization, CoralError> {
        let organization: Organization = self.get("organizations/me").await?;
        tracing::debug!(org_id = %organization.id, org_name = %organization.name, "fetched organization");
        self.set_organization(organization.clone());
        Ok(organization)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::AccessToken;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn decodes_with_unknown_fields_ignored() {
        let json = r#"{
            "id": "org-1",
            "name": "Acme",
            "defaultLanguage": "en-US",
            "state": "active",
            "version": 7,
            "voicemailEnabled": true,
            "features": {"chat": true}
        }"#;
        let org: Organization = serde_json::from_str(json).unwrap();
        assert_eq!(org.id, "org-1");
        assert_eq!(org.default_language, "en-US");
        assert_eq!(org.version, 7);
        assert!(org.voicemail_enabled);
    }

    #[tokio::test]
    async fn get_my_organization_caches_on_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/organizations/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "org-1",
                "name": "Acme"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::with_urls(server.uri(), server.uri());
        client.set_access_token(AccessToken::new("Bearer", "tok", 60));
        assert!(client.organization().is_none());

        let org = client.get_my_organization().await.unwrap();
        assert_eq!(org.name, "Acme");
        assert_eq!(client.organization().unwrap().id, "org-1");
    }
}
