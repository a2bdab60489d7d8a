// =============================================================================
// MICROSOFT IDENTITY PLATFORM TOKEN PROVIDER
// =============================================================================
//
// Exchanges the configured credentials for a Microsoft Graph bearer token.
//
// **Grant selection:**
// - OAuth credentials with a refresh token -> `refresh_token` grant
// - OAuth credentials without one, or service-key credentials
//   -> `client_credentials` grant
//
// A new token is requested on every call. The HTTP client is built once in
// the constructor and reused for every exchange.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::core::auth::{AuthError, TokenProvider};
use crate::core::config::Credentials;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Which OAuth2 grant a token request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    RefreshToken,
    ClientCredentials,
}

impl GrantType {
    pub fn for_credentials(credentials: &Credentials) -> Self {
        if credentials.refresh_token().is_some() {
            GrantType::RefreshToken
        } else {
            GrantType::ClientCredentials
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            GrantType::RefreshToken => "refresh_token",
            GrantType::ClientCredentials => "client_credentials",
        }
    }
}

pub struct MicrosoftTokenProvider {
    client: Client,
    credentials: Credentials,
    token_url: String,
}

impl MicrosoftTokenProvider {
    pub fn new(credentials: Credentials) -> Result<Self, AuthError> {
        Self::with_authority(credentials, DEFAULT_AUTHORITY_HOST)
    }

    /// Uses a different authority host, e.g. a sovereign cloud.
    pub fn with_authority(credentials: Credentials, authority_host: &str) -> Result<Self, AuthError> {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            authority_host.trim_end_matches('/'),
            credentials.tenant_id()
        );

        let client = Client::builder()
            .build()
            .map_err(|e| AuthError::Http(e.to_string()))?;

        Ok(Self {
            client,
            credentials,
            token_url,
        })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn grant_type(&self) -> GrantType {
        GrantType::for_credentials(&self.credentials)
    }

    /// Form fields of the token request.
    pub fn grant_form(&self) -> Vec<(&'static str, String)> {
        let grant = self.grant_type();
        let mut form = vec![
            ("grant_type", grant.as_str().to_string()),
            ("client_id", self.credentials.client_id().to_string()),
            ("client_secret", self.credentials.client_secret().to_string()),
            ("scope", GRAPH_SCOPE.to_string()),
        ];

        if grant == GrantType::RefreshToken {
            if let Some(refresh_token) = self.credentials.refresh_token() {
                form.push(("refresh_token", refresh_token.to_string()));
            }
        }

        form
    }
}

/// Pulls the access token out of a token endpoint response.
pub fn interpret_token_response(body: &Value) -> Result<String, AuthError> {
    if let Some(token) = body.get("access_token").and_then(Value::as_str) {
        return Ok(token.to_string());
    }

    let error = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error")
        .to_string();
    let description = body
        .get("error_description")
        .and_then(Value::as_str)
        .unwrap_or("No error description provided.")
        .to_string();

    Err(AuthError::Authentication { error, description })
}

#[async_trait]
impl TokenProvider for MicrosoftTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        tracing::debug!(grant = ?self.grant_type(), "Requesting access token");

        let response = self
            .client
            .post(&self.token_url)
            .form(&self.grant_form())
            .send()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;

        // Error responses carry the same JSON shape, so the body is read either way.
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;
        let body: Value = serde_json::from_str(&text).map_err(|_| {
            AuthError::Http(format!("Token endpoint returned {}: {}", status, text))
        })?;

        interpret_token_response(&body)
    }
}
