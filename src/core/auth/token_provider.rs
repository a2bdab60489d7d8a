use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while exchanging credentials for a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity provider answered, but without an access token.
    #[error("Authentication failed ({error}): {description}")]
    Authentication { error: String, description: String },
    #[error("Token request failed: {0}")]
    Http(String),
}

/// Source of bearer tokens for the workbook API.
///
/// Implementations are asked for a token before every API call. They may
/// cache tokens, but callers never rely on it.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

