// Connector configuration.
//
// The configuration is a JSON document, for example:
//
// {
//   "workbook_path": "/Documents/Reports/Sales.xlsx",
//   "credentials": {
//     "auth_type": "Client",
//     "tenant_id": "common",
//     "client_id": "...",
//     "client_secret": "...",
//     "refresh_token": "..."
//   },
//   "batch_size": 1000000,
//   "names_conversion": false,
//   "parse_dates": true,
//   "stream_name_overrides": [
//     { "source_stream_name": "Sheet1", "custom_stream_name": "orders" }
//   ]
// }

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BATCH_SIZE: u64 = 1_000_000;
pub const DEFAULT_TENANT_ID: &str = "common";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Credentials for the identity provider, selected by `auth_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "auth_type")]
pub enum Credentials {
    /// Delegated access through an OAuth app. Without a refresh token the
    /// app falls back to the client-credentials grant.
    #[serde(rename = "Client")]
    OAuth {
        #[serde(default = "default_tenant_id")]
        tenant_id: String,
        client_id: String,
        client_secret: String,
        #[serde(default)]
        refresh_token: Option<String>,
    },
    /// Application access with a client secret.
    #[serde(rename = "Service")]
    ServiceKey {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
}

impl Credentials {
    pub fn tenant_id(&self) -> &str {
        match self {
            Credentials::OAuth { tenant_id, .. } | Credentials::ServiceKey { tenant_id, .. } => {
                tenant_id
            }
        }
    }

    pub fn client_id(&self) -> &str {
        match self {
            Credentials::OAuth { client_id, .. } | Credentials::ServiceKey { client_id, .. } => {
                client_id
            }
        }
    }

    pub fn client_secret(&self) -> &str {
        match self {
            Credentials::OAuth { client_secret, .. }
            | Credentials::ServiceKey { client_secret, .. } => client_secret,
        }
    }

    /// The refresh token, if this is the OAuth flow and one is set.
    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            Credentials::OAuth { refresh_token, .. } => {
                refresh_token.as_deref().filter(|t| !t.is_empty())
            }
            Credentials::ServiceKey { .. } => None,
        }
    }
}

fn default_tenant_id() -> String {
    DEFAULT_TENANT_ID.to_string()
}

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

fn default_parse_dates() -> bool {
    true
}

/// Renames a worksheet's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamNameOverride {
    pub source_stream_name: String,
    pub custom_stream_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub workbook_path: String,
    pub credentials: Credentials,
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    #[serde(default)]
    pub names_conversion: bool,
    #[serde(default = "default_parse_dates")]
    pub parse_dates: bool,
    #[serde(default)]
    pub stream_name_overrides: Option<Vec<StreamNameOverride>>,
}

impl SourceConfig {
    /// Parses, normalizes and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: SourceConfig = serde_json::from_str(json)?;
        config.workbook_path = normalize_workbook_path(&config.workbook_path);
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from a JSON file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workbook_path.trim_start_matches('/').trim().is_empty() {
            return Err(ConfigError::Invalid(
                "workbook_path must name a workbook file".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.credentials.client_id().trim().is_empty() {
            return Err(ConfigError::Invalid(
                "credentials.client_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Stream name for a worksheet: the first matching override, else the worksheet name.
    pub fn stream_name_for(&self, worksheet_name: &str) -> String {
        self.stream_name_overrides
            .iter()
            .flatten()
            .find(|o| o.source_stream_name == worksheet_name)
            .map(|o| o.custom_stream_name.clone())
            .unwrap_or_else(|| worksheet_name.to_string())
    }
}

/// Ensures the path starts with a single leading `/`.
pub fn normalize_workbook_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
