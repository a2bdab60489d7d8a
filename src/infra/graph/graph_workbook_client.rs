use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::core::auth::TokenProvider;
use crate::core::workbook::{
    RangeData, RangeRequest, Visibility, WorkbookApi, WorkbookError, WorksheetDescriptor,
};

pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Microsoft Graph workbook client scoped to one workbook in the user's drive.
///
/// Every call asks the token provider for a fresh bearer token.
pub struct GraphWorkbookClient<T: TokenProvider> {
    client: Client,
    tokens: T,
    base_url: String,
    workbook_path: String,
}

impl<T: TokenProvider> GraphWorkbookClient<T> {
    pub fn new(tokens: T, workbook_path: &str) -> Result<Self, WorkbookError> {
        Self::with_base_url(tokens, workbook_path, GRAPH_BASE_URL)
    }

    pub fn with_base_url(
        tokens: T,
        workbook_path: &str,
        base_url: &str,
    ) -> Result<Self, WorkbookError> {
        let client = Client::builder()
            .build()
            .map_err(|e| WorkbookError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
            workbook_path: workbook_path.to_string(),
        })
    }

    fn workbook_url(&self) -> String {
        format!(
            "{}/me/drive/root:/{}:/workbook",
            self.base_url,
            self.workbook_path.trim_start_matches('/')
        )
    }

    pub fn worksheets_url(&self) -> String {
        format!("{}/worksheets", self.workbook_url())
    }

    pub fn range_url(&self, worksheet_id: &str, range: Option<&RangeRequest>) -> String {
        match range {
            Some(range) => format!(
                "{}/worksheets/{}/range(address='{}')",
                self.workbook_url(),
                worksheet_id,
                range.address()
            ),
            None => format!("{}/worksheets/{}/usedRange", self.workbook_url(), worksheet_id),
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, WorkbookError> {
        let token = self.tokens.access_token().await?;

        self.client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| WorkbookError::Transport(e.to_string()))
    }
}

/// Message of a Graph error body (`{"error": {"message": ...}}`).
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| "Unknown error".to_string())
}

fn map_worksheet(api: ApiWorksheet) -> Option<WorksheetDescriptor> {
    let visibility = match api.visibility.as_deref() {
        Some("Visible") => Visibility::Visible,
        Some("Hidden") => Visibility::Hidden,
        Some("VeryHidden") => Visibility::VeryHidden,
        _ => Visibility::Unknown,
    };

    Some(WorksheetDescriptor {
        id: api.id?,
        name: api.name.unwrap_or_else(|| "Unknown".to_string()),
        visibility,
    })
}

/// Keeps only visible worksheets from a listing response.
pub fn visible_worksheets(listing: ApiWorksheetList) -> Vec<WorksheetDescriptor> {
    listing
        .value
        .into_iter()
        .filter_map(map_worksheet)
        .filter(WorksheetDescriptor::is_visible)
        .collect()
}

#[async_trait]
impl<T: TokenProvider> WorkbookApi for GraphWorkbookClient<T> {
    async fn list_worksheets(&self) -> Result<Vec<WorksheetDescriptor>, WorkbookError> {
        let resp = self.get(&self.worksheets_url()).await?;

        if resp.status() != StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            return Err(WorkbookError::Configuration {
                message: format!(
                    "Failed to access workbook at {}. Please check the path and permissions.",
                    self.workbook_path
                ),
                internal: format!("Failed to get worksheets: {}", error_message(&text)),
            });
        }

        let listing: ApiWorksheetList = resp
            .json()
            .await
            .map_err(|e| WorkbookError::Transport(e.to_string()))?;

        let worksheets = visible_worksheets(listing);
        tracing::debug!("Found {} visible worksheet(s)", worksheets.len());
        Ok(worksheets)
    }

    async fn get_range(
        &self,
        worksheet_id: &str,
        range: Option<&RangeRequest>,
    ) -> Result<RangeData, WorkbookError> {
        let resp = self.get(&self.range_url(worksheet_id, range)).await?;

        match resp.status() {
            StatusCode::OK => resp
                .json::<RangeData>()
                .await
                .map_err(|e| WorkbookError::Transport(e.to_string())),
            StatusCode::NOT_FOUND => Ok(RangeData::empty()),
            _ => {
                let text = resp.text().await.unwrap_or_default();
                Err(WorkbookError::Transport(error_message(&text)))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiWorksheetList {
    #[serde(default)]
    value: Vec<ApiWorksheet>,
}

#[derive(Debug, Deserialize)]
struct ApiWorksheet {
    id: Option<String>,
    name: Option<String>,
    visibility: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::AuthError;
    use crate::infra::test_server::respond_once;

    struct StaticToken;

    #[async_trait]
    impl TokenProvider for StaticToken {
        async fn access_token(&self) -> Result<String, AuthError> {
            Ok("token".to_string())
        }
    }

    #[test]
    fn test_urls_strip_leading_slash() {
        let client = GraphWorkbookClient::new(StaticToken, "/Documents/Reports/Sales.xlsx").unwrap();

        assert_eq!(
            client.worksheets_url(),
            "https://graph.microsoft.com/v1.0/me/drive/root:/Documents/Reports/Sales.xlsx:/workbook/worksheets"
        );
        assert_eq!(
            client.range_url("Sheet1", None),
            "https://graph.microsoft.com/v1.0/me/drive/root:/Documents/Reports/Sales.xlsx:/workbook/worksheets/Sheet1/usedRange"
        );
    }

    #[test]
    fn test_range_url_with_address() {
        let client = GraphWorkbookClient::with_base_url(StaticToken, "/Orders.xlsx", "http://localhost:8080/").unwrap();
        let range = RangeRequest {
            start_row: 2,
            end_row: 1001,
        };

        assert_eq!(
            client.range_url("{00000000-0001}", Some(&range)),
            "http://localhost:8080/me/drive/root:/Orders.xlsx:/workbook/worksheets/{00000000-0001}/range(address='A2:Z1001')"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error": {"code": "itemNotFound", "message": "The resource could not be found."}}"#;
        assert_eq!(error_message(body), "The resource could not be found.");
        assert_eq!(error_message("<html>bad gateway</html>"), "Unknown error");
        assert_eq!(error_message(r#"{"error": {}}"#), "Unknown error");
    }

    #[test]
    fn test_listing_keeps_only_visible_sheets() {
        let body = r#"{
            "value": [
                {"id": "1", "name": "Orders", "position": 0, "visibility": "Visible"},
                {"id": "2", "name": "Lookup", "position": 1, "visibility": "Hidden"},
                {"id": "3", "name": "Internal", "position": 2, "visibility": "VeryHidden"},
                {"id": "4", "name": "Customers", "position": 3, "visibility": "Visible"},
                {"name": "No id", "visibility": "Visible"}
            ]
        }"#;
        let listing: ApiWorksheetList = serde_json::from_str(body).unwrap();
        let sheets = visible_worksheets(listing);

        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Orders", "Customers"]);
    }

    #[tokio::test]
    async fn test_used_range_is_parsed() {
        let base = respond_once(
            "200 OK",
            r#"{"address": "Sheet1!A1:B2", "rowCount": 2, "columnCount": 2, "values": [["Name", "Created Date"], ["Bob", 45000]]}"#,
        )
        .await;
        let client = GraphWorkbookClient::with_base_url(StaticToken, "/Orders.xlsx", &base).unwrap();

        let data = client.get_range("Sheet1", None).await.unwrap();
        assert_eq!(data.row_count, 2);
        assert_eq!(data.column_count, 2);
        assert_eq!(data.values[1][1], serde_json::json!(45000));
    }

    #[tokio::test]
    async fn test_not_found_range_is_empty_worksheet() {
        let base = respond_once(
            "404 Not Found",
            r#"{"error": {"code": "ItemNotFound", "message": "not found"}}"#,
        )
        .await;
        let client = GraphWorkbookClient::with_base_url(StaticToken, "/Orders.xlsx", &base).unwrap();

        let range = RangeRequest {
            start_row: 2,
            end_row: 10,
        };
        let data = client.get_range("Sheet1", Some(&range)).await.unwrap();
        assert_eq!(data, RangeData::empty());
    }

    #[tokio::test]
    async fn test_range_server_error_is_transport_error() {
        let base = respond_once(
            "503 Service Unavailable",
            r#"{"error": {"code": "serviceNotAvailable", "message": "Try again later"}}"#,
        )
        .await;
        let client = GraphWorkbookClient::with_base_url(StaticToken, "/Orders.xlsx", &base).unwrap();

        match client.get_range("Sheet1", None).await {
            Err(WorkbookError::Transport(message)) => assert_eq!(message, "Try again later"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_listing_failure_is_configuration_error() {
        let base = respond_once(
            "403 Forbidden",
            r#"{"error": {"code": "accessDenied", "message": "Access denied"}}"#,
        )
        .await;
        let client = GraphWorkbookClient::with_base_url(StaticToken, "/Orders.xlsx", &base).unwrap();

        match client.list_worksheets().await {
            Err(WorkbookError::Configuration { message, internal }) => {
                assert!(message.contains("/Orders.xlsx"));
                assert!(message.contains("check the path and permissions"));
                assert_eq!(internal, "Failed to get worksheets: Access denied");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_listing_over_http_keeps_visible_sheets() {
        let base = respond_once(
            "200 OK",
            r#"{"value": [{"id": "1", "name": "Orders", "visibility": "Visible"}, {"id": "2", "name": "Old", "visibility": "Hidden"}]}"#,
        )
        .await;
        let client = GraphWorkbookClient::with_base_url(StaticToken, "/Orders.xlsx", &base).unwrap();

        let sheets = client.list_worksheets().await.unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "Orders");
    }
}
