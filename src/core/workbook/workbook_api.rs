use async_trait::async_trait;
use thiserror::Error;

use super::workbook_models::{RangeData, RangeRequest, WorksheetDescriptor};
use crate::core::auth::AuthError;

/// Errors raised by the workbook API.
#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error(transparent)]
    Authentication(#[from] AuthError),
    /// The workbook could not be reached, usually a wrong path or missing permission.
    #[error("{message} ({internal})")]
    Configuration { message: String, internal: String },
    #[error("Failed to get worksheet data: {0}")]
    Transport(String),
}

/// The two workbook operations the extraction pipeline needs.
#[async_trait]
pub trait WorkbookApi: Send + Sync {
    /// Visible worksheets, in workbook order.
    async fn list_worksheets(&self) -> Result<Vec<WorksheetDescriptor>, WorkbookError>;

    /// Cells of a worksheet. Without `range` the used range is returned.
    async fn get_range(
        &self,
        worksheet_id: &str,
        range: Option<&RangeRequest>,
    ) -> Result<RangeData, WorkbookError>;
}
