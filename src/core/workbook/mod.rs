pub mod workbook_api;
pub mod workbook_models;

#[cfg(test)]
pub mod mock_workbook;

pub use workbook_api::{WorkbookApi, WorkbookError};
pub use workbook_models::{
    plan_batches, BatchPlan, RangeData, RangeRequest, Visibility, WorksheetDescriptor,
};
