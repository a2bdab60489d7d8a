// In-memory workbook used by the core tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{RangeData, RangeRequest, Visibility, WorkbookApi, WorkbookError, WorksheetDescriptor};

pub struct MockWorkbook {
    pub worksheets: Vec<WorksheetDescriptor>,
    pub cells: HashMap<String, Vec<Vec<Value>>>,
    /// Worksheet id and start row of a batch request that should fail.
    pub fail_batch: Option<(String, u64)>,
    pub fail_listing: bool,
    pub fail_used_range: bool,
    pub requests: Mutex<Vec<(String, Option<RangeRequest>)>>,
}

impl MockWorkbook {
    pub fn new() -> Self {
        Self {
            worksheets: Vec::new(),
            cells: HashMap::new(),
            fail_batch: None,
            fail_listing: false,
            fail_used_range: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_sheet(mut self, id: &str, name: &str, rows: Vec<Vec<Value>>) -> Self {
        self.worksheets.push(WorksheetDescriptor {
            id: id.to_string(),
            name: name.to_string(),
            visibility: Visibility::Visible,
        });
        self.cells.insert(id.to_string(), rows);
        self
    }

    pub fn with_hidden_sheet(mut self, id: &str, name: &str) -> Self {
        self.worksheets.push(WorksheetDescriptor {
            id: id.to_string(),
            name: name.to_string(),
            visibility: Visibility::Hidden,
        });
        self
    }

    /// Row windows requested through `get_range` with an address.
    pub fn batch_requests(&self, worksheet_id: &str) -> Vec<RangeRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == worksheet_id)
            .filter_map(|(_, range)| *range)
            .collect()
    }
}

fn block(rows: &[Vec<Value>]) -> RangeData {
    RangeData {
        values: rows.to_vec(),
        row_count: rows.len() as u64,
        column_count: rows.iter().map(Vec::len).max().unwrap_or(0) as u64,
    }
}

#[async_trait]
impl WorkbookApi for MockWorkbook {
    async fn list_worksheets(&self) -> Result<Vec<WorksheetDescriptor>, WorkbookError> {
        if self.fail_listing {
            return Err(WorkbookError::Configuration {
                message: "Failed to access workbook at /missing.xlsx. Please check the path and permissions.".to_string(),
                internal: "Failed to get worksheets: itemNotFound".to_string(),
            });
        }
        Ok(self
            .worksheets
            .iter()
            .filter(|w| w.is_visible())
            .cloned()
            .collect())
    }

    async fn get_range(
        &self,
        worksheet_id: &str,
        range: Option<&RangeRequest>,
    ) -> Result<RangeData, WorkbookError> {
        self.requests
            .lock()
            .unwrap()
            .push((worksheet_id.to_string(), range.copied()));

        let Some(rows) = self.cells.get(worksheet_id) else {
            return Ok(RangeData::empty());
        };

        match range {
            None => {
                if self.fail_used_range {
                    return Err(WorkbookError::Transport("usedRange unavailable".to_string()));
                }
                Ok(block(rows))
            }
            Some(range) => {
                if let Some((id, start)) = &self.fail_batch {
                    if id == worksheet_id && *start == range.start_row {
                        return Err(WorkbookError::Transport("server busy".to_string()));
                    }
                }
                let start = (range.start_row as usize).saturating_sub(1).min(rows.len());
                let end = (range.end_row as usize).min(rows.len());
                Ok(block(&rows[start..end]))
            }
        }
    }
}
