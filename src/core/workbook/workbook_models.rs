use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Visibility of a worksheet tab as reported by the workbook API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Visible,
    Hidden,
    VeryHidden,
    #[serde(other)]
    Unknown,
}

/// One worksheet of the workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksheetDescriptor {
    pub id: String,
    pub name: String,
    pub visibility: Visibility,
}

impl WorksheetDescriptor {
    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }
}

/// A rectangular block of cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeData {
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
    #[serde(default)]
    pub row_count: u64,
    #[serde(default)]
    pub column_count: u64,
}

impl RangeData {
    /// What the API means by a 404 on a range: the worksheet has no cells.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Rightmost column named in range requests. The API clips to the real data.
pub const RANGE_LAST_COLUMN: &str = "Z";

/// Inclusive, 1-based window of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRequest {
    pub start_row: u64,
    pub end_row: u64,
}

impl RangeRequest {
    /// A1 address covering the window, e.g. `A2:Z1001`.
    pub fn address(&self) -> String {
        format!(
            "A{}:{}{}",
            self.start_row, RANGE_LAST_COLUMN, self.end_row
        )
    }
}

/// Plans the row windows that cover `first_row..=total_rows`, `batch_size` rows at a time.
pub fn plan_batches(first_row: u64, total_rows: u64, batch_size: u64) -> BatchPlan {
    BatchPlan {
        next_row: first_row,
        total_rows,
        batch_size: batch_size.max(1),
    }
}

/// Iterator over consecutive, non-overlapping row windows.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    next_row: u64,
    total_rows: u64,
    batch_size: u64,
}

impl Iterator for BatchPlan {
    type Item = RangeRequest;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row > self.total_rows {
            return None;
        }

        let start_row = self.next_row;
        let end_row = start_row
            .saturating_add(self.batch_size - 1)
            .min(self.total_rows);
        self.next_row = end_row + 1;

        Some(RangeRequest { start_row, end_row })
    }
}
