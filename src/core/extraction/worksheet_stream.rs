// Worksheet extraction.
//
// A `WorksheetStream` is one output stream per visible worksheet. Reading it
// produces a `RecordReader`, a pull-based state machine:
//
//   Start -> Paginating -> Done
//                 \-----> Aborted
//
// * Start: fetch the used range once, resolve headers from row 1 and read the
//   total row count. Fewer than two rows means there is nothing to emit.
// * Paginating: fetch `A<start>:Z<end>` windows of `batch_size` rows from
//   row 2 up to the total, turning each row into a record.
// * Aborted: a fetch failed. Records already handed out stand, the failed
//   window is not retried and the error is kept for the caller.
//
// Nothing is fetched until the caller asks for the next record.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::core::config::SourceConfig;
use crate::core::headers::{process_headers, ColumnMapping};
use crate::core::values::{is_blank_cell, parse_excel_value};
use crate::core::workbook::{plan_batches, BatchPlan, WorkbookApi, WorkbookError, WorksheetDescriptor};

/// Column name -> emitted value.
pub type Record = Map<String, Value>;

const JSON_SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema#";

/// First data row (1-based). Row 1 holds the headers.
const FIRST_DATA_ROW: u64 = 2;

/// Builds a record from one data row. `None` when the row has nothing to emit.
pub fn build_record(row: &[Value], mapping: &ColumnMapping, parse_dates: bool) -> Option<Record> {
    if row.iter().all(is_blank_cell) {
        return None;
    }

    let mut record = Record::new();
    for (&idx, column) in mapping {
        let Some(cell) = row.get(idx) else {
            continue;
        };
        if let Some(value) = parse_excel_value(cell, column, parse_dates) {
            record.insert(column.clone(), Value::String(value));
        }
    }

    if record.is_empty() {
        None
    } else {
        Some(record)
    }
}

/// Schema declaring every column as a nullable string.
pub fn schema_for_columns<'a>(columns: impl IntoIterator<Item = &'a str>) -> Value {
    let properties: Map<String, Value> = columns
        .into_iter()
        .map(|c| (c.to_string(), json!({ "type": ["null", "string"] })))
        .collect();

    json!({
        "$schema": JSON_SCHEMA_DRAFT,
        "type": "object",
        "properties": properties,
        "additionalProperties": true,
    })
}

/// Schema used when the worksheet metadata cannot be read.
pub fn fallback_schema() -> Value {
    json!({
        "$schema": JSON_SCHEMA_DRAFT,
        "type": "object",
        "additionalProperties": true,
    })
}

/// One worksheet exposed as a stream of records.
pub struct WorksheetStream<A: WorkbookApi> {
    api: Arc<A>,
    worksheet: WorksheetDescriptor,
    config: Arc<SourceConfig>,
    name: String,
    schema: Option<Value>,
}

impl<A: WorkbookApi> WorksheetStream<A> {
    pub fn new(api: Arc<A>, worksheet: WorksheetDescriptor, config: Arc<SourceConfig>) -> Self {
        let name = config.stream_name_for(&worksheet.name);
        Self {
            api,
            worksheet,
            config,
            name,
            schema: None,
        }
    }

    /// Stream name, after applying any configured override.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// JSON schema for the stream, computed from the header row on first use.
    pub async fn json_schema(&mut self) -> &Value {
        if self.schema.is_none() {
            let schema = self.load_schema().await;
            self.schema = Some(schema);
        }
        self.schema.get_or_insert_with(fallback_schema)
    }

    async fn load_schema(&self) -> Value {
        match self.api.get_range(&self.worksheet.id, None).await {
            Ok(data) => match data.values.first() {
                Some(header_row) => {
                    let processed = process_headers(header_row, self.config.names_conversion);
                    schema_for_columns(processed.column_names())
                }
                None => schema_for_columns(std::iter::empty()),
            },
            Err(e) => {
                tracing::warn!(
                    worksheet = %self.worksheet.name,
                    "Falling back to an open schema: {}",
                    e
                );
                fallback_schema()
            }
        }
    }

    /// Starts a fresh, full read of the worksheet.
    pub fn read_records(&self) -> RecordReader<A> {
        RecordReader {
            api: Arc::clone(&self.api),
            worksheet: self.worksheet.clone(),
            batch_size: self.config.batch_size,
            names_conversion: self.config.names_conversion,
            parse_dates: self.config.parse_dates,
            state: ReaderState::Start,
            pending: VecDeque::new(),
        }
    }
}

enum ReaderState {
    Start,
    Paginating {
        mapping: ColumnMapping,
        batches: BatchPlan,
    },
    Done,
    Aborted(WorkbookError),
}

/// Lazily reads the records of one worksheet, one batch at a time.
pub struct RecordReader<A: WorkbookApi> {
    api: Arc<A>,
    worksheet: WorksheetDescriptor,
    batch_size: u64,
    names_conversion: bool,
    parse_dates: bool,
    state: ReaderState,
    pending: VecDeque<Record>,
}

impl<A: WorkbookApi> RecordReader<A> {
    /// Next record, or `None` once the worksheet is exhausted or reading aborted.
    pub async fn next_record(&mut self) -> Option<Record> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(record);
            }

            match std::mem::replace(&mut self.state, ReaderState::Done) {
                ReaderState::Start => self.state = self.resolve_headers().await,
                ReaderState::Paginating { mapping, batches } => {
                    self.state = self.fetch_batch(mapping, batches).await;
                }
                finished @ (ReaderState::Done | ReaderState::Aborted(_)) => {
                    self.state = finished;
                    return None;
                }
            }
        }
    }

    /// The error that ended the read early, if any.
    pub fn error(&self) -> Option<&WorkbookError> {
        match &self.state {
            ReaderState::Aborted(e) => Some(e),
            _ => None,
        }
    }

    async fn resolve_headers(&self) -> ReaderState {
        let initial = match self.api.get_range(&self.worksheet.id, None).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(
                    worksheet = %self.worksheet.name,
                    "Error reading worksheet used range: {}",
                    e
                );
                return ReaderState::Aborted(e);
            }
        };

        if initial.values.len() < 2 {
            tracing::debug!(worksheet = %self.worksheet.name, "Worksheet has no data rows");
            return ReaderState::Done;
        }

        let processed = process_headers(&initial.values[0], self.names_conversion);
        let total_rows = initial.row_count;

        tracing::info!(
            worksheet = %self.worksheet.name,
            total_rows,
            columns = processed.mapping.len(),
            "Reading worksheet"
        );

        ReaderState::Paginating {
            mapping: processed.mapping,
            batches: plan_batches(FIRST_DATA_ROW, total_rows, self.batch_size),
        }
    }

    async fn fetch_batch(&mut self, mapping: ColumnMapping, mut batches: BatchPlan) -> ReaderState {
        let Some(range) = batches.next() else {
            return ReaderState::Done;
        };

        match self.api.get_range(&self.worksheet.id, Some(&range)).await {
            Ok(data) => {
                tracing::debug!(
                    worksheet = %self.worksheet.name,
                    start_row = range.start_row,
                    end_row = range.end_row,
                    rows = data.values.len(),
                    "Fetched batch"
                );
                let parse_dates = self.parse_dates;
                self.pending.extend(
                    data.values
                        .iter()
                        .filter_map(|row| build_record(row, &mapping, parse_dates)),
                );
                ReaderState::Paginating { mapping, batches }
            }
            Err(e) => {
                tracing::error!(
                    worksheet = %self.worksheet.name,
                    "Error reading batch {}-{}: {}",
                    range.start_row,
                    range.end_row,
                    e
                );
                ReaderState::Aborted(e)
            }
        }
    }
}
