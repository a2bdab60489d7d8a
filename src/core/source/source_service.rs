// Source-level operations: connection check, stream discovery and full reads.
//
// Discovery failures are fatal for the run, and so is a sink that can no
// longer take output. Failures while reading a worksheet only end that
// worksheet's stream and are reported back so the caller can record them.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::config::SourceConfig;
use crate::core::extraction::{Record, WorksheetStream};
use crate::core::workbook::{WorkbookApi, WorkbookError};

const NO_VISIBLE_WORKSHEETS: &str = "No visible worksheets found in the workbook";

#[derive(Debug, Error)]
pub enum SourceError {
    /// Discovery failed. Always a configuration problem from the user's side.
    #[error("{message}")]
    Discovery { message: String, internal: String },
    /// The sink rejected output, e.g. a closed stdout pipe.
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl SourceError {
    /// Upstream diagnostic text to show next to the message.
    pub fn internal_message(&self) -> String {
        match self {
            SourceError::Discovery { internal, .. } => internal.clone(),
            SourceError::Output(e) => e.to_string(),
        }
    }
}

/// Outcome of a connection check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub reason: Option<String>,
}

/// A discovered stream and its schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamDescriptor {
    pub name: String,
    pub json_schema: Value,
}

/// What happened while reading one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamReport {
    pub stream: String,
    pub records: u64,
    pub error: Option<String>,
}

/// Receives the output of a read. An error from the sink stops the read.
pub trait RecordSink {
    fn emit_record(&mut self, stream: &str, record: Record) -> std::io::Result<()>;

    /// Called once per stream that ended early. Defaults to doing nothing.
    fn stream_aborted(&mut self, _stream: &str, _error: &WorkbookError) -> std::io::Result<()> {
        Ok(())
    }
}

pub struct SourceService<A: WorkbookApi> {
    api: Arc<A>,
    config: Arc<SourceConfig>,
}

impl<A: WorkbookApi> SourceService<A> {
    pub fn new(api: A, config: SourceConfig) -> Self {
        Self {
            api: Arc::new(api),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Probes the workbook. Connected only when the listing succeeds and has
    /// at least one visible worksheet; errors never escape.
    pub async fn check_connection(&self) -> ConnectionStatus {
        match self.api.list_worksheets().await {
            Ok(worksheets) if worksheets.is_empty() => ConnectionStatus {
                connected: false,
                reason: Some(NO_VISIBLE_WORKSHEETS.to_string()),
            },
            Ok(_) => ConnectionStatus {
                connected: true,
                reason: None,
            },
            Err(e) => {
                tracing::debug!("Connection probe failed: {}", e);
                ConnectionStatus {
                    connected: false,
                    reason: Some(format!("Failed to connect: {}", e)),
                }
            }
        }
    }

    /// One stream per visible worksheet, in workbook order.
    pub async fn streams(&self) -> Result<Vec<WorksheetStream<A>>, SourceError> {
        let worksheets = self
            .api
            .list_worksheets()
            .await
            .map_err(|e| SourceError::Discovery {
                message: format!("Failed to discover streams: {}", e),
                internal: internal_detail(&e),
            })?;

        if worksheets.is_empty() {
            return Err(SourceError::Discovery {
                message: NO_VISIBLE_WORKSHEETS.to_string(),
                internal: "The workbook appears to have no visible worksheets".to_string(),
            });
        }

        Ok(worksheets
            .into_iter()
            .map(|worksheet| {
                WorksheetStream::new(Arc::clone(&self.api), worksheet, Arc::clone(&self.config))
            })
            .collect())
    }

    /// Discovers every stream together with its schema.
    pub async fn discover(&self) -> Result<Vec<StreamDescriptor>, SourceError> {
        let mut descriptors = Vec::new();
        for mut stream in self.streams().await? {
            let json_schema = stream.json_schema().await.clone();
            descriptors.push(StreamDescriptor {
                name: stream.name().to_string(),
                json_schema,
            });
        }

        tracing::info!("Discovered {} stream(s)", descriptors.len());
        Ok(descriptors)
    }

    /// Reads every stream in full, one worksheet after another.
    ///
    /// Discovery and sink errors fail the read. A worksheet that fails mid-way
    /// is reported in its `StreamReport` and the next worksheet is read.
    pub async fn read(&self, sink: &mut dyn RecordSink) -> Result<Vec<StreamReport>, SourceError> {
        let mut reports = Vec::new();

        for stream in self.streams().await? {
            let mut reader = stream.read_records();
            let mut records = 0u64;

            while let Some(record) = reader.next_record().await {
                sink.emit_record(stream.name(), record)?;
                records += 1;
            }

            let error = match reader.error() {
                Some(e) => {
                    sink.stream_aborted(stream.name(), e)?;
                    Some(e.to_string())
                }
                None => None,
            };

            tracing::info!(stream = stream.name(), records, "Finished reading stream");
            reports.push(StreamReport {
                stream: stream.name().to_string(),
                records,
                error,
            });
        }

        Ok(reports)
    }
}

fn internal_detail(error: &WorkbookError) -> String {
    match error {
        WorkbookError::Configuration { internal, .. } => internal.clone(),
        other => other.to_string(),
    }
}
