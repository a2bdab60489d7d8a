// JSON-lines protocol messages written to stdout.
//
// One message per line, tagged by `type`:
//   {"type":"CONNECTION_STATUS","connectionStatus":{"status":"SUCCEEDED"}}
//   {"type":"CATALOG","catalog":{"streams":[...]}}
//   {"type":"RECORD","record":{"stream":"Sheet1","data":{...},"emitted_at":...}}
//   {"type":"LOG","log":{"level":"ERROR","message":"..."}}
//   {"type":"TRACE","trace":{"type":"ERROR","error":{...}}}

use std::io::Write;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::core::extraction::Record;
use crate::core::source::{ConnectionStatus, RecordSink, StreamDescriptor};
use crate::core::workbook::WorkbookError;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    ConnectionStatus {
        #[serde(rename = "connectionStatus")]
        connection_status: ConnectionStatusMessage,
    },
    Catalog {
        catalog: CatalogMessage,
    },
    Record {
        record: RecordMessage,
    },
    Log {
        log: LogMessage,
    },
    Trace {
        trace: TraceMessage,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatusMessage {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogMessage {
    pub streams: Vec<CatalogStream>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogStream {
    pub name: String,
    pub json_schema: Value,
    pub supported_sync_modes: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordMessage {
    pub stream: String,
    pub data: Record,
    pub emitted_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogMessage {
    pub level: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceMessage {
    #[serde(rename = "type")]
    pub trace_type: &'static str,
    pub emitted_at: i64,
    pub error: TraceError,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceError {
    pub message: String,
    pub internal_message: String,
    pub failure_type: &'static str,
}

impl Message {
    pub fn connection_status(status: &ConnectionStatus) -> Self {
        Message::ConnectionStatus {
            connection_status: ConnectionStatusMessage {
                status: if status.connected { "SUCCEEDED" } else { "FAILED" },
                message: status.reason.clone(),
            },
        }
    }

    pub fn catalog(streams: Vec<StreamDescriptor>) -> Self {
        Message::Catalog {
            catalog: CatalogMessage {
                streams: streams
                    .into_iter()
                    .map(|s| CatalogStream {
                        name: s.name,
                        json_schema: s.json_schema,
                        supported_sync_modes: vec!["full_refresh"],
                    })
                    .collect(),
            },
        }
    }

    pub fn record(stream: &str, data: Record) -> Self {
        Message::Record {
            record: RecordMessage {
                stream: stream.to_string(),
                data,
                emitted_at: Utc::now().timestamp_millis(),
            },
        }
    }

    pub fn log(level: &'static str, message: impl Into<String>) -> Self {
        Message::Log {
            log: LogMessage {
                level,
                message: message.into(),
            },
        }
    }

    pub fn config_error(message: impl Into<String>, internal_message: impl Into<String>) -> Self {
        Message::Trace {
            trace: TraceMessage {
                trace_type: "ERROR",
                emitted_at: Utc::now().timestamp_millis(),
                error: TraceError {
                    message: message.into(),
                    internal_message: internal_message.into(),
                    failure_type: "config_error",
                },
            },
        }
    }
}

/// Writes protocol messages, one JSON document per line.
pub struct MessageWriter<W: Write> {
    out: W,
}

impl<W: Write> MessageWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write(&mut self, message: &Message) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for MessageWriter<W> {
    fn emit_record(&mut self, stream: &str, record: Record) -> std::io::Result<()> {
        self.write(&Message::record(stream, record))
    }

    fn stream_aborted(&mut self, stream: &str, error: &WorkbookError) -> std::io::Result<()> {
        self.write(&Message::log(
            "ERROR",
            format!("Stream '{}' ended early: {}", stream, error),
        ))
    }
}
