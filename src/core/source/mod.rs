pub mod source_service;

pub use source_service::{
    ConnectionStatus, RecordSink, SourceError, SourceService, StreamDescriptor,
};
