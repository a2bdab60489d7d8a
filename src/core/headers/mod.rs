pub mod header_processor;

pub use header_processor::{process_headers, ColumnMapping};
