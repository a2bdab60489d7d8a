pub mod worksheet_stream;

pub use worksheet_stream::{Record, WorksheetStream};
