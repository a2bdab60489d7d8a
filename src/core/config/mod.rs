pub mod source_config;

pub use source_config::{ConfigError, Credentials, SourceConfig};
