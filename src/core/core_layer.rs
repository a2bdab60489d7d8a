// The core module contains all extraction logic.
// Nothing in here knows about HTTP, Microsoft Graph or the command line;
// the outside world is reached through the `WorkbookApi` and `TokenProvider` traits.

#[path = "config/mod.rs"]
pub mod config;

#[path = "headers/mod.rs"]
pub mod headers;

#[path = "values/mod.rs"]
pub mod values;

#[path = "auth/mod.rs"]
pub mod auth;

#[path = "workbook/mod.rs"]
pub mod workbook;

#[path = "extraction/mod.rs"]
pub mod extraction;

#[path = "source/mod.rs"]
pub mod source;
