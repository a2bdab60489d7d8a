// Connector layer - command line surface and protocol output.

#[path = "cli.rs"]
pub mod cli;

#[path = "commands.rs"]
pub mod commands;

#[path = "messages.rs"]
pub mod messages;
