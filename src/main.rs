// This is the entry point of the Excel worksheet source connector.
//
// **Architecture Overview:**
// - `core/` = Extraction logic (knows nothing about HTTP or the CLI)
// - `infra/` = Implementations of core traits (Microsoft identity, Graph API)
// - `connector/` = Command line adapter (commands, protocol messages)
//
// This file's job is to:
// 1. Set up logging
// 2. Parse the command line and load configuration
// 3. Initialize services (dependency injection)
// 4. Run the requested command

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "connector/connector_layer.rs"]
mod connector;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::connector::cli::{Cli, Command};
use crate::connector::commands;
use crate::connector::messages::MessageWriter;
use crate::core::config::SourceConfig;
use crate::core::source::SourceService;
use crate::infra::auth::MicrosoftTokenProvider;
use crate::infra::graph::GraphWorkbookClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the protocol messages
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut out = MessageWriter::new(std::io::stdout().lock());

    let config_path = &cli.command.config_args().config;
    let config = match SourceConfig::from_file(config_path).await {
        Ok(config) => config,
        Err(e) if matches!(cli.command, Command::Check(_)) => {
            tracing::error!("Failed to load configuration from {}: {}", config_path.display(), e);
            return commands::check_invalid_config(&e, &mut out);
        }
        Err(e) => return Err(e.into()),
    };

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let tokens = MicrosoftTokenProvider::new(config.credentials.clone())?;
    let client = GraphWorkbookClient::new(tokens, &config.workbook_path)?;
    let service = SourceService::new(client, config);

    tracing::info!(
        workbook = %service.config().workbook_path,
        "Running {:?}",
        cli.command
    );

    match cli.command {
        Command::Check(_) => commands::check(&service, &mut out).await,
        Command::Discover(_) => commands::discover(&service, &mut out).await,
        Command::Read(_) => commands::read(&service, &mut out).await,
    }
}
