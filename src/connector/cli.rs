use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "excel-sheets-source", version, about = "Extracts worksheets from an Excel workbook in OneDrive")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Checks that the workbook is reachable and has a visible worksheet.
    Check(ConfigArgs),
    /// Lists one stream per visible worksheet with its JSON schema.
    Discover(ConfigArgs),
    /// Emits every row of every visible worksheet as a record.
    Read(ConfigArgs),
}

impl Command {
    pub fn config_args(&self) -> &ConfigArgs {
        match self {
            Command::Check(args) | Command::Discover(args) | Command::Read(args) => args,
        }
    }
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Path to the JSON configuration file.
    #[arg(long, env = "EXCEL_SHEETS_CONFIG")]
    pub config: PathBuf,
}
