use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "ddsls-runner")]
#[command(about = "Instruments serverless services and templates for Datadog")]
pub struct Cli {
    /// Raise the log filter to debug unless RUST_LOG is set.
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Instrument(InstrumentCommand),
    RewriteDefinition(RewriteDefinitionCommand),
    Monitors(MonitorsCommand),
}

#[derive(Debug, Clone, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, clap::Args)]
pub struct InstrumentCommand {
    /// Service document (YAML or JSON).
    #[arg(long)]
    pub service: PathBuf,
    /// Compiled deployment template (JSON).
    #[arg(long)]
    pub template: Option<PathBuf>,
    /// Layer table mapping region and runtime to layer ARN.
    #[arg(long)]
    pub layers: Option<PathBuf>,
    #[arg(long)]
    pub region: Option<String>,
    #[arg(long)]
    pub account_id: Option<String>,
    /// Writes `service.json` and `template.json` here.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, clap::Args)]
pub struct RewriteDefinitionCommand {
    /// State machine definition (JSON text).
    #[arg(long)]
    pub definition: PathBuf,
    #[arg(long, default_value = "state-machine")]
    pub name: String,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, clap::Args)]
pub struct MonitorsCommand {
    #[arg(long)]
    pub service: PathBuf,
    #[arg(long)]
    pub stack_id: String,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
