//! CLI interface and argument parsing

pub mod commands;

use clap::{Parser, Subcommand};

/// Formex - export form submissions to CSV
#[derive(Parser, Debug)]
#[command(name = "formex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "formex.toml", env = "FORMEX_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FORMEX_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a form's submissions to CSV tables
    Export(commands::export::ExportArgs),

    /// Validate configuration file, form definition and key
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
