use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pool-frontend",
    version,
    about = "HTTP API frontend for a cryptocurrency mining pool",
    long_about = "The network-facing HTTP API layer of a mining pool: chunk-encoded \
                 JSON-RPC-style operations over per-coin accounting, statistics and \
                 user management services."
)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log format (json, pretty, compact)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API frontend
    Start {
        /// Server bind address (overrides config file)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Validate configuration file
    Config {
        /// Configuration file to validate
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Show effective configuration
        #[arg(long)]
        show: bool,
    },

    /// Generate example configuration file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "pool-frontend.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

impl Args {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
