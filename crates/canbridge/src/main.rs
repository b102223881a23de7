//! canbridge - CAN bus ingestion into ClickHouse
//!
//! # Usage
//!
//! ```bash
//! # Run the pipeline (default)
//! canbridge
//! canbridge --config configs/config.toml
//!
//! # Classify an identifier and decode a payload
//! canbridge decode --id 0x181 --data 0102a0ff --fields "speed:uint16:0:2,temp:int8:2:1"
//!
//! # Print the table definitions
//! canbridge schema
//! ```

mod cmd;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// canbridge - CAN bus ingestion into ClickHouse
#[derive(Parser, Debug)]
#[command(name = "canbridge")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the ingestion pipeline
    Serve,

    /// Classify a CAN identifier and decode a payload
    Decode(cmd::decode::DecodeArgs),

    /// Print the ClickHouse table definitions
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // No subcommand = run the pipeline
        None | Some(Command::Serve) => {
            let config = cmd::serve::load_config(cli.config.as_deref())?;
            logging::init(&config.log, cli.log_level.as_deref())?;
            cmd::serve::run(config).await
        }
        // Decode and schema only write to stdout
        Some(Command::Decode(args)) => cmd::decode::run(args),
        Some(Command::Schema) => cmd::schema::run(cli.config.as_deref()),
    }
}
