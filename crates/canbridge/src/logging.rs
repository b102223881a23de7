//! Tracing subscriber setup

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;

use anyhow::{Context, Result};
use canbridge_config::{LogConfig, LogFormat, LogOutput};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the global subscriber
///
/// Level: CLI flag > config file > "info".
pub fn init(config: &LogConfig, cli_level: Option<&str>) -> Result<()> {
    let level = cli_level.unwrap_or(config.level.as_str());
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let writer = make_writer(&config.output)?;
    let (console, json) = match config.format {
        LogFormat::Console => (
            Some(fmt::layer().with_target(true).with_writer(writer)),
            None,
        ),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(writer))),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(json)
        .with(filter)
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(())
}

fn make_writer(output: &LogOutput) -> Result<BoxMakeWriter> {
    Ok(match output {
        LogOutput::Stdout => BoxMakeWriter::new(io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(io::stderr),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    })
}
