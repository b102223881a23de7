//! Schema command - print the ClickHouse table definitions
//!
//! Table names come from the config file when one is given.

use std::path::Path;

use anyhow::Result;
use canbridge_sinks::clickhouse::{frames_table_sql, stats_table_sql};

use super::serve::load_config;

/// Run the schema command
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    println!("{}", render(&config.clickhouse.frames_table, &config.clickhouse.stats_table));
    Ok(())
}

fn render(frames_table: &str, stats_table: &str) -> String {
    format!(
        "{};\n\n{};",
        frames_table_sql(frames_table),
        stats_table_sql(stats_table)
    )
}
