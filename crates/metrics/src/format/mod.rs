//! Metrics output formatters
//!
//! Formats collected metrics for human-readable or JSON output.

mod human;
mod json;

pub use human::HumanFormatter;
pub use json::JsonFormatter;

use crate::{CollectedMetrics, MetricsRates};

/// Trait for metrics formatters
pub trait MetricsFormatter: Send + Sync {
    /// Format one periodic report
    fn format_report(&self, metrics: &CollectedMetrics, rates: Option<&MetricsRates>) -> String;
}

/// Format count with K/M suffix for readability
pub fn format_count(count: u64) -> String {
    const K: u64 = 1000;
    const M: u64 = 1_000_000;

    if count >= M {
        format!("{:.1}M", count as f64 / M as f64)
    } else if count >= K {
        format!("{:.1}K", count as f64 / K as f64)
    } else {
        count.to_string()
    }
}

/// Format rate per second with K/M suffix
pub fn format_rate(rate: f64) -> String {
    const K: f64 = 1000.0;
    const M: f64 = 1_000_000.0;

    if rate >= M {
        format!("{:.1}M/s", rate / M)
    } else if rate >= K {
        format!("{:.1}K/s", rate / K)
    } else {
        format!("{:.0}/s", rate)
    }
}
