//! Human-readable metrics formatter
//!
//! ```text
//! [metrics] sources: can0 (2.1K/s) | can0_stats (0/s)
//! [metrics] sinks: frames (2.1K/s, total 1.3M, ok) | stats (0/s, total 42, 1 err)
//! ```

use super::{MetricsFormatter, format_count, format_rate};
use crate::{CollectedMetrics, MetricsRates};
use std::fmt::Write;

/// Human-readable metrics formatter
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter;

impl HumanFormatter {
    pub fn new() -> Self {
        Self
    }

    fn format_sources(&self, rates: &MetricsRates) -> Option<String> {
        if rates.sources.is_empty() {
            return None;
        }

        let mut output = String::from("[metrics] sources:");
        for (i, source) in rates.sources.iter().enumerate() {
            if i > 0 {
                output.push_str(" |");
            }
            let _ = write!(output, " {} ({}", source.id, format_rate(source.records_per_sec));
            if source.dropped > 0 {
                let _ = write!(output, ", {} dropped", source.dropped);
            }
            if source.errors > 0 {
                let _ = write!(output, ", {} err", source.errors);
            }
            output.push(')');
        }
        Some(output)
    }

    fn format_sinks(&self, metrics: &CollectedMetrics, rates: &MetricsRates) -> Option<String> {
        if rates.sinks.is_empty() {
            return None;
        }

        let mut output = String::from("[metrics] sinks:");
        for (i, sink) in rates.sinks.iter().enumerate() {
            if i > 0 {
                output.push_str(" |");
            }
            let total = metrics
                .sinks
                .iter()
                .find(|s| s.id == sink.id)
                .map(|s| s.snapshot.records_written)
                .unwrap_or(0);
            let _ = write!(
                output,
                " {} ({}, total {}",
                sink.id,
                format_rate(sink.records_per_sec),
                format_count(total)
            );
            if sink.dropped > 0 {
                let _ = write!(output, ", {} dropped", sink.dropped);
            }
            if sink.errors > 0 {
                let _ = write!(output, ", {} err", sink.errors);
            } else {
                output.push_str(", ok");
            }
            output.push(')');
        }
        Some(output)
    }
}

impl MetricsFormatter for HumanFormatter {
    fn format_report(&self, metrics: &CollectedMetrics, rates: Option<&MetricsRates>) -> String {
        let Some(rates) = rates else {
            return "[metrics] collecting baseline...".to_string();
        };

        let lines: Vec<String> = [self.format_sources(rates), self.format_sinks(metrics, rates)]
            .into_iter()
            .flatten()
            .collect();

        if lines.is_empty() {
            "[metrics] no activity".to_string()
        } else {
            lines.join("\n")
        }
    }
}
