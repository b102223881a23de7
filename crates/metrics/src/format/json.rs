//! JSON metrics formatter
//!
//! One compact JSON object per report, suitable for log shipping.

use super::MetricsFormatter;
use crate::{CollectedMetrics, MetricsRates};
use serde::Serialize;

/// JSON metrics formatter
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    #[serde(rename = "type")]
    report_type: &'static str,
    period_secs: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sources: Vec<SourceJson<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkJson<'a>>,
}

#[derive(Serialize)]
struct SourceJson<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    source_type: &'a str,
    records_per_sec: u64,
    dropped: u64,
    errors: u64,
}

#[derive(Serialize)]
struct SinkJson<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    sink_type: &'a str,
    records_per_sec: u64,
    records_written: u64,
    dropped: u64,
    errors: u64,
}

impl MetricsFormatter for JsonFormatter {
    fn format_report(&self, metrics: &CollectedMetrics, rates: Option<&MetricsRates>) -> String {
        let Some(rates) = rates else {
            return r#"{"type":"report","status":"collecting_baseline"}"#.to_string();
        };

        let json = ReportJson {
            report_type: "report",
            period_secs: rates.elapsed.as_secs(),
            sources: rates
                .sources
                .iter()
                .map(|s| SourceJson {
                    id: &s.id,
                    source_type: &s.source_type,
                    records_per_sec: s.records_per_sec as u64,
                    dropped: s.dropped,
                    errors: s.errors,
                })
                .collect(),
            sinks: rates
                .sinks
                .iter()
                .map(|s| SinkJson {
                    id: &s.id,
                    sink_type: &s.sink_type,
                    records_per_sec: s.records_per_sec as u64,
                    records_written: metrics
                        .sinks
                        .iter()
                        .find(|c| c.id == s.id)
                        .map(|c| c.snapshot.records_written)
                        .unwrap_or(0),
                    dropped: s.dropped,
                    errors: s.errors,
                })
                .collect(),
        };

        serde_json::to_string(&json).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SinkRates, SourceRates};
    use std::time::Duration;

    #[test]
    fn test_format_report_with_rates() {
        let rates = MetricsRates {
            elapsed: Duration::from_secs(10),
            sources: vec![SourceRates {
                id: "can0".into(),
                source_type: "can_reader".into(),
                records_per_sec: 512.7,
                dropped: 0,
                errors: 2,
            }],
            sinks: vec![SinkRates {
                id: "frames".into(),
                sink_type: "null".into(),
                records_per_sec: 500.0,
                dropped: 1,
                errors: 0,
            }],
        };

        let output = JsonFormatter::new().format_report(&CollectedMetrics::default(), Some(&rates));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["type"], "report");
        assert_eq!(parsed["period_secs"], 10);
        assert_eq!(parsed["sources"][0]["id"], "can0");
        assert_eq!(parsed["sources"][0]["records_per_sec"], 512);
        assert_eq!(parsed["sources"][0]["errors"], 2);
        assert_eq!(parsed["sinks"][0]["type"], "null");
        assert_eq!(parsed["sinks"][0]["dropped"], 1);
    }

    #[test]
    fn test_format_report_no_rates() {
        let output = JsonFormatter::new().format_report(&CollectedMetrics::default(), None);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["status"], "collecting_baseline");
    }

    #[test]
    fn test_empty_collections_omitted() {
        let rates = MetricsRates {
            elapsed: Duration::from_secs(5),
            sources: vec![],
            sinks: vec![],
        };
        let output = JsonFormatter::new().format_report(&CollectedMetrics::default(), Some(&rates));
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert!(parsed.get("sources").is_none());
        assert!(parsed.get("sinks").is_none());
    }
}
