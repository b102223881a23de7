//! canbridge - Metrics
//!
//! Internal counters for the ingestion pipeline and their periodic report.
//!
//! # Overview
//!
//! - Atomic metric counters for sources (frame reader, stats sampler) and
//!   batching sinks
//! - Provider traits for components to expose metrics
//! - Reporter with configurable output formats (human, JSON)
//!
//! # Metrics Handle Pattern
//!
//! Components keep their counters in an `Arc` and hand out a lightweight
//! handle implementing the provider trait. The handle stays valid after the
//! component's task has consumed the component itself.
//!
//! ```text
//! Component (owns Arc<Metrics>)
//!     │
//!     ├──► metrics_handle() → Handle (clones Arc, implements Provider trait)
//!     │
//!     └──► run() [consumes self, Arc keeps metrics alive]
//! ```

mod collected;
pub mod format;
mod reporter;
mod traits;

pub use collected::{
    CollectedMetrics, CollectedSink, CollectedSource, MetricsRates, SinkRates, SourceRates,
};
pub use format::{HumanFormatter, JsonFormatter, MetricsFormatter};
pub use reporter::{MetricsReporter, MetricsReporterBuilder};
pub use traits::{
    SinkMetrics, SinkMetricsProvider, SinkMetricsSnapshot, SourceMetrics, SourceMetricsProvider,
    SourceMetricsSnapshot,
};
