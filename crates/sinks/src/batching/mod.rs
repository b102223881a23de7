//! Generic batching sink
//!
//! One implementation serves every record type: the frame sink and the
//! statistics sink are two instantiations with different writers and
//! triggers.

mod batch;
mod sink;

pub use batch::Batch;
pub use sink::{
    BatchWriter, BatchingSink, BatchingSinkConfig, BatchingSinkMetricsHandle, RunningSink,
    SinkHandle,
};
