//! Null writer - discards every batch
//!
//! Runs the full batching path without a database, which is useful for
//! measuring reader throughput and for dry runs on a bench.
//!
//! # Example
//!
//! ```ignore
//! use canbridge_sinks::batching::{BatchingSink, BatchingSinkConfig};
//! use canbridge_sinks::null::NullWriter;
//!
//! let (sink, handle) = BatchingSink::new(config, NullWriter::new());
//! let running = sink.spawn(&cancel);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::batching::BatchWriter;
use crate::error::SinkError;

/// Discards records, counting what it was handed
#[derive(Debug, Clone, Default)]
pub struct NullWriter {
    batches: Arc<AtomicU64>,
    records: Arc<AtomicU64>,
}

impl NullWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches discarded so far
    #[inline]
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    /// Records discarded so far
    #[inline]
    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<R: Send + Sync + 'static> BatchWriter<R> for NullWriter {
    fn writer_type(&self) -> &'static str {
        "null"
    }

    async fn write_batch(&mut self, records: &[R]) -> Result<(), SinkError> {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.records
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}
