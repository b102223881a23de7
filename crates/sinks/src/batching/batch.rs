//! Bounded record accumulator

/// Ordered records awaiting one downstream write
///
/// Owned by a single sink task. The backing allocation is kept across
/// flushes, so steady-state batching does not reallocate.
#[derive(Debug)]
pub struct Batch<R> {
    records: Vec<R>,
    capacity: usize,
}

impl<R> Batch<R> {
    /// Create an empty batch holding at most `capacity` records (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record; returns true when the batch is now full
    #[inline]
    pub fn push(&mut self, record: R) -> bool {
        debug_assert!(self.records.len() < self.capacity, "push into a full batch");
        self.records.push(record);
        self.is_full()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records in arrival order
    #[inline]
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Drop all records, keeping the allocation
    #[inline]
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
