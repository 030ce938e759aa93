//! Lock-free counters for handle ids and allocator statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing `u64`.
///
/// Relaxed ordering throughout: readers only ever need a value that was
/// current at some point, and id uniqueness comes from `fetch_add` itself.
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    pub const fn new(start: u64) -> Self {
        Self(AtomicU64::new(start))
    }

    /// Count one event.
    pub fn increment(&self) {
        self.add(1);
    }

    /// Count `n` events at once.
    pub fn add(&self, n: usize) {
        self.0.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Claim the current value; no two callers ever see the same one.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}
