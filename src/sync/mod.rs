//! Synchronization primitives.
//!
//! Pool state lives behind a re-entrant lock so platform hooks invoked while a
//! pool is locked can still read back through the allocator.

pub(crate) mod atomics;
pub(crate) mod mutex;
