//! Backing storage for the three pools.

pub(crate) mod arena;
pub(crate) mod pool;
