//! Shared allocator state and type descriptors.

pub(crate) mod descriptor;
pub(crate) mod state;
