//! Where a diagnostic was raised: frame, pool and calling thread.

use std::fmt;

use crate::api::policy::PoolKind;

/// Runtime state attached to every emitted diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagContext {
    /// Last frame number passed to `swap_buffers`, if any.
    pub frame_number: Option<u64>,
    /// Pool the failing operation targeted.
    pub pool: Option<PoolKind>,
    /// Thread name, or its id for unnamed threads.
    pub thread: String,
}

impl DiagContext {
    /// Snapshot the calling thread.
    pub fn capture(frame_number: Option<u64>, pool: Option<PoolKind>) -> Self {
        let current = std::thread::current();
        let thread = match current.name() {
            Some(name) => format!("\"{}\"", name),
            None => format!("{:?}", current.id()),
        };
        Self {
            frame_number,
            pool,
            thread,
        }
    }
}

impl fmt::Display for DiagContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame_number {
            Some(frame) => write!(f, "frame={}", frame)?,
            None => f.write_str("frame=none")?,
        }
        if let Some(pool) = self.pool {
            write!(f, ", pool={}", pool)?;
        }
        write!(f, ", thread={}", self.thread)
    }
}
