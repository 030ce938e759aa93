//! Update and lifetime policies, and the pool they route a block to.

use std::fmt;

/// Whether a block's contents may change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateType {
    /// Written exactly once, at creation.
    Immutable,
    /// May be committed any number of times.
    Mutable,
}

/// How long a block's storage remains valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Lives for the allocator's whole lifetime. Only registrable before
    /// the registration period is closed.
    Permanent,
    /// Recycled by `end_of_frame()`.
    SingleFrame,
}

/// The arena pool a block's region lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoolKind {
    /// One arena, write-once regions.
    Immutable,
    /// Two arenas (read half and write half) flipped at each frame boundary.
    Mutable,
    /// Two arenas, emptied at the end of every frame.
    SingleFrame,
}

impl PoolKind {
    /// All pools, in lock order.
    pub const ALL: [PoolKind; 3] = [PoolKind::Immutable, PoolKind::Mutable, PoolKind::SingleFrame];

    /// Pick the pool for a block's policies.
    ///
    /// Single-frame blocks always land in the single-frame pool; permanent
    /// blocks are split by update type.
    pub fn route(update: UpdateType, lifetime: Lifetime) -> Self {
        match (lifetime, update) {
            (Lifetime::SingleFrame, _) => PoolKind::SingleFrame,
            (Lifetime::Permanent, UpdateType::Immutable) => PoolKind::Immutable,
            (Lifetime::Permanent, UpdateType::Mutable) => PoolKind::Mutable,
        }
    }

    /// Whether this pool holds permanent regions.
    pub fn is_permanent(self) -> bool {
        !matches!(self, PoolKind::SingleFrame)
    }

    /// Whether this pool keeps two arenas.
    pub fn is_double_buffered(self) -> bool {
        !matches!(self, PoolKind::Immutable)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            PoolKind::Immutable => 0,
            PoolKind::Mutable => 1,
            PoolKind::SingleFrame => 2,
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKind::Immutable => write!(f, "immutable"),
            PoolKind::Mutable => write!(f, "mutable"),
            PoolKind::SingleFrame => write!(f, "single-frame"),
        }
    }
}

/// Which half of a double-buffered pool to address.
///
/// Immutable regions ignore this; single-frame regions always resolve to
/// the half they were allocated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferHalf {
    /// Last frame's committed state. What the renderer consumes this frame.
    #[default]
    Read,
    /// The half commits land in this frame.
    Write,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route() {
        assert_eq!(
            PoolKind::route(UpdateType::Immutable, Lifetime::Permanent),
            PoolKind::Immutable
        );
        assert_eq!(
            PoolKind::route(UpdateType::Mutable, Lifetime::Permanent),
            PoolKind::Mutable
        );
        assert_eq!(
            PoolKind::route(UpdateType::Mutable, Lifetime::SingleFrame),
            PoolKind::SingleFrame
        );
        assert_eq!(
            PoolKind::route(UpdateType::Immutable, Lifetime::SingleFrame),
            PoolKind::SingleFrame
        );
    }

    #[test]
    fn test_pool_shape() {
        assert!(PoolKind::Immutable.is_permanent());
        assert!(!PoolKind::Immutable.is_double_buffered());
        assert!(PoolKind::Mutable.is_double_buffered());
        assert!(!PoolKind::SingleFrame.is_permanent());
    }
}
