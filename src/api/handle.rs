//! Block handles and region descriptors.
//!
//! A [`BlockHandle`] is a plain value: a process-unique counter plus the
//! pool it routes to. Single-frame handles also carry the frame epoch they
//! were created in, which makes use after `end_of_frame()` detectable
//! without a lookup table.

use std::fmt;

use crate::api::policy::PoolKind;

/// Opaque identifier of a staged block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHandle {
    pub(crate) id: u64,
    pub(crate) pool: PoolKind,
    /// Single-frame epoch at creation; always 0 for permanent pools.
    pub(crate) epoch: u64,
}

impl BlockHandle {
    pub(crate) fn new(id: u64, pool: PoolKind, epoch: u64) -> Self {
        Self { id, pool, epoch }
    }

    /// Handle returned when registration fails and execution continues.
    ///
    /// It never resolves, so every later access reports an unknown handle.
    pub(crate) fn dangling(pool: PoolKind) -> Self {
        Self {
            id: u64::MAX,
            pool,
            epoch: 0,
        }
    }

    /// The raw id (for debugging and platform-side keys).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The pool this handle's region lives in.
    pub fn pool(&self) -> PoolKind {
        self.pool
    }

    /// The single-frame epoch this handle was created in.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether this is the placeholder from a failed registration.
    pub fn is_dangling(&self) -> bool {
        self.id == u64::MAX
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pool {
            PoolKind::SingleFrame => write!(f, "Block#{}({}@{})", self.id, self.pool, self.epoch),
            _ => write!(f, "Block#{}({})", self.id, self.pool),
        }
    }
}

/// Where a block's bytes live: `{pool, half, offset, len}`.
///
/// Mutable regions sit at the same offset in both halves and report half 0.
/// Single-frame regions live in the half that was writable when they were
/// allocated, so two of them may share an offset in different halves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    /// Pool holding the region.
    pub pool: PoolKind,
    /// Arena half holding the bytes.
    pub half: usize,
    /// Byte offset from the start of the arena half.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
}

impl Region {
    /// Zero-length region at offset 0, returned after a failed lookup.
    pub fn empty(pool: PoolKind) -> Self {
        Self {
            pool,
            half: 0,
            offset: 0,
            len: 0,
        }
    }

    /// One past the last byte of the region.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Whether two regions share any byte of the same arena half.
    pub fn overlaps(&self, other: &Region) -> bool {
        self.pool == other.pool
            && self.half == other.half
            && self.offset < other.end()
            && other.offset < self.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let h = BlockHandle::new(7, PoolKind::Mutable, 0);
        assert_eq!(h.to_string(), "Block#7(mutable)");
        let sf = BlockHandle::new(8, PoolKind::SingleFrame, 3);
        assert_eq!(sf.to_string(), "Block#8(single-frame@3)");
    }

    #[test]
    fn test_dangling() {
        let h = BlockHandle::dangling(PoolKind::Immutable);
        assert!(h.is_dangling());
        assert!(!BlockHandle::new(0, PoolKind::Immutable, 0).is_dangling());
    }

    #[test]
    fn test_region_overlap() {
        let region = |pool, half, offset, len| Region {
            pool,
            half,
            offset,
            len,
        };
        let a = region(PoolKind::SingleFrame, 0, 0, 4);
        let b = region(PoolKind::SingleFrame, 0, 4, 8);
        let c = region(PoolKind::SingleFrame, 0, 2, 4);
        let d = region(PoolKind::Mutable, 0, 0, 4);
        let e = region(PoolKind::SingleFrame, 1, 0, 4);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
        assert!(!a.overlaps(&d));
        assert!(!a.overlaps(&e));
        assert_eq!(b.end(), 12);
    }
}
