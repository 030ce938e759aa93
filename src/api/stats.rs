//! Allocation statistics.

use std::fmt;

use crate::api::policy::PoolKind;
use crate::util::size::format_bytes;

/// Snapshot of one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Blocks still in the registry.
    pub live_blocks: usize,

    /// Regions in the handle index, including destroyed permanent blocks
    /// whose bytes persist.
    pub regions: usize,

    /// Bytes handed out from the arena(s), including alignment padding.
    pub arena_bytes: usize,

    /// Bytes reserved by the arena(s).
    pub reserved_bytes: usize,
}

/// Aggregated allocator statistics.
#[derive(Debug, Clone, Default)]
pub struct StagingStats {
    /// Immutable pool snapshot.
    pub immutable: PoolStats,

    /// Mutable pool snapshot.
    pub mutable: PoolStats,

    /// Single-frame pool snapshot.
    pub single_frame: PoolStats,

    /// Blocks registered since creation.
    pub registrations: u64,

    /// Successful commits.
    pub commits: u64,

    /// Blocks pushed to the platform by `update_dirty_mutable_blocks()`.
    pub dirty_uploads: u64,

    /// Single-frame blocks released by `end_of_frame()`.
    pub single_frame_releases: u64,

    /// Buffer swaps performed.
    pub frames_swapped: u64,

    /// Whether permanent registration has been closed.
    pub registration_closed: bool,
}

impl StagingStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one pool.
    pub fn pool(&self, pool: PoolKind) -> &PoolStats {
        match pool {
            PoolKind::Immutable => &self.immutable,
            PoolKind::Mutable => &self.mutable,
            PoolKind::SingleFrame => &self.single_frame,
        }
    }

    pub(crate) fn pool_mut(&mut self, pool: PoolKind) -> &mut PoolStats {
        match pool {
            PoolKind::Immutable => &mut self.immutable,
            PoolKind::Mutable => &mut self.mutable,
            PoolKind::SingleFrame => &mut self.single_frame,
        }
    }

    /// Live blocks across all pools.
    pub fn live_blocks(&self) -> usize {
        PoolKind::ALL.iter().map(|&p| self.pool(p).live_blocks).sum()
    }

    /// Arena bytes across all pools.
    pub fn arena_bytes(&self) -> usize {
        PoolKind::ALL.iter().map(|&p| self.pool(p).arena_bytes).sum()
    }
}

impl fmt::Display for StagingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Staging Statistics:")?;
        for pool in PoolKind::ALL {
            let stats = self.pool(pool);
            writeln!(
                f,
                "  {:<13} {} blocks, {} staged, {} reserved",
                format!("{pool}:"),
                stats.live_blocks,
                format_bytes(stats.arena_bytes),
                format_bytes(stats.reserved_bytes)
            )?;
        }
        writeln!(f, "  Registrations: {}", self.registrations)?;
        writeln!(f, "  Commits:       {}", self.commits)?;
        writeln!(f, "  Dirty uploads: {}", self.dirty_uploads)?;
        writeln!(f, "  SF releases:   {}", self.single_frame_releases)?;
        writeln!(f, "  Swaps:         {}", self.frames_swapped)?;
        writeln!(
            f,
            "  Registration:  {}",
            if self.registration_closed { "closed" } else { "open" }
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals() {
        let mut stats = StagingStats::new();
        stats.pool_mut(PoolKind::Immutable).live_blocks = 2;
        stats.pool_mut(PoolKind::SingleFrame).live_blocks = 3;
        stats.pool_mut(PoolKind::Mutable).arena_bytes = 24;
        assert_eq!(stats.live_blocks(), 5);
        assert_eq!(stats.arena_bytes(), 24);
    }

    #[test]
    fn test_display_mentions_every_pool() {
        let text = StagingStats::new().to_string();
        assert!(text.contains("immutable:"));
        assert!(text.contains("mutable:"));
        assert!(text.contains("single-frame:"));
        assert!(text.contains("Registration:  open"));
    }
}
