//! Shared allocator state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::allocators::pool::PoolState;
use crate::api::config::StagingConfig;
use crate::api::frame::FrameTracker;
use crate::api::policy::PoolKind;
use crate::api::stats::StagingStats;
use crate::binding::PlatformBinding;
use crate::sync::atomics::AtomicCounter;
use crate::sync::mutex::PoolLock;

/// State shared by every clone of a `StagingAllocator`.
///
/// Pool locks are taken in [`PoolKind::ALL`] order when more than one is
/// needed.
pub(crate) struct AllocatorState {
    /// Configuration
    config: StagingConfig,

    /// One lock per pool, indexed by `PoolKind::index()`
    pools: [PoolLock<PoolState>; 3],

    /// Handle id source
    next_id: AtomicCounter,

    /// One-way permanent registration latch
    registration_closed: AtomicBool,

    /// Installed platform binding
    binding: RwLock<Option<Arc<dyn PlatformBinding>>>,

    /// Frame boundary sequencing
    frame: Mutex<FrameTracker>,

    /// Global statistics (atomics)
    pub(crate) registrations: AtomicCounter,
    pub(crate) commits: AtomicCounter,
    pub(crate) dirty_uploads: AtomicCounter,
    pub(crate) single_frame_releases: AtomicCounter,
    pub(crate) frames_swapped: AtomicCounter,
}

impl AllocatorState {
    /// Create new state with the given configuration.
    pub fn new(config: StagingConfig) -> Self {
        let align = config.alignment();
        let pool = |kind: PoolKind| {
            PoolLock::new(PoolState::new(kind, config.capacity(kind), align))
        };
        Self {
            pools: PoolKind::ALL.map(pool),
            config,
            next_id: AtomicCounter::new(0),
            registration_closed: AtomicBool::new(false),
            binding: RwLock::new(None),
            frame: Mutex::new(FrameTracker::new()),
            registrations: AtomicCounter::new(0),
            commits: AtomicCounter::new(0),
            dirty_uploads: AtomicCounter::new(0),
            single_frame_releases: AtomicCounter::new(0),
            frames_swapped: AtomicCounter::new(0),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    /// Get a pool's lock.
    pub fn pool(&self, kind: PoolKind) -> &PoolLock<PoolState> {
        &self.pools[kind.index()]
    }

    /// Next handle id.
    pub fn next_id(&self) -> u64 {
        self.next_id.next()
    }

    pub fn is_registration_closed(&self) -> bool {
        self.registration_closed.load(Ordering::Acquire)
    }

    /// Set the registration latch.
    ///
    /// Both permanent pools are held while the latch flips, so no
    /// registration can straddle the cutover. Returns `true` if this call
    /// closed it.
    ///
    /// Pools that are locked together are always locked Mutable first, the
    /// order dirty hooks and `swap_buffers` take them in.
    pub fn close_registration(&self) -> bool {
        let _mutable = self.pool(PoolKind::Mutable).lock();
        let _immutable = self.pool(PoolKind::Immutable).lock();
        !self.registration_closed.swap(true, Ordering::AcqRel)
    }

    /// The installed binding, cloned out so hooks run without the binding lock.
    pub fn binding(&self) -> Option<Arc<dyn PlatformBinding>> {
        self.binding.read().clone()
    }

    pub fn set_binding(&self, binding: Option<Arc<dyn PlatformBinding>>) {
        *self.binding.write() = binding;
    }

    /// Lock the frame tracker.
    pub fn frame(&self) -> parking_lot::MutexGuard<'_, FrameTracker> {
        self.frame.lock()
    }

    /// Last swapped frame, for diagnostic context.
    ///
    /// Uses `try_lock` so diagnostics raised while the tracker is held never
    /// deadlock.
    pub fn last_frame(&self) -> Option<u64> {
        self.frame.try_lock().and_then(|tracker| tracker.last_frame())
    }

    /// Snapshot statistics.
    pub fn stats(&self) -> StagingStats {
        let mut stats = StagingStats::new();
        for kind in PoolKind::ALL {
            let guard = self.pool(kind).lock();
            let pool = guard.borrow();
            *stats.pool_mut(kind) = pool.stats();
        }
        stats.registrations = self.registrations.get();
        stats.commits = self.commits.get();
        stats.dirty_uploads = self.dirty_uploads.get();
        stats.single_frame_releases = self.single_frame_releases.get();
        stats.frames_swapped = self.frames_swapped.get();
        stats.registration_closed = self.is_registration_closed();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_registration_once() {
        let state = AllocatorState::new(StagingConfig::minimal());
        assert!(!state.is_registration_closed());
        assert!(state.close_registration());
        assert!(!state.close_registration());
        assert!(state.stats().registration_closed);
    }

    #[test]
    fn test_ids_are_unique() {
        let state = AllocatorState::new(StagingConfig::minimal());
        let a = state.next_id();
        let b = state.next_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_pools_route_by_kind() {
        let state = AllocatorState::new(StagingConfig::minimal());
        for kind in PoolKind::ALL {
            let guard = state.pool(kind).lock();
            assert_eq!(guard.borrow().kind(), kind);
        }
    }
}
