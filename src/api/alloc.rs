//! The main allocator type.

use std::cell::RefMut;
use std::mem::size_of;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::allocators::pool::{BlockRecord, Deallocation, PoolState};
use crate::api::config::StagingConfig;
use crate::api::error::StagingError;
use crate::api::frame::{FrameBoundary, FramePhase};
use crate::api::handle::{BlockHandle, Region};
use crate::api::policy::{BufferHalf, Lifetime, PoolKind, UpdateType};
use crate::api::stats::StagingStats;
use crate::binding::{PlatformBinding, Upload};
use crate::core::descriptor::TypeDescriptor;
use crate::core::state::AllocatorState;
use crate::diagnostics::{self, DiagContext, Diagnostic};
use crate::sync::mutex::PoolGuard;

/// The staging allocator.
///
/// Owns the CPU-side bytes of every block, addressed by [`BlockHandle`].
/// It is cheap to clone (internally uses `Arc`) and thread-safe: producer
/// threads may create and commit blocks concurrently during a frame's build
/// phase, while the frame driver calls the boundary operations from one
/// thread once producers have joined.
///
/// Invariant violations are fatal. Each fatal operation has a `try_*` form
/// that returns the [`StagingError`] instead; the plain form reports it
/// through [`diagnostics`](crate::diagnostics) and, when errors are not
/// fatal, falls back to a no-op.
///
/// # Example
///
/// ```rust,no_run
/// use stagealloc::{Block, Lifetime, StagingAllocator, UpdateType};
///
/// let alloc = StagingAllocator::with_defaults();
///
/// let camera = Block::create(
///     &alloc,
///     "camera",
///     &[0.0f32; 16],
///     UpdateType::Mutable,
///     Lifetime::Permanent,
/// );
/// alloc.close_registration_period();
///
/// for frame in 0..3u64 {
///     camera.set_data(&[frame as f32; 16]);
///     alloc.run_frame_boundary(frame);
/// }
/// ```
#[derive(Clone)]
pub struct StagingAllocator {
    inner: Arc<AllocatorState>,
}

impl StagingAllocator {
    /// Create a new allocator with the given configuration.
    pub fn new(config: StagingConfig) -> Self {
        Self {
            inner: Arc::new(AllocatorState::new(config)),
        }
    }

    /// Create an allocator with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(StagingConfig::default())
    }

    /// Get the configuration.
    pub fn config(&self) -> &StagingConfig {
        self.inner.config()
    }

    /// Install the platform binding that receives staged data.
    pub fn set_binding(&self, binding: Arc<dyn PlatformBinding>) {
        self.inner.set_binding(Some(binding));
    }

    /// Remove the platform binding.
    pub fn clear_binding(&self) {
        self.inner.set_binding(None);
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a block and allocate its region, seeded with `initial`.
    ///
    /// The region is `initial.len()` bytes. Mutable blocks are seeded into
    /// both halves. The platform binding is notified through
    /// `on_block_created`.
    ///
    /// Fatal if a permanent block is registered after
    /// [`close_registration_period`](Self::close_registration_period); the
    /// fallback is a dangling handle that never resolves.
    pub fn register_and_allocate(
        &self,
        name: &str,
        descriptor: TypeDescriptor,
        update: UpdateType,
        lifetime: Lifetime,
        initial: &[u8],
    ) -> BlockHandle {
        let pool = PoolKind::route(update, lifetime);
        let result = self.try_register_and_allocate(name, descriptor, update, lifetime, initial);
        self.or_report(result, BlockHandle::dangling(pool))
    }

    /// Fallible form of [`register_and_allocate`](Self::register_and_allocate).
    pub fn try_register_and_allocate(
        &self,
        name: &str,
        descriptor: TypeDescriptor,
        update: UpdateType,
        lifetime: Lifetime,
        initial: &[u8],
    ) -> Result<BlockHandle, StagingError> {
        let kind = PoolKind::route(update, lifetime);
        let binding = self.inner.binding();
        let (handle, region, staged) = {
            let guard = self.inner.pool(kind).lock();
            let mut pool = borrow_mut(&guard, kind)?;
            let handle = self.register_locked(&mut pool, name, descriptor, update)?;
            let region = self.allocate_locked(&mut pool, handle, initial.len())?;
            pool.write_initial(handle, initial)?;
            let staged = binding.as_ref().and_then(|_| StagedCopy::capture(&pool, handle));
            (handle, region, staged)
        };
        log::trace!(
            "registered {} \"{}\" at {}+{}",
            handle,
            name,
            region.offset,
            region.len
        );
        notify_created(binding, staged);
        Ok(handle)
    }

    /// Insert a block into its pool's registry without allocating a region.
    ///
    /// Usually reached through [`register_and_allocate`](Self::register_and_allocate).
    pub fn register(
        &self,
        name: &str,
        descriptor: TypeDescriptor,
        update: UpdateType,
        lifetime: Lifetime,
    ) -> BlockHandle {
        let pool = PoolKind::route(update, lifetime);
        let result = self.try_register(name, descriptor, update, lifetime);
        self.or_report(result, BlockHandle::dangling(pool))
    }

    /// Fallible form of [`register`](Self::register).
    pub fn try_register(
        &self,
        name: &str,
        descriptor: TypeDescriptor,
        update: UpdateType,
        lifetime: Lifetime,
    ) -> Result<BlockHandle, StagingError> {
        let kind = PoolKind::route(update, lifetime);
        let guard = self.inner.pool(kind).lock();
        let mut pool = borrow_mut(&guard, kind)?;
        let handle = self.register_locked(&mut pool, name, descriptor, update)?;
        Ok(handle)
    }

    /// Append `num_bytes` zeroed bytes to the handle's pool and record the
    /// region. Fatal if the handle already owns one.
    pub fn allocate(&self, handle: BlockHandle, num_bytes: usize) -> Region {
        let result = self.try_allocate(handle, num_bytes);
        self.or_report(result, Region::empty(handle.pool()))
    }

    /// Fallible form of [`allocate`](Self::allocate).
    pub fn try_allocate(
        &self,
        handle: BlockHandle,
        num_bytes: usize,
    ) -> Result<Region, StagingError> {
        let kind = handle.pool();
        let binding = self.inner.binding();
        let (region, staged) = {
            let guard = self.inner.pool(kind).lock();
            let mut pool = borrow_mut(&guard, kind)?;
            let region = self.allocate_locked(&mut pool, handle, num_bytes)?;
            let staged = binding.as_ref().and_then(|_| StagedCopy::capture(&pool, handle));
            (region, staged)
        };
        notify_created(binding, staged);
        Ok(region)
    }

    fn register_locked(
        &self,
        pool: &mut PoolState,
        name: &str,
        descriptor: TypeDescriptor,
        update: UpdateType,
    ) -> Result<BlockHandle, StagingError> {
        let kind = pool.kind();
        if kind.is_permanent() && self.inner.is_registration_closed() {
            return Err(StagingError::RegistrationClosed {
                name: name.to_owned(),
                pool: kind,
            });
        }
        let handle = BlockHandle::new(self.inner.next_id(), kind, pool.epoch());
        pool.register(handle, BlockRecord::new(name.to_owned(), descriptor, update))?;
        self.inner.registrations.increment();
        Ok(handle)
    }

    fn allocate_locked(
        &self,
        pool: &mut PoolState,
        handle: BlockHandle,
        num_bytes: usize,
    ) -> Result<Region, StagingError> {
        let kind = pool.kind();
        if kind.is_permanent() && self.inner.is_registration_closed() {
            return Err(StagingError::RegistrationClosed {
                name: handle.to_string(),
                pool: kind,
            });
        }
        pool.allocate(handle, num_bytes)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Copy `bytes` into a block's region and mark it dirty.
    ///
    /// Mutable permanent blocks are written in the current write half; the
    /// read half stays untouched until the next swap. `descriptor` must name
    /// the type the block was created from and `bytes` must be exactly the
    /// region's length.
    pub fn commit(&self, handle: BlockHandle, descriptor: &TypeDescriptor, bytes: &[u8]) {
        let result = self.try_commit(handle, descriptor, bytes);
        self.or_report(result, ());
    }

    /// Fallible form of [`commit`](Self::commit).
    pub fn try_commit(
        &self,
        handle: BlockHandle,
        descriptor: &TypeDescriptor,
        bytes: &[u8],
    ) -> Result<(), StagingError> {
        let kind = handle.pool();
        let guard = self.inner.pool(kind).lock();
        let mut pool = borrow_mut(&guard, kind)?;
        pool.commit(handle, descriptor, bytes)?;
        self.inner.commits.increment();
        log::trace!("committed {} bytes to {}", bytes.len(), handle);
        Ok(())
    }

    /// Release a block.
    ///
    /// Permanent bytes are kept for the allocator's lifetime; a second call
    /// is a no-op. Single-frame bytes are zeroed and the handle is unlinked,
    /// so later reads fail, and the binding's `on_block_released` runs once
    /// the pool is unlocked. Releasing a single-frame handle twice, or after
    /// its frame ended, is a no-op.
    pub fn deallocate(&self, handle: BlockHandle) {
        let result = self.try_deallocate(handle);
        self.or_report(result, ());
    }

    /// Fallible form of [`deallocate`](Self::deallocate).
    pub fn try_deallocate(&self, handle: BlockHandle) -> Result<(), StagingError> {
        if handle.is_dangling() {
            return Ok(());
        }
        let kind = handle.pool();
        let outcome = {
            let guard = self.inner.pool(kind).lock();
            let mut pool = borrow_mut(&guard, kind)?;
            pool.deallocate(handle)?
        };
        match outcome {
            Deallocation::Released => {
                log::trace!("released {}", handle);
                if kind == PoolKind::SingleFrame {
                    if let Some(binding) = self.inner.binding() {
                        binding.on_block_released(handle);
                    }
                }
            }
            Deallocation::AlreadyReleased => log::trace!("{} already released", handle),
        }
        Ok(())
    }

    // =========================================================================
    // Consumption
    // =========================================================================

    /// Run `f` over a block's bytes in the given half.
    ///
    /// The pool stays locked while `f` runs. `half` only matters for the
    /// mutable pool; immutable and single-frame blocks have one copy.
    /// Returns `None` after a non-fatal lookup failure.
    pub fn with_bytes<R>(
        &self,
        handle: BlockHandle,
        half: BufferHalf,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Option<R> {
        let result = self.try_with_bytes(handle, half, f).map(Some);
        self.or_report(result, None)
    }

    /// Fallible form of [`with_bytes`](Self::with_bytes).
    pub fn try_with_bytes<R>(
        &self,
        handle: BlockHandle,
        half: BufferHalf,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, StagingError> {
        let guard = self.inner.pool(handle.pool()).lock();
        let pool = guard.borrow();
        let bytes = pool.bytes(handle, half)?;
        Ok(f(bytes))
    }

    /// Copy a block's bytes out of the given half.
    pub fn to_vec(&self, handle: BlockHandle, half: BufferHalf) -> Vec<u8> {
        self.with_bytes(handle, half, |bytes| bytes.to_vec())
            .unwrap_or_default()
    }

    /// Base pointer and length of a block's bytes in the given half.
    ///
    /// The pointer is valid only until the next allocation, swap or end of
    /// frame on the same pool. Permanent pools stop growing once
    /// registration is closed, which makes their pointers stable from then
    /// on. The fallback is `(null, 0)`.
    pub fn raw_parts(&self, handle: BlockHandle, half: BufferHalf) -> (*const u8, usize) {
        let result = self.try_with_bytes(handle, half, |bytes| (bytes.as_ptr(), bytes.len()));
        self.or_report(result, (std::ptr::null(), 0))
    }

    /// Where a block's bytes live.
    pub fn region(&self, handle: BlockHandle) -> Region {
        let result = self.try_region(handle);
        self.or_report(result, Region::empty(handle.pool()))
    }

    /// Fallible form of [`region`](Self::region).
    pub fn try_region(&self, handle: BlockHandle) -> Result<Region, StagingError> {
        let guard = self.inner.pool(handle.pool()).lock();
        let pool = guard.borrow();
        let region = pool.region(handle)?;
        Ok(region)
    }

    /// Size of a block in bytes.
    pub fn data_size(&self, handle: BlockHandle) -> usize {
        self.region(handle).len
    }

    /// Whether a block has been committed since the last dirty upload.
    pub fn is_dirty(&self, handle: BlockHandle) -> bool {
        let result = self.try_is_dirty(handle);
        self.or_report(result, false)
    }

    /// Fallible form of [`is_dirty`](Self::is_dirty).
    pub fn try_is_dirty(&self, handle: BlockHandle) -> Result<bool, StagingError> {
        let guard = self.inner.pool(handle.pool()).lock();
        let pool = guard.borrow();
        let dirty = pool.record(handle)?.dirty;
        Ok(dirty)
    }

    /// Read a single-value block from the read half as `T`.
    ///
    /// Fatal if `T` is not the type the block was created from. The fallback
    /// is `T::zeroed()`.
    pub fn read<T: Pod>(&self, handle: BlockHandle) -> T {
        let result = self.try_read(handle, BufferHalf::Read);
        self.or_report(result, Zeroable::zeroed())
    }

    /// Read a single-value block from the write half as `T`.
    pub fn read_write_half<T: Pod>(&self, handle: BlockHandle) -> T {
        let result = self.try_read(handle, BufferHalf::Write);
        self.or_report(result, Zeroable::zeroed())
    }

    /// Fallible typed read.
    pub fn try_read<T: Pod>(
        &self,
        handle: BlockHandle,
        half: BufferHalf,
    ) -> Result<T, StagingError> {
        let guard = self.inner.pool(handle.pool()).lock();
        let pool = guard.borrow();
        let descriptor = pool.record(handle)?.descriptor;
        check_type::<T>(handle, &descriptor)?;
        let bytes = pool.bytes(handle, half)?;
        if bytes.len() != size_of::<T>() {
            return Err(StagingError::SizeMismatch {
                handle,
                expected: bytes.len(),
                found: size_of::<T>(),
            });
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Read an array block from the read half, one `T` per element.
    ///
    /// Elements are read at the stride the block was created with. The
    /// fallback is an empty vector.
    pub fn read_array<T: Pod>(&self, handle: BlockHandle) -> Vec<T> {
        let result = self.try_read_array(handle, BufferHalf::Read);
        self.or_report(result, Vec::new())
    }

    /// Fallible form of [`read_array`](Self::read_array).
    pub fn try_read_array<T: Pod>(
        &self,
        handle: BlockHandle,
        half: BufferHalf,
    ) -> Result<Vec<T>, StagingError> {
        let guard = self.inner.pool(handle.pool()).lock();
        let pool = guard.borrow();
        let descriptor = pool.record(handle)?.descriptor;
        check_type::<T>(handle, &descriptor)?;
        let stride = descriptor.element_size();
        let bytes = pool.bytes(handle, half)?;
        if stride < size_of::<T>() || bytes.len() != descriptor.byte_size() {
            return Err(StagingError::SizeMismatch {
                handle,
                expected: descriptor.byte_size(),
                found: size_of::<T>() * descriptor.count(),
            });
        }
        let elements = (0..descriptor.count())
            .map(|i| bytemuck::pod_read_unaligned(&bytes[i * stride..i * stride + size_of::<T>()]))
            .collect();
        Ok(elements)
    }

    // =========================================================================
    // Frame boundary
    // =========================================================================

    /// Push every dirty mutable block's write half to the platform binding
    /// and clear its dirty flag. Returns the number of blocks pushed.
    ///
    /// Single-frame blocks are never pushed here, even when mutable.
    pub fn update_dirty_mutable_blocks(&self) -> usize {
        let warning = self.inner.frame().on_upload();
        if let Some(diag) = warning {
            self.warn(diag, "update_dirty_mutable_blocks after swap_buffers");
        }

        let kind = PoolKind::Mutable;
        let guard = self.inner.pool(kind).lock();
        let dirty = match borrow_mut(&guard, kind) {
            Ok(mut pool) => pool.take_dirty(),
            Err(err) => {
                self.report(&err);
                return 0;
            }
        };

        if let Some(binding) = self.inner.binding() {
            let pool = guard.borrow();
            for &handle in &dirty {
                let (Ok(record), Ok(region), Ok(bytes)) = (
                    pool.record(handle),
                    pool.region(handle),
                    pool.bytes(handle, BufferHalf::Write),
                ) else {
                    continue;
                };
                binding.on_block_dirty(&Upload {
                    handle,
                    name: &record.name,
                    region,
                    bytes,
                });
            }
        }

        self.inner.dirty_uploads.add(dirty.len());
        log::debug!("uploaded {} dirty mutable blocks", dirty.len());
        dirty.len()
    }

    /// Flip the read/write halves of the mutable and single-frame pools.
    ///
    /// Call exactly once per frame boundary, after every producer for the
    /// finished frame has joined. Mutable blocks committed during that frame
    /// become visible in the read half and are carried into the new write
    /// half.
    pub fn swap_buffers(&self, frame_number: u64) {
        let warning = self.inner.frame().on_swap(frame_number);
        if let Some(diag) = warning {
            self.warn(diag, &format!("frame {}", frame_number));
        }

        {
            let mutable = self.inner.pool(PoolKind::Mutable).lock();
            let single_frame = self.inner.pool(PoolKind::SingleFrame).lock();
            let locked = [
                (PoolKind::Mutable, &mutable),
                (PoolKind::SingleFrame, &single_frame),
            ];
            for (kind, guard) in locked {
                match borrow_mut(guard, kind) {
                    Ok(mut pool) => pool.swap(),
                    Err(err) => self.report(&err),
                }
            }
        }

        self.inner.frames_swapped.increment();
        log::debug!("swapped buffers for frame {}", frame_number);

        if self.inner.config().close_registration_on_first_swap {
            self.close_registration_period();
        }
    }

    /// Recycle every single-frame block and truncate the single-frame pool
    /// to zero length. Returns the number of blocks released.
    ///
    /// Handles from the finished frame become stale: reads through them are
    /// fatal and releasing them is a no-op. The binding's
    /// `on_block_released` runs for each released block after the pool is
    /// unlocked, and may release other blocks.
    pub fn end_of_frame(&self) -> usize {
        let warning = self.inner.frame().on_end_of_frame();
        if let Some(diag) = warning {
            self.warn(diag, "end_of_frame without swap_buffers");
        }

        let kind = PoolKind::SingleFrame;
        let ended = {
            let guard = self.inner.pool(kind).lock();
            let result = borrow_mut(&guard, kind).map(|mut pool| {
                let released = pool.end_frame();
                (released, pool.epoch())
            });
            result
        };
        let (released, epoch) = match ended {
            Ok(ended) => ended,
            Err(err) => {
                self.report(&err);
                return 0;
            }
        };

        if let Some(binding) = self.inner.binding() {
            for &handle in &released {
                binding.on_block_released(handle);
            }
        }

        self.inner.single_frame_releases.add(released.len());
        log::debug!(
            "end of frame: released {} single-frame blocks, epoch {}",
            released.len(),
            epoch
        );
        released.len()
    }

    /// Run the three boundary operations in their required order.
    pub fn run_frame_boundary(&self, frame_number: u64) -> FrameBoundary {
        let uploaded = self.update_dirty_mutable_blocks();
        self.swap_buffers(frame_number);
        let released = self.end_of_frame();
        FrameBoundary {
            frame_number,
            uploaded,
            released,
        }
    }

    /// Close the permanent registration period. One-way.
    ///
    /// Afterwards the immutable and mutable arenas never grow, so addresses
    /// obtained through [`raw_parts`](Self::raw_parts) stay valid.
    pub fn close_registration_period(&self) {
        if self.inner.close_registration() {
            let stats = self.inner.stats();
            log::info!(
                "registration period closed: {} immutable and {} mutable blocks",
                stats.immutable.live_blocks,
                stats.mutable.live_blocks
            );
        }
    }

    /// Whether the permanent registration period has been closed.
    pub fn is_registration_closed(&self) -> bool {
        self.inner.is_registration_closed()
    }

    /// Number of `end_of_frame()` calls so far.
    pub fn current_epoch(&self) -> u64 {
        let guard = self.inner.pool(PoolKind::SingleFrame).lock();
        let epoch = guard.borrow().epoch();
        epoch
    }

    /// Where the frame driver is in the boundary sequence.
    pub fn frame_phase(&self) -> FramePhase {
        self.inner.frame().phase()
    }

    /// Get current statistics.
    pub fn stats(&self) -> StagingStats {
        self.inner.stats()
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    fn or_report<T>(&self, result: Result<T, StagingError>, fallback: T) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                self.report(&err);
                fallback
            }
        }
    }

    fn report(&self, err: &StagingError) {
        let context = DiagContext::capture(self.inner.last_frame(), Some(err.pool()));
        diagnostics::emit(err.diagnostic(), &context, &err.to_string());
    }

    fn warn(&self, diag: &Diagnostic, detail: &str) {
        let context = DiagContext::capture(self.inner.last_frame(), None);
        diagnostics::emit(diag, &context, detail);
    }
}

impl Default for StagingAllocator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for StagingAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingAllocator")
            .field("registration_closed", &self.is_registration_closed())
            .field("config", self.config())
            .finish_non_exhaustive()
    }
}

/// A new block's upload copied out of its pool, so `on_block_created` runs
/// with no pool lock held.
struct StagedCopy {
    handle: BlockHandle,
    name: String,
    region: Region,
    bytes: Vec<u8>,
}

impl StagedCopy {
    fn capture(pool: &PoolState, handle: BlockHandle) -> Option<Self> {
        let record = pool.record(handle).ok()?;
        let region = pool.region(handle).ok()?;
        let bytes = pool.bytes(handle, BufferHalf::Write).ok()?;
        Some(Self {
            handle,
            name: record.name.clone(),
            region,
            bytes: bytes.to_vec(),
        })
    }

    fn upload(&self) -> Upload<'_> {
        Upload {
            handle: self.handle,
            name: &self.name,
            region: self.region,
            bytes: &self.bytes,
        }
    }
}

fn notify_created(binding: Option<Arc<dyn PlatformBinding>>, staged: Option<StagedCopy>) {
    if let (Some(binding), Some(staged)) = (binding, staged) {
        binding.on_block_created(&staged.upload());
    }
}

/// Exclusive access to a locked pool, refused inside a hook on that pool.
fn borrow_mut<'g>(
    guard: &'g PoolGuard<'_, PoolState>,
    kind: PoolKind,
) -> Result<RefMut<'g, PoolState>, StagingError> {
    guard
        .try_borrow_mut()
        .ok_or(StagingError::ReentrantMutation { pool: kind })
}

fn check_type<T: Pod>(
    handle: BlockHandle,
    descriptor: &TypeDescriptor,
) -> Result<(), StagingError> {
    if descriptor.is::<T>() {
        return Ok(());
    }
    Err(StagingError::TypeMismatch {
        handle,
        expected: descriptor.type_name(),
        found: std::any::type_name::<T>(),
    })
}
