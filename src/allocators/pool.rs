//! Per-pool registry, handle index and arenas.
//!
//! A [`PoolState`] is always accessed through its pool lock. The registry
//! holds the policy record of every live block; the index maps each handle
//! to its region. Permanent blocks leave the registry when destroyed but
//! keep their region, so their bytes persist for the allocator's lifetime.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::allocators::arena::{copy_region, ByteArena};
use crate::api::error::StagingError;
use crate::api::handle::{BlockHandle, Region};
use crate::api::policy::{BufferHalf, PoolKind, UpdateType};
use crate::api::stats::PoolStats;
use crate::core::descriptor::TypeDescriptor;

/// Registry record of a live block.
#[derive(Debug, Clone)]
pub(crate) struct BlockRecord {
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub update: UpdateType,
    /// Committed since the last dirty upload.
    pub dirty: bool,
    /// Committed since the last buffer swap.
    pub touched: bool,
}

impl BlockRecord {
    pub fn new(name: String, descriptor: TypeDescriptor, update: UpdateType) -> Self {
        Self {
            name,
            descriptor,
            update,
            dirty: false,
            touched: false,
        }
    }
}

/// Outcome of a deallocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Deallocation {
    /// The block left the registry.
    Released,
    /// The block was already released, or its frame already ended.
    AlreadyReleased,
}

/// State guarded by one pool lock.
pub(crate) struct PoolState {
    kind: PoolKind,
    /// Half 1 stays empty for the immutable pool.
    halves: [ByteArena; 2],
    write: usize,
    registry: BTreeMap<BlockHandle, BlockRecord>,
    index: HashMap<BlockHandle, Region>,
    /// Single-frame handles released during the current epoch.
    released: HashSet<BlockHandle>,
    /// Number of single-frame resets so far.
    epoch: u64,
    alignment: usize,
}

impl PoolState {
    pub fn new(kind: PoolKind, capacity: usize, alignment: usize) -> Self {
        let second = if kind.is_double_buffered() { capacity } else { 0 };
        Self {
            kind,
            halves: [ByteArena::new(capacity), ByteArena::new(second)],
            write: 0,
            registry: BTreeMap::new(),
            index: HashMap::new(),
            released: HashSet::new(),
            epoch: 0,
            alignment,
        }
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Index of the half commits currently land in.
    #[cfg(test)]
    pub fn write_half(&self) -> usize {
        self.write
    }

    /// Insert a block into the registry.
    pub fn register(
        &mut self,
        handle: BlockHandle,
        record: BlockRecord,
    ) -> Result<(), StagingError> {
        if self.registry.contains_key(&handle) || self.index.contains_key(&handle) {
            return Err(StagingError::DuplicateRegistration { handle });
        }
        self.registry.insert(handle, record);
        Ok(())
    }

    /// Append `len` zeroed bytes for a registered handle.
    ///
    /// Double-buffered permanent pools grow both halves so the region has the
    /// same offset in each; single-frame regions live in the write half only.
    pub fn allocate(&mut self, handle: BlockHandle, len: usize) -> Result<Region, StagingError> {
        if self.index.contains_key(&handle) {
            return Err(StagingError::AlreadyAllocated { handle });
        }
        if !self.registry.contains_key(&handle) {
            return Err(StagingError::UnknownHandle { handle });
        }

        let (half, offset) = match self.kind {
            PoolKind::Immutable => (0, self.halves[0].alloc(len, self.alignment)),
            PoolKind::Mutable => {
                let offset = self.halves[0].alloc(len, self.alignment);
                let mirrored = self.halves[1].alloc(len, self.alignment);
                debug_assert_eq!(offset, mirrored, "mutable halves diverged");
                (0, offset)
            }
            PoolKind::SingleFrame => {
                let half = self.write;
                (half, self.halves[half].alloc(len, self.alignment))
            }
        };

        let region = Region {
            pool: self.kind,
            half,
            offset,
            len,
        };
        self.index.insert(handle, region);
        Ok(region)
    }

    /// Write a freshly allocated block's initial contents.
    ///
    /// Mutable blocks are seeded into both halves so the renderer sees the
    /// initial value until the first swap after a commit.
    pub fn write_initial(
        &mut self,
        handle: BlockHandle,
        bytes: &[u8],
    ) -> Result<(), StagingError> {
        let region = *self.lookup(handle)?;
        check_len(handle, &region, bytes)?;
        let Region {
            half, offset, len, ..
        } = region;
        if self.kind == PoolKind::Mutable {
            for arena in self.halves.iter_mut() {
                arena.slice_mut(offset, len).copy_from_slice(bytes);
            }
        } else {
            self.halves[half].slice_mut(offset, len).copy_from_slice(bytes);
        }
        Ok(())
    }

    /// Copy `bytes` into a block's region and mark it dirty.
    pub fn commit(
        &mut self,
        handle: BlockHandle,
        descriptor: &TypeDescriptor,
        bytes: &[u8],
    ) -> Result<(), StagingError> {
        let region = *self.lookup(handle)?;
        let record = self
            .registry
            .get_mut(&handle)
            .ok_or(StagingError::UnknownHandle { handle })?;

        if record.update == UpdateType::Immutable {
            return Err(StagingError::ImmutableCommit { handle });
        }
        if !record.descriptor.same_type(descriptor) {
            return Err(StagingError::TypeMismatch {
                handle,
                expected: record.descriptor.type_name(),
                found: descriptor.type_name(),
            });
        }
        check_len(handle, &region, bytes)?;

        let target = match self.kind {
            PoolKind::Mutable => self.write,
            _ => region.half,
        };
        self.halves[target]
            .slice_mut(region.offset, region.len)
            .copy_from_slice(bytes);
        record.dirty = true;
        record.touched = true;
        Ok(())
    }

    pub fn region(&self, handle: BlockHandle) -> Result<Region, StagingError> {
        self.lookup(handle).copied()
    }

    /// The bytes of a block in the requested half.
    pub fn bytes(
        &self,
        handle: BlockHandle,
        half: BufferHalf,
    ) -> Result<&[u8], StagingError> {
        let region = self.lookup(handle)?;
        let arena = match (self.kind, half) {
            (PoolKind::Mutable, BufferHalf::Write) => self.write,
            (PoolKind::Mutable, BufferHalf::Read) => 1 - self.write,
            _ => region.half,
        };
        Ok(self.halves[arena].slice(region.offset, region.len))
    }

    pub fn record(&self, handle: BlockHandle) -> Result<&BlockRecord, StagingError> {
        self.lookup(handle)?;
        self.registry
            .get(&handle)
            .ok_or(StagingError::UnknownHandle { handle })
    }

    /// Release a block.
    ///
    /// Permanent bytes are never reclaimed. Single-frame bytes are zeroed
    /// and the handle is unlinked from the index.
    pub fn deallocate(&mut self, handle: BlockHandle) -> Result<Deallocation, StagingError> {
        if self.kind == PoolKind::SingleFrame {
            if handle.epoch() < self.epoch || self.released.contains(&handle) {
                return Ok(Deallocation::AlreadyReleased);
            }
            let region = self
                .index
                .remove(&handle)
                .ok_or(StagingError::UnknownHandle { handle })?;
            self.halves[region.half].zero(region.offset, region.len);
            self.registry.remove(&handle);
            self.released.insert(handle);
            return Ok(Deallocation::Released);
        }

        if !self.index.contains_key(&handle) {
            return Err(StagingError::UnknownHandle { handle });
        }
        match self.registry.remove(&handle) {
            Some(_) => Ok(Deallocation::Released),
            None => Ok(Deallocation::AlreadyReleased),
        }
    }

    /// Clear the dirty flag of every registered block, returning the
    /// handles that had it set, in creation order.
    pub fn take_dirty(&mut self) -> Vec<BlockHandle> {
        self.registry
            .iter_mut()
            .filter(|(_, record)| record.dirty)
            .map(|(handle, record)| {
                record.dirty = false;
                *handle
            })
            .collect()
    }

    /// Flip read/write parity.
    ///
    /// Blocks committed since the last swap have their bytes carried into
    /// the new write half, so a block reads back its last commit on every
    /// later frame until it is committed again.
    pub fn swap(&mut self) {
        if !self.kind.is_double_buffered() {
            return;
        }
        let finished = self.write;
        self.write = 1 - finished;

        if self.kind != PoolKind::Mutable {
            return;
        }
        for (handle, record) in self.registry.iter_mut() {
            if !record.touched {
                continue;
            }
            record.touched = false;
            if let Some(region) = self.index.get(handle) {
                copy_region(&mut self.halves, finished, region.offset, region.len);
            }
        }
    }

    /// Drop every single-frame block and truncate both halves to zero.
    ///
    /// Returns the handles that were still live, in creation order.
    pub fn end_frame(&mut self) -> Vec<BlockHandle> {
        let mut live: Vec<BlockHandle> = self.index.keys().copied().collect();
        live.sort();
        self.index.clear();
        self.registry.clear();
        self.released.clear();
        for arena in self.halves.iter_mut() {
            arena.reset();
        }
        self.epoch += 1;
        live
    }

    /// Byte length of a half.
    #[cfg(test)]
    pub fn arena_len(&self, half: usize) -> usize {
        self.halves[half].len()
    }

    pub fn stats(&self) -> PoolStats {
        let arena_bytes = match self.kind {
            PoolKind::SingleFrame => self.halves[0].len() + self.halves[1].len(),
            _ => self.halves[0].len(),
        };
        PoolStats {
            live_blocks: self.registry.len(),
            regions: self.index.len(),
            arena_bytes,
            reserved_bytes: self.halves[0].capacity() + self.halves[1].capacity(),
        }
    }

    fn lookup(&self, handle: BlockHandle) -> Result<&Region, StagingError> {
        if handle.pool() == PoolKind::SingleFrame && handle.epoch() < self.epoch {
            return Err(StagingError::StaleHandle {
                handle,
                current_epoch: self.epoch,
            });
        }
        self.index
            .get(&handle)
            .ok_or(StagingError::UnknownHandle { handle })
    }
}

fn check_len(handle: BlockHandle, region: &Region, bytes: &[u8]) -> Result<(), StagingError> {
    if bytes.len() != region.len {
        return Err(StagingError::SizeMismatch {
            handle,
            expected: region.len,
            found: bytes.len(),
        });
    }
    Ok(())
}
