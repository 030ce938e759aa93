//! Platform binding trait and upload view.
//!
//! Nothing in here depends on a graphics backend, so platform layers can
//! depend on the trait alone.

use crate::api::handle::{BlockHandle, Region};

/// Staged bytes handed to a platform hook.
///
/// Borrowed for the duration of the hook; copy out anything that must
/// outlive the call.
#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    /// The block being uploaded.
    pub handle: BlockHandle,
    /// Name the block was created with.
    pub name: &'a str,
    /// Where the bytes live in the arena.
    pub region: Region,
    /// The bytes themselves.
    pub bytes: &'a [u8],
}

impl Upload<'_> {
    /// Byte length of the upload.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the block is zero-sized.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Receiver of staged data. Installed with
/// [`StagingAllocator::set_binding`](crate::StagingAllocator::set_binding).
///
/// `on_block_created` and `on_block_released` run with no pool locked and
/// may call back into the allocator freely. `on_block_dirty` runs while the
/// mutable pool is locked: it may read any block back through the
/// allocator, but a commit, creation or destruction of a mutable block is
/// rejected with `SA104`.
pub trait PlatformBinding: Send + Sync {
    /// A block was created. Immutable and single-frame blocks are pushed
    /// only through this hook.
    fn on_block_created(&self, upload: &Upload<'_>);

    /// A mutable block was committed since the last upload. `upload.bytes`
    /// is the write half.
    fn on_block_dirty(&self, upload: &Upload<'_>);

    /// A single-frame block was destroyed, or recycled by `end_of_frame()`.
    fn on_block_released(&self, _handle: BlockHandle) {}
}
