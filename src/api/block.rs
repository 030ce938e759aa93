//! Typed handle wrapper for staged data.
//!
//! A [`Block`] is strongly typed at creation and type-erased at rest: the
//! bytes live in the allocator, and the block keeps only its handle and the
//! descriptor of the type it was created from. Typed writes and reads are
//! checked against that descriptor.

use std::mem::size_of;

use bytemuck::Pod;

use crate::api::alloc::StagingAllocator;
use crate::api::handle::BlockHandle;
use crate::api::policy::{BufferHalf, Lifetime, PoolKind, UpdateType};
use crate::core::descriptor::TypeDescriptor;

/// A named, typed chunk of staged data.
///
/// Destroyed on drop. Single-frame blocks may outlive their frame: dropping
/// them afterwards is a no-op, but reading them is fatal.
///
/// # Example
///
/// ```rust,no_run
/// use stagealloc::{Block, Lifetime, StagingAllocator, UpdateType};
///
/// let alloc = StagingAllocator::with_defaults();
/// let tint = Block::create(
///     &alloc,
///     "tint",
///     &[1.0f32, 0.5, 0.25, 1.0],
///     UpdateType::Mutable,
///     Lifetime::Permanent,
/// );
///
/// tint.set_data(&[0.0f32, 0.0, 0.0, 1.0]);
/// assert_eq!(tint.read::<[f32; 4]>(), [1.0, 0.5, 0.25, 1.0]);
///
/// alloc.swap_buffers(0);
/// assert_eq!(tint.read::<[f32; 4]>(), [0.0, 0.0, 0.0, 1.0]);
/// ```
pub struct Block {
    allocator: StagingAllocator,
    handle: Option<BlockHandle>,
    name: String,
    update: UpdateType,
    lifetime: Lifetime,
    descriptor: TypeDescriptor,
}

impl Block {
    /// Stage a copy of `data`.
    ///
    /// Fatal if `lifetime` is permanent and registration has been closed.
    pub fn create<T: Pod>(
        allocator: &StagingAllocator,
        name: &str,
        data: &T,
        update: UpdateType,
        lifetime: Lifetime,
    ) -> Self {
        let descriptor = TypeDescriptor::of::<T>();
        Self::register(allocator, name, descriptor, update, lifetime, bytemuck::bytes_of(data))
    }

    /// Stage the first `num_elements` of `elements`, each padded to
    /// `element_byte_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `element_byte_size < size_of::<T>()` or
    /// `elements.len() < num_elements`.
    pub fn create_from_array<T: Pod>(
        allocator: &StagingAllocator,
        name: &str,
        elements: &[T],
        element_byte_size: usize,
        num_elements: usize,
        update: UpdateType,
        lifetime: Lifetime,
    ) -> Self {
        assert!(
            element_byte_size >= size_of::<T>(),
            "element stride {} is smaller than {} ({} bytes)",
            element_byte_size,
            std::any::type_name::<T>(),
            size_of::<T>()
        );
        assert!(
            elements.len() >= num_elements,
            "{} elements requested from a slice of {}",
            num_elements,
            elements.len()
        );
        let descriptor = TypeDescriptor::array_of::<T>(element_byte_size, num_elements);
        let staged = pack(&elements[..num_elements], element_byte_size);
        Self::register(allocator, name, descriptor, update, lifetime, &staged)
    }

    fn register(
        allocator: &StagingAllocator,
        name: &str,
        descriptor: TypeDescriptor,
        update: UpdateType,
        lifetime: Lifetime,
        bytes: &[u8],
    ) -> Self {
        let handle = allocator.register_and_allocate(name, descriptor, update, lifetime, bytes);
        Self {
            allocator: allocator.clone(),
            handle: Some(handle),
            name: name.to_owned(),
            update,
            lifetime,
            descriptor,
        }
    }

    /// Commit a new value.
    ///
    /// Fatal if the block is immutable or `T` is not its creation type.
    pub fn set_data<T: Pod>(&self, data: &T) {
        self.allocator.commit(
            self.live_handle(),
            &TypeDescriptor::of::<T>(),
            bytemuck::bytes_of(data),
        );
    }

    /// Commit new elements to an array block, at the block's stride.
    ///
    /// Fatal if the element count or type differs from creation.
    pub fn set_array_data<T: Pod>(&self, elements: &[T]) {
        let stride = self.descriptor.element_size().max(size_of::<T>());
        let staged = pack(elements, stride);
        self.allocator.commit(
            self.live_handle(),
            &TypeDescriptor::array_of::<T>(stride, elements.len()),
            &staged,
        );
    }

    /// Read the current value from the read half.
    pub fn read<T: Pod>(&self) -> T {
        self.allocator.read(self.live_handle())
    }

    /// Read the elements of an array block from the read half.
    pub fn read_array<T: Pod>(&self) -> Vec<T> {
        self.allocator.read_array(self.live_handle())
    }

    /// Run `f` over the block's bytes in the read half.
    pub fn with_data<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        self.allocator.with_bytes(self.live_handle(), BufferHalf::Read, f)
    }

    /// Copy of the block's bytes in the read half.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.allocator.to_vec(self.live_handle(), BufferHalf::Read)
    }

    /// Size of the staged data in bytes.
    pub fn data_size(&self) -> usize {
        self.allocator.data_size(self.live_handle())
    }

    /// Whether the block was committed since the last dirty upload.
    pub fn is_dirty(&self) -> bool {
        self.allocator.is_dirty(self.live_handle())
    }

    /// The handle, or `None` once destroyed.
    pub fn handle(&self) -> Option<BlockHandle> {
        self.handle
    }

    /// Name the block was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn update_type(&self) -> UpdateType {
        self.update
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Descriptor of the type the block was created from.
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Pool the block's bytes live in.
    pub fn pool(&self) -> PoolKind {
        PoolKind::route(self.update, self.lifetime)
    }

    /// Release the block. Later calls are no-ops.
    pub fn destroy(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.allocator.deallocate(handle);
        }
    }

    /// Handle for allocator calls; a destroyed block resolves to nothing.
    fn live_handle(&self) -> BlockHandle {
        self.handle
            .unwrap_or_else(|| BlockHandle::dangling(self.pool()))
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        if std::thread::panicking() {
            if let Some(handle) = self.handle.take() {
                let _ = self.allocator.try_deallocate(handle);
            }
            return;
        }
        self.destroy();
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .field("update", &self.update)
            .field("lifetime", &self.lifetime)
            .field("type", &self.descriptor.type_name())
            .finish()
    }
}

/// Lay elements out `stride` bytes apart, zero-padding each.
fn pack<T: Pod>(elements: &[T], stride: usize) -> Vec<u8> {
    let mut staged = vec![0u8; stride * elements.len()];
    for (chunk, element) in staged.chunks_exact_mut(stride.max(1)).zip(elements) {
        chunk[..size_of::<T>()].copy_from_slice(bytemuck::bytes_of(element));
    }
    staged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::config::StagingConfig;

    fn alloc() -> StagingAllocator {
        StagingAllocator::new(StagingConfig::minimal())
    }

    #[test]
    fn test_round_trip() {
        let alloc = alloc();
        let block = Block::create(
            &alloc,
            "color",
            &[0.25f32, 0.5, 0.75, 1.0],
            UpdateType::Immutable,
            Lifetime::Permanent,
        );
        assert_eq!(block.read::<[f32; 4]>(), [0.25, 0.5, 0.75, 1.0]);
        assert_eq!(block.data_size(), 16);
        assert_eq!(block.pool(), PoolKind::Immutable);
        assert!(!block.is_dirty());
    }

    #[test]
    fn test_array_padding() {
        let alloc = alloc();
        let block = Block::create_from_array(
            &alloc,
            "ids",
            &[1u32, 2, 3, 4],
            8,
            3,
            UpdateType::Mutable,
            Lifetime::Permanent,
        );
        assert_eq!(block.data_size(), 24);
        assert_eq!(block.read_array::<u32>(), vec![1, 2, 3]);

        let bytes = block.to_bytes();
        assert_eq!(&bytes[4..8], &[0u8; 4]);

        block.set_array_data(&[7u32, 8, 9]);
        assert!(block.is_dirty());
        alloc.swap_buffers(0);
        assert_eq!(block.read_array::<u32>(), vec![7, 8, 9]);
    }

    #[test]
    #[should_panic(expected = "element stride")]
    fn test_array_stride_too_small() {
        let alloc = alloc();
        let _ = Block::create_from_array(
            &alloc,
            "bad",
            &[1u64],
            4,
            1,
            UpdateType::Immutable,
            Lifetime::Permanent,
        );
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let alloc = alloc();
        let mut block = Block::create(
            &alloc,
            "once",
            &7u32,
            UpdateType::Mutable,
            Lifetime::SingleFrame,
        );
        assert!(block.handle().is_some());
        block.destroy();
        block.destroy();
        assert!(block.handle().is_none());
        assert_eq!(alloc.stats().single_frame.live_blocks, 0);
    }

    #[test]
    fn test_pack_layout() {
        let staged = pack(&[0x0102u16, 0x0304], 4);
        assert_eq!(staged.len(), 8);
        assert_eq!(&staged[2..4], &[0, 0]);
        assert_eq!(&staged[4..6], &0x0304u16.to_ne_bytes());
    }
}
