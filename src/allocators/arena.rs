//! Byte arena - growable bump allocator for staged block data.
//!
//! Regions are appended at the tail and never individually freed; the whole
//! arena is truncated back to zero when its pool is reset.

use crate::util::layout::align_up;

/// A growable bump arena of zero-initialised bytes.
///
/// Growth may relocate the backing storage, so raw pointers into an arena
/// are only stable while nothing is allocated from it.
pub struct ByteArena {
    data: Vec<u8>,
}

impl ByteArena {
    /// Create an empty arena with `capacity` bytes reserved up front.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Bump-allocate `len` zeroed bytes at the next `align` boundary.
    ///
    /// Returns the start offset. Padding bytes are zeroed as well.
    pub fn alloc(&mut self, len: usize, align: usize) -> usize {
        let offset = align_up(self.data.len(), align);
        self.data.resize(offset + len, 0);
        offset
    }

    /// Get a shared slice at the given offset and length.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len` exceeds the arena's length.
    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }

    /// Get a mutable slice at the given offset and length.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len` exceeds the arena's length.
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.data[offset..offset + len]
    }

    /// Overwrite a region with zeroes.
    pub fn zero(&mut self, offset: usize, len: usize) {
        self.slice_mut(offset, len).fill(0);
    }

    /// Truncate to zero length, keeping the reserved capacity.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Bytes handed out so far, including alignment padding.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been allocated since the last reset.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reserved capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }
}

/// Copy `len` bytes at `offset` from one arena of a pair into the other.
pub fn copy_region(arenas: &mut [ByteArena; 2], from: usize, offset: usize, len: usize) {
    let [first, second] = arenas;
    let (src, dst) = if from == 0 { (first, second) } else { (second, first) };
    dst.slice_mut(offset, len)
        .copy_from_slice(src.slice(offset, len));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_offsets_are_packed() {
        let mut arena = ByteArena::new(64);
        assert_eq!(arena.alloc(4, 1), 0);
        assert_eq!(arena.alloc(8, 1), 4);
        assert_eq!(arena.alloc(12, 1), 12);
        assert_eq!(arena.len(), 24);
    }

    #[test]
    fn test_aligned_offsets() {
        let mut arena = ByteArena::new(0);
        assert_eq!(arena.alloc(4, 256), 0);
        assert_eq!(arena.alloc(4, 256), 256);
        assert_eq!(arena.len(), 260);
        assert!(arena.slice(4, 252).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_alloc_is_zeroed_after_reset() {
        let mut arena = ByteArena::new(16);
        let off = arena.alloc(8, 1);
        arena.slice_mut(off, 8).fill(0xAB);
        arena.reset();
        assert!(arena.is_empty());
        let off = arena.alloc(8, 1);
        assert!(arena.slice(off, 8).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut arena = ByteArena::new(1024);
        arena.alloc(512, 1);
        arena.reset();
        assert!(arena.capacity() >= 1024);
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn test_copy_region_between_halves() {
        let mut pair = [ByteArena::new(8), ByteArena::new(8)];
        for arena in pair.iter_mut() {
            arena.alloc(8, 1);
        }
        pair[1].slice_mut(2, 4).copy_from_slice(&[1, 2, 3, 4]);
        copy_region(&mut pair, 1, 2, 4);
        assert_eq!(pair[0].slice(0, 8), &[0, 0, 1, 2, 3, 4, 0, 0]);
    }
}
