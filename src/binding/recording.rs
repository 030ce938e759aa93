//! In-memory platform binding for testing.
//!
//! Mirrors every upload into a `Vec<u8>` per handle, the way a real binding
//! would mirror them into GPU buffers.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::traits::{PlatformBinding, Upload};
use crate::api::handle::BlockHandle;

/// One hook invocation, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingEvent {
    /// `on_block_created`
    Created(BlockHandle),
    /// `on_block_dirty`
    Dirty(BlockHandle),
    /// `on_block_released`
    Released(BlockHandle),
}

/// A binding that stores the last uploaded bytes of every block.
#[derive(Debug, Default)]
pub struct RecordingBinding {
    buffers: Mutex<HashMap<BlockHandle, Vec<u8>>>,
    upload_counts: Mutex<HashMap<BlockHandle, usize>>,
    events: Mutex<Vec<BindingEvent>>,
}

impl RecordingBinding {
    /// Create an empty binding.
    pub fn new() -> Self {
        Self::default()
    }

    /// The mirrored bytes of a block, if it has been uploaded and not released.
    pub fn buffer(&self, handle: BlockHandle) -> Option<Vec<u8>> {
        self.buffers.lock().get(&handle).cloned()
    }

    /// Times a block has been pushed by `on_block_dirty`.
    pub fn upload_count(&self, handle: BlockHandle) -> usize {
        self.upload_counts.lock().get(&handle).copied().unwrap_or(0)
    }

    /// Number of mirrored buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Every hook invocation so far.
    pub fn events(&self) -> Vec<BindingEvent> {
        self.events.lock().clone()
    }

    /// Forget recorded events, keeping the mirrored buffers.
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    fn mirror(&self, upload: &Upload<'_>) {
        self.buffers
            .lock()
            .insert(upload.handle, upload.bytes.to_vec());
    }
}

impl PlatformBinding for RecordingBinding {
    fn on_block_created(&self, upload: &Upload<'_>) {
        self.mirror(upload);
        self.events.lock().push(BindingEvent::Created(upload.handle));
    }

    fn on_block_dirty(&self, upload: &Upload<'_>) {
        self.mirror(upload);
        *self.upload_counts.lock().entry(upload.handle).or_insert(0) += 1;
        self.events.lock().push(BindingEvent::Dirty(upload.handle));
    }

    fn on_block_released(&self, handle: BlockHandle) {
        self.buffers.lock().remove(&handle);
        self.events.lock().push(BindingEvent::Released(handle));
    }
}
