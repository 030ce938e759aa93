//! Frame boundary sequencing.
//!
//! The frame driver is expected to call, once per frame:
//! `update_dirty_mutable_blocks()`, `swap_buffers(n)`, `end_of_frame()`.
//! [`FrameTracker`] follows those calls and reports order violations as
//! warnings. The operations themselves always run.

use crate::diagnostics::{Diagnostic, SA301, SA302, SA303};

/// Where the current frame is in the boundary sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePhase {
    /// Producers are creating and committing blocks.
    #[default]
    Build,
    /// Dirty mutable blocks were pushed to the platform.
    Uploaded,
    /// Buffers were swapped; single-frame data is still live.
    Swapped,
}

/// Outcome of [`run_frame_boundary`](crate::StagingAllocator::run_frame_boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBoundary {
    /// Frame number passed to `swap_buffers`.
    pub frame_number: u64,
    /// Dirty mutable blocks pushed to the platform.
    pub uploaded: usize,
    /// Single-frame blocks recycled.
    pub released: usize,
}

/// Sequencing state, guarded by the allocator.
#[derive(Debug, Default)]
pub(crate) struct FrameTracker {
    phase: FramePhase,
    last_swapped: Option<u64>,
}

impl FrameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Last frame number passed to `swap_buffers`.
    pub fn last_frame(&self) -> Option<u64> {
        self.last_swapped
    }

    pub fn on_upload(&mut self) -> Option<&'static Diagnostic> {
        if self.phase == FramePhase::Swapped {
            return Some(&SA303);
        }
        self.phase = FramePhase::Uploaded;
        None
    }

    pub fn on_swap(&mut self, frame_number: u64) -> Option<&'static Diagnostic> {
        let repeated = matches!(self.last_swapped, Some(last) if frame_number <= last);
        self.phase = FramePhase::Swapped;
        if repeated {
            return Some(&SA301);
        }
        self.last_swapped = Some(frame_number);
        None
    }

    pub fn on_end_of_frame(&mut self) -> Option<&'static Diagnostic> {
        let skipped_swap = self.phase != FramePhase::Swapped;
        self.phase = FramePhase::Build;
        skipped_swap.then_some(&SA302)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(diag: Option<&'static Diagnostic>) -> Option<&'static str> {
        diag.map(|d| d.code)
    }

    #[test]
    fn test_in_order_frames_are_silent() {
        let mut tracker = FrameTracker::new();
        for frame in 1..=3 {
            assert_eq!(code(tracker.on_upload()), None);
            assert_eq!(code(tracker.on_swap(frame)), None);
            assert_eq!(tracker.phase(), FramePhase::Swapped);
            assert_eq!(code(tracker.on_end_of_frame()), None);
            assert_eq!(tracker.phase(), FramePhase::Build);
        }
        assert_eq!(tracker.last_frame(), Some(3));
    }

    #[test]
    fn test_repeated_swap() {
        let mut tracker = FrameTracker::new();
        assert_eq!(code(tracker.on_swap(5)), None);
        assert_eq!(code(tracker.on_swap(5)), Some("SA301"));
        assert_eq!(code(tracker.on_swap(4)), Some("SA301"));
        assert_eq!(tracker.last_frame(), Some(5));
    }

    #[test]
    fn test_end_without_swap() {
        let mut tracker = FrameTracker::new();
        tracker.on_upload();
        assert_eq!(code(tracker.on_end_of_frame()), Some("SA302"));
    }

    #[test]
    fn test_upload_after_swap() {
        let mut tracker = FrameTracker::new();
        tracker.on_swap(0);
        assert_eq!(code(tracker.on_upload()), Some("SA303"));
        assert_eq!(tracker.phase(), FramePhase::Swapped);
    }
}
