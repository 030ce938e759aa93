//! # stagealloc
//!
//! CPU-side staging memory for data bound for GPU buffers.
//!
//! Every per-draw constant, per-frame camera block and per-instance array is
//! a [`Block`]: created from a typed value, stored type-erased in one of
//! three arena pools, and addressed by a plain [`BlockHandle`]. The platform
//! layer that owns the real graphics-API buffers is told about new and
//! dirty data through a [`PlatformBinding`].
//!
//! ## Pools
//!
//! | Lifetime    | Update    | Pool          | Storage                                  |
//! |-------------|-----------|---------------|------------------------------------------|
//! | Permanent   | Immutable | Immutable     | one arena, written once                  |
//! | Permanent   | Mutable   | Mutable       | read half + write half, flipped per frame |
//! | SingleFrame | either    | SingleFrame   | two halves, emptied every frame          |
//!
//! Permanent regions never move. Once
//! [`close_registration_period`](StagingAllocator::close_registration_period)
//! has been called the permanent arenas never grow either, so platform code
//! may cache their addresses.
//!
//! ## Frame boundary
//!
//! Once producers for a frame have joined, the frame driver calls, in order:
//!
//! 1. [`update_dirty_mutable_blocks`](StagingAllocator::update_dirty_mutable_blocks)
//! 2. [`swap_buffers`](StagingAllocator::swap_buffers)
//! 3. [`end_of_frame`](StagingAllocator::end_of_frame)
//!
//! or [`run_frame_boundary`](StagingAllocator::run_frame_boundary) for all three.
//!
//! ## Errors
//!
//! Misuse (double registration, commits to immutable blocks, type
//! mismatches, stale handles, late permanent registration) is a programmer
//! error and fatal by default. See [`diagnostics`] for the codes and the
//! strict-mode switch; every fatal call also has a `try_*` form.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stagealloc::{Block, Lifetime, RecordingBinding, StagingAllocator, UpdateType};
//!
//! let alloc = StagingAllocator::with_defaults();
//! let gpu = Arc::new(RecordingBinding::new());
//! alloc.set_binding(gpu.clone());
//!
//! // Load time
//! let camera = Block::create(
//!     &alloc,
//!     "camera",
//!     &[0.0f32; 16],
//!     UpdateType::Mutable,
//!     Lifetime::Permanent,
//! );
//! alloc.close_registration_period();
//!
//! // Game loop
//! for frame in 0..3u64 {
//!     let tint = Block::create(
//!         &alloc,
//!         "tint",
//!         &[1.0f32; 4],
//!         UpdateType::Immutable,
//!         Lifetime::SingleFrame,
//!     );
//!     camera.set_data(&[frame as f32; 16]);
//!     // ... record draws reading tint and camera ...
//!     alloc.run_frame_boundary(frame);
//!     drop(tint);
//! }
//! ```

pub mod api;
pub mod binding;
pub mod diagnostics;

#[allow(dead_code)]
mod allocators;
#[allow(dead_code)]
mod core;
#[allow(dead_code)]
mod sync;
#[allow(dead_code)]
mod util;

// Re-export public API at crate root for convenience
pub use api::alloc::StagingAllocator;
pub use api::block::Block;
pub use api::config::StagingConfig;
pub use api::error::StagingError;
pub use api::frame::{FrameBoundary, FramePhase};
pub use api::handle::{BlockHandle, Region};
pub use api::policy::{BufferHalf, Lifetime, PoolKind, UpdateType};
pub use api::stats::{PoolStats, StagingStats};
pub use crate::core::descriptor::TypeDescriptor;

// Platform binding seam
pub use binding::{BindingEvent, PlatformBinding, RecordingBinding, Upload};

// Diagnostics
pub use diagnostics::{Diagnostic, DiagnosticKind, StrictMode};

// Size helpers for configuration
pub use util::size::{format_bytes, kb, mb};
