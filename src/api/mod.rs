//! Public API for stagealloc.
//!
//! This module contains all user-facing types and functions.
//! Most users should only interact with [`StagingAllocator`](alloc::StagingAllocator)
//! and [`Block`](block::Block).

pub mod alloc;
pub mod block;
pub mod config;
pub mod error;
pub mod frame;
pub mod handle;
pub mod policy;
pub mod stats;
