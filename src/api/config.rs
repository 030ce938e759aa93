//! Allocator configuration.

use crate::api::policy::PoolKind;
use crate::util::size::{kb, mb};

/// Configuration for the staging allocator.
#[derive(Debug, Clone)]
pub struct StagingConfig {
    /// Bytes reserved up front for the immutable pool (default: 4 MB)
    pub immutable_capacity: usize,

    /// Bytes reserved up front for each half of the mutable pool (default: 1 MB)
    pub mutable_capacity: usize,

    /// Bytes reserved up front for each single-frame half (default: 256 KB)
    pub single_frame_capacity: usize,

    /// Alignment every region offset is rounded up to (default: 1, packed).
    ///
    /// Set this to the platform's uniform-buffer offset alignment when
    /// regions are bound individually. Rounded up to a power of two.
    pub region_alignment: usize,

    /// Close the registration period automatically on the first buffer swap
    pub close_registration_on_first_swap: bool,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            immutable_capacity: mb(4),
            mutable_capacity: mb(1),
            single_frame_capacity: kb(256),
            region_alignment: 1,
            close_registration_on_first_swap: false,
        }
    }
}

impl StagingConfig {
    /// Create a minimal config for testing or constrained environments.
    pub fn minimal() -> Self {
        Self {
            immutable_capacity: kb(16),
            mutable_capacity: kb(16),
            single_frame_capacity: kb(4),
            ..Self::default()
        }
    }

    /// Create a config for scenes with many blocks and large per-frame data.
    ///
    /// Regions are aligned to 256 bytes, the strictest uniform-buffer
    /// offset alignment in common use.
    pub fn high_throughput() -> Self {
        Self {
            immutable_capacity: mb(64),
            mutable_capacity: mb(16),
            single_frame_capacity: mb(8),
            region_alignment: 256,
            close_registration_on_first_swap: true,
        }
    }

    /// Builder pattern: set the reserved capacity of one pool.
    pub fn with_capacity(mut self, pool: PoolKind, bytes: usize) -> Self {
        match pool {
            PoolKind::Immutable => self.immutable_capacity = bytes,
            PoolKind::Mutable => self.mutable_capacity = bytes,
            PoolKind::SingleFrame => self.single_frame_capacity = bytes,
        }
        self
    }

    /// Builder pattern: set region alignment.
    pub fn with_region_alignment(mut self, align: usize) -> Self {
        self.region_alignment = align;
        self
    }

    /// Builder pattern: close registration on the first swap.
    pub fn with_close_on_first_swap(mut self, enable: bool) -> Self {
        self.close_registration_on_first_swap = enable;
        self
    }

    /// Reserved capacity for a pool.
    pub fn capacity(&self, pool: PoolKind) -> usize {
        match pool {
            PoolKind::Immutable => self.immutable_capacity,
            PoolKind::Mutable => self.mutable_capacity,
            PoolKind::SingleFrame => self.single_frame_capacity,
        }
    }

    /// Effective region alignment: a power of two, at least one.
    pub(crate) fn alignment(&self) -> usize {
        self.region_alignment.max(1).next_power_of_two()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = StagingConfig::minimal()
            .with_capacity(PoolKind::Mutable, kb(64))
            .with_region_alignment(0)
            .with_close_on_first_swap(true);
        assert_eq!(config.capacity(PoolKind::Mutable), kb(64));
        assert_eq!(config.capacity(PoolKind::Immutable), kb(16));
        assert_eq!(config.alignment(), 1);
        assert!(config.close_registration_on_first_swap);
    }

    #[test]
    fn test_high_throughput_aligns_regions() {
        assert_eq!(StagingConfig::high_throughput().alignment(), 256);
        assert_eq!(StagingConfig::default().alignment(), 1);
        assert_eq!(StagingConfig::default().with_region_alignment(48).alignment(), 64);
    }
}
