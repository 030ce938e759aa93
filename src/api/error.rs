//! Invariant violations reported by the allocator.

use std::error::Error;
use std::fmt;

use crate::api::handle::BlockHandle;
use crate::api::policy::PoolKind;
use crate::diagnostics::{self, Diagnostic};

/// An allocator invariant violation.
///
/// The plain operations treat these as fatal; the `try_*` forms hand them
/// back to the caller instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StagingError {
    /// The handle is already in the registry.
    DuplicateRegistration {
        /// The offending handle.
        handle: BlockHandle,
    },
    /// Permanent registration after `close_registration_period()`.
    RegistrationClosed {
        /// Name of the block being created.
        name: String,
        /// Pool the block would have grown.
        pool: PoolKind,
    },
    /// The handle already owns a region.
    AlreadyAllocated {
        /// The offending handle.
        handle: BlockHandle,
    },
    /// Commit to an immutable block.
    ImmutableCommit {
        /// The offending handle.
        handle: BlockHandle,
    },
    /// Commit with a type other than the one captured at creation.
    TypeMismatch {
        /// The offending handle.
        handle: BlockHandle,
        /// Type the block was created from.
        expected: &'static str,
        /// Type supplied at the call site.
        found: &'static str,
    },
    /// Commit whose byte length differs from the region.
    SizeMismatch {
        /// The offending handle.
        handle: BlockHandle,
        /// Region length in bytes.
        expected: usize,
        /// Supplied length in bytes.
        found: usize,
    },
    /// A platform hook tried to mutate the pool it was called from.
    ReentrantMutation {
        /// Pool that was locked.
        pool: PoolKind,
    },
    /// The handle was never registered, or has been released.
    UnknownHandle {
        /// The offending handle.
        handle: BlockHandle,
    },
    /// A single-frame handle used after its frame ended.
    StaleHandle {
        /// The offending handle.
        handle: BlockHandle,
        /// Current single-frame epoch.
        current_epoch: u64,
    },
}

impl StagingError {
    /// The coded diagnostic for this violation.
    pub fn diagnostic(&self) -> &'static Diagnostic {
        match self {
            Self::DuplicateRegistration { .. } => &diagnostics::SA001,
            Self::RegistrationClosed { .. } => &diagnostics::SA002,
            Self::AlreadyAllocated { .. } => &diagnostics::SA003,
            Self::ImmutableCommit { .. } => &diagnostics::SA101,
            Self::TypeMismatch { .. } => &diagnostics::SA102,
            Self::SizeMismatch { .. } => &diagnostics::SA103,
            Self::ReentrantMutation { .. } => &diagnostics::SA104,
            Self::UnknownHandle { .. } => &diagnostics::SA201,
            Self::StaleHandle { .. } => &diagnostics::SA202,
        }
    }

    /// The pool the violating call targeted.
    pub fn pool(&self) -> PoolKind {
        match self {
            Self::DuplicateRegistration { handle }
            | Self::AlreadyAllocated { handle }
            | Self::ImmutableCommit { handle }
            | Self::TypeMismatch { handle, .. }
            | Self::SizeMismatch { handle, .. }
            | Self::UnknownHandle { handle }
            | Self::StaleHandle { handle, .. } => handle.pool(),
            Self::RegistrationClosed { pool, .. } | Self::ReentrantMutation { pool } => *pool,
        }
    }
}

impl fmt::Display for StagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRegistration { handle } => {
                write!(f, "{handle} is already registered")
            }
            Self::RegistrationClosed { name, pool } => {
                write!(f, "cannot register \"{name}\" in the {pool} pool: registration is closed")
            }
            Self::AlreadyAllocated { handle } => {
                write!(f, "{handle} already owns a region")
            }
            Self::ImmutableCommit { handle } => {
                write!(f, "{handle} is immutable")
            }
            Self::TypeMismatch {
                handle,
                expected,
                found,
            } => {
                write!(f, "{handle} holds {expected}, written with {found}")
            }
            Self::SizeMismatch {
                handle,
                expected,
                found,
            } => {
                write!(f, "{handle} is {expected} bytes, commit supplied {found}")
            }
            Self::ReentrantMutation { pool } => {
                write!(f, "the {pool} pool is being read by a platform hook")
            }
            Self::UnknownHandle { handle } => {
                write!(f, "{handle} is not registered")
            }
            Self::StaleHandle {
                handle,
                current_epoch,
            } => {
                write!(
                    f,
                    "{handle} was created in frame epoch {}, current epoch is {current_epoch}",
                    handle.epoch()
                )
            }
        }
    }
}

impl Error for StagingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let h = BlockHandle::new(3, PoolKind::Immutable, 0);
        assert_eq!(StagingError::ImmutableCommit { handle: h }.diagnostic().code, "SA101");
        assert_eq!(StagingError::UnknownHandle { handle: h }.diagnostic().code, "SA201");
        let closed = StagingError::RegistrationClosed {
            name: "camera".into(),
            pool: PoolKind::Mutable,
        };
        assert_eq!(closed.diagnostic().code, "SA002");
        assert_eq!(closed.pool(), PoolKind::Mutable);
    }

    #[test]
    fn test_display() {
        let h = BlockHandle::new(9, PoolKind::SingleFrame, 2);
        let err = StagingError::StaleHandle {
            handle: h,
            current_epoch: 3,
        };
        assert_eq!(
            err.to_string(),
            "Block#9(single-frame@2) was created in frame epoch 2, current epoch is 3"
        );
    }
}
