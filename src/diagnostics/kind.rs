//! Diagnostic kinds and core types.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An invariant violation. Fatal unless assertions are compiled out.
    Error,
    /// Misuse that leaves the allocator consistent, such as frame-driver
    /// calls out of the documented order.
    Warning,
    /// Additional context about another diagnostic.
    Note,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `SA0xx` - Registration and allocation
/// - `SA1xx` - Commits and type checks
/// - `SA2xx` - Handle lookup
/// - `SA3xx` - Frame sequencing
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "SA001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    /// Whether this diagnostic describes an invariant violation.
    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }
}

// =============================================================================
// SA0xx - Registration and allocation
// =============================================================================

/// SA001: A block handle was registered twice.
pub const SA001: Diagnostic = Diagnostic::error(
    "SA001",
    "block handle registered twice"
).with_note("each handle maps to exactly one region in exactly one pool")
 .with_help("create a new Block instead of re-registering an existing handle");

/// SA002: Permanent registration after the cutover.
pub const SA002: Diagnostic = Diagnostic::error(
    "SA002",
    "permanent block registered after the registration period was closed"
).with_note("immutable and mutable arenas must not grow once addresses may be cached")
 .with_help("create permanent blocks during load, or use Lifetime::SingleFrame");

/// SA003: A handle that already owns a region was allocated again.
pub const SA003: Diagnostic = Diagnostic::error(
    "SA003",
    "region already allocated for this handle"
).with_note("regions are bump-allocated once and never move");

// =============================================================================
// SA1xx - Commits and type checks
// =============================================================================

/// SA101: Commit to an immutable block.
pub const SA101: Diagnostic = Diagnostic::error(
    "SA101",
    "commit to an immutable block"
).with_note("immutable blocks are written exactly once, at creation")
 .with_help("create the block with UpdateType::Mutable if it changes after creation");

/// SA102: Commit with a different type than the block was created with.
pub const SA102: Diagnostic = Diagnostic::error(
    "SA102",
    "block written with a mismatched type"
).with_help("set_data must be called with the same type the block was created from");

/// SA103: Commit whose byte length differs from the block's region.
pub const SA103: Diagnostic = Diagnostic::error(
    "SA103",
    "committed byte length does not match the block's region"
);

/// SA104: A platform hook tried to mutate the pool it was called from.
pub const SA104: Diagnostic = Diagnostic::error(
    "SA104",
    "pool mutated from inside a platform binding hook"
).with_note("hooks run while the pool is locked and may only read from it")
 .with_help("defer the write until the hook has returned");

// =============================================================================
// SA2xx - Handle lookup
// =============================================================================

/// SA201: Unknown or released handle.
pub const SA201: Diagnostic = Diagnostic::error(
    "SA201",
    "unknown block handle"
).with_note("the handle was never registered, or its block has been released");

/// SA202: Single-frame handle used after its frame ended.
pub const SA202: Diagnostic = Diagnostic::error(
    "SA202",
    "single-frame block accessed after its frame ended"
).with_note("single-frame storage is recycled by end_of_frame()")
 .with_help("recreate single-frame data every frame instead of caching handles");

// =============================================================================
// SA3xx - Frame sequencing
// =============================================================================

/// SA301: Buffers swapped twice for the same frame.
pub const SA301: Diagnostic = Diagnostic::warning(
    "SA301",
    "swap_buffers called with a frame number that was already swapped"
).with_note("the double buffer must flip exactly once per frame boundary");

/// SA302: End of frame before the buffers were swapped.
pub const SA302: Diagnostic = Diagnostic::warning(
    "SA302",
    "end_of_frame called before swap_buffers for this frame"
).with_help("call update_dirty_mutable_blocks, swap_buffers, end_of_frame in that order");

/// SA303: Dirty upload between swap and end of frame.
pub const SA303: Diagnostic = Diagnostic::warning(
    "SA303",
    "dirty blocks uploaded after swap_buffers in the same frame"
).with_note("uploads after the swap read next frame's write half");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_kinds() {
        assert!(SA001.is_error());
        assert!(SA202.is_error());
        assert!(!SA301.is_error());
        assert_eq!(SA302.kind.prefix(), "warning");
        assert!(SA101.help.is_some());
    }
}
