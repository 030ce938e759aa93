//! Diagnostics for allocator misuse.
//!
//! Every invariant violation is reported as a coded diagnostic. Errors are
//! fatal unless debug assertions are off and strict mode is `Warn`, in which
//! case the operation logs and falls back to a no-op.
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                        |
//! |-------|--------------------------------|
//! | SA0xx | Registration and allocation    |
//! | SA1xx | Commits and type checks        |
//! | SA2xx | Handle lookup                  |
//! | SA3xx | Frame sequencing               |

pub mod context;
pub mod emit;
pub mod kind;
pub mod strict;

pub use context::DiagContext;
pub use emit::{emit, suppress_diagnostics};
pub use kind::{Diagnostic, DiagnosticKind};
pub use strict::{
    init_from_env, set_strict_mode, strict_mode, StrictMode, StrictModeGuard, STRICT_ENV,
};

pub use kind::{SA001, SA002, SA003, SA101, SA102, SA103, SA104, SA201, SA202, SA301, SA302, SA303};
