//! Diagnostic emission backend.
//!
//! Every diagnostic goes to the `log` facade. Debug builds (or the
//! `diagnostics` feature) also print a rustc-style report to stderr.
//! Errors then panic according to the strict mode.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use super::context::DiagContext;
use super::kind::{Diagnostic, DiagnosticKind};
use super::strict::is_fatal;

/// Global flag to suppress stderr output (for testing).
static STDERR_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Suppress the stderr report. Logging is unaffected.
pub fn suppress_diagnostics(suppress: bool) {
    STDERR_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Check if the stderr report is suppressed.
pub fn is_suppressed() -> bool {
    STDERR_SUPPRESSED.load(Ordering::Relaxed)
}

/// Emit a diagnostic with runtime context and a detail line.
///
/// Returns normally when the diagnostic is not fatal under the current
/// strict mode; the caller then takes its documented fallback path.
pub fn emit(diag: &Diagnostic, context: &DiagContext, detail: &str) {
    emit_to_log(diag, context, detail);

    #[cfg(any(debug_assertions, feature = "diagnostics"))]
    {
        if !is_suppressed() {
            emit_to_stderr(diag, context, detail);
        }
    }

    if is_fatal(diag.kind) {
        panic!(
            "[stagealloc][{}] {}: {}\nContext: {}",
            diag.code, diag.message, detail, context
        );
    }
}

fn emit_to_log(diag: &Diagnostic, context: &DiagContext, detail: &str) {
    match diag.kind {
        DiagnosticKind::Error => {
            log::error!("[{}] {}: {} ({})", diag.code, diag.message, detail, context);
        }
        DiagnosticKind::Warning => {
            log::warn!("[{}] {}: {} ({})", diag.code, diag.message, detail, context);
        }
        DiagnosticKind::Note => {
            log::info!("[{}] {}: {} ({})", diag.code, diag.message, detail, context);
        }
    }

    if let Some(note) = diag.note {
        log::debug!("  note: {}", note);
    }
    if let Some(help) = diag.help {
        log::debug!("  help: {}", help);
    }
}

/// Internal: emit to stderr with context.
#[cfg(any(debug_assertions, feature = "diagnostics"))]
fn emit_to_stderr(diag: &Diagnostic, context: &DiagContext, detail: &str) {
    let mut stderr = std::io::stderr();

    let _ = writeln!(
        stderr,
        "[stagealloc][{}] {}: {}",
        diag.code,
        diag.kind.prefix(),
        diag.message
    );
    let _ = writeln!(stderr, "  detail: {}", detail);
    let _ = writeln!(stderr, "  context: {}", context);

    if let Some(note) = diag.note {
        let _ = writeln!(stderr, "  note: {}", note);
    }

    if let Some(help) = diag.help {
        let _ = writeln!(stderr, "  help: {}", help);
    }

    let _ = writeln!(stderr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::kind::{SA201, SA301};

    #[test]
    fn test_suppression_flag() {
        suppress_diagnostics(true);
        assert!(is_suppressed());
        suppress_diagnostics(false);
        assert!(!is_suppressed());
    }

    #[test]
    fn test_warning_returns() {
        let ctx = DiagContext::capture(Some(1), None);
        emit(&SA301, &ctx, "frame 1 swapped twice");
    }

    #[test]
    #[should_panic(expected = "[stagealloc][SA201]")]
    fn test_error_panics_in_debug() {
        if !cfg!(debug_assertions) {
            panic!("[stagealloc][SA201] forced in release test build");
        }
        let ctx = DiagContext::capture(None, None);
        emit(&SA201, &ctx, "Block#1");
    }
}
