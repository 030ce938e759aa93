//! How fatal staging misuse is.
//!
//! Debug builds always panic on errors. Release builds consult the
//! process-wide [`StrictMode`], which defaults to `Warn`: the diagnostic is
//! logged and the failing operation takes its documented fallback.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use super::kind::DiagnosticKind;

/// Name of the environment variable read by [`init_from_env`].
pub const STRICT_ENV: &str = "STAGEALLOC_STRICT";

/// What a diagnostic does after it has been logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum StrictMode {
    /// Errors fall back to a no-op (release builds only).
    #[default]
    Warn = 0,
    /// Errors panic.
    PanicOnError = 1,
    /// Errors and frame-sequencing warnings panic.
    PanicOnWarning = 2,
}

impl StrictMode {
    const ALL: [StrictMode; 3] = [
        StrictMode::Warn,
        StrictMode::PanicOnError,
        StrictMode::PanicOnWarning,
    ];

    /// Whether a diagnostic of `kind` panics under this mode.
    pub fn is_fatal(self, kind: DiagnosticKind) -> bool {
        match kind {
            DiagnosticKind::Error => cfg!(debug_assertions) || self != StrictMode::Warn,
            DiagnosticKind::Warning => self == StrictMode::PanicOnWarning,
            DiagnosticKind::Note => false,
        }
    }

    fn from_bits(bits: u8) -> Self {
        Self::ALL.get(bits as usize).copied().unwrap_or_default()
    }
}

impl FromStr for StrictMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "warn" | "off" => Ok(StrictMode::Warn),
            "1" | "error" | "errors" => Ok(StrictMode::PanicOnError),
            "2" | "warning" | "warnings" | "all" => Ok(StrictMode::PanicOnWarning),
            other => Err(format!("unknown strict mode \"{}\"", other)),
        }
    }
}

impl fmt::Display for StrictMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrictMode::Warn => "warn",
            StrictMode::PanicOnError => "error",
            StrictMode::PanicOnWarning => "warning",
        })
    }
}

static STRICT_MODE: AtomicU8 = AtomicU8::new(StrictMode::Warn as u8);

/// Set the process-wide strict mode.
pub fn set_strict_mode(mode: StrictMode) {
    STRICT_MODE.store(mode as u8, Ordering::Relaxed);
}

/// The process-wide strict mode.
pub fn strict_mode() -> StrictMode {
    StrictMode::from_bits(STRICT_MODE.load(Ordering::Relaxed))
}

/// Whether a diagnostic of `kind` panics right now.
pub(crate) fn is_fatal(kind: DiagnosticKind) -> bool {
    strict_mode().is_fatal(kind)
}

/// Restores the previous strict mode on drop.
///
/// Mostly for tests that need misuse to panic in release builds too.
#[must_use = "the mode is restored as soon as the guard is dropped"]
pub struct StrictModeGuard {
    previous: StrictMode,
}

impl StrictModeGuard {
    /// Switch to `mode` until the guard is dropped.
    pub fn new(mode: StrictMode) -> Self {
        let previous = strict_mode();
        set_strict_mode(mode);
        Self { previous }
    }
}

impl Drop for StrictModeGuard {
    fn drop(&mut self) {
        set_strict_mode(self.previous);
    }
}

/// Read the strict mode from `STAGEALLOC_STRICT`, if set.
///
/// Accepts `0`/`warn`, `1`/`error` and `2`/`warning`. Unknown values are
/// logged and leave the mode unchanged.
pub fn init_from_env() {
    let Ok(value) = std::env::var(STRICT_ENV) else {
        return;
    };
    match value.parse::<StrictMode>() {
        Ok(mode) => {
            log::debug!("{} = {}", STRICT_ENV, mode);
            set_strict_mode(mode);
        }
        Err(err) => log::warn!("ignoring {}: {}", STRICT_ENV, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("warn".parse(), Ok(StrictMode::Warn));
        assert_eq!(" ERROR ".parse(), Ok(StrictMode::PanicOnError));
        assert_eq!("2".parse(), Ok(StrictMode::PanicOnWarning));
        assert!("bogus".parse::<StrictMode>().is_err());
    }

    #[test]
    fn test_fatality_by_kind() {
        assert!(StrictMode::PanicOnError.is_fatal(DiagnosticKind::Error));
        assert!(!StrictMode::PanicOnError.is_fatal(DiagnosticKind::Warning));
        assert!(StrictMode::PanicOnWarning.is_fatal(DiagnosticKind::Warning));
        assert!(!StrictMode::PanicOnWarning.is_fatal(DiagnosticKind::Note));
        assert_eq!(StrictMode::Warn.is_fatal(DiagnosticKind::Error), cfg!(debug_assertions));
    }

    #[test]
    fn test_bits_round_trip_through_display() {
        for mode in StrictMode::ALL {
            assert_eq!(StrictMode::from_bits(mode as u8), mode);
            assert_eq!(mode.to_string().parse(), Ok(mode));
        }
        assert_eq!(StrictMode::from_bits(9), StrictMode::Warn);
    }
}
