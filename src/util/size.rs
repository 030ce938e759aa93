//! Byte-size helpers for pool capacities and stats output.

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// `n` kibibytes in bytes.
#[inline]
pub const fn kb(n: usize) -> usize {
    n << 10
}

/// `n` mebibytes in bytes.
#[inline]
pub const fn mb(n: usize) -> usize {
    n << 20
}

/// Render a byte count with a binary unit, e.g. `"1.50 KB"`.
///
/// Whole bytes are printed without decimals.
pub fn format_bytes(bytes: usize) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}
