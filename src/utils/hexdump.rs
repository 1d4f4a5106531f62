//! Bounded hex rendering of frame bytes.
//!
//! Runtime errors in the handler pipeline log the frame being processed.
//! Frames can be large, so dumps are truncated to a configured cap with an
//! elision marker carrying the true length.

use std::fmt::Write;

/// Render `data` as space-separated hex pairs, truncated to `max_bytes`.
pub fn dump(data: &[u8], max_bytes: usize) -> String {
    let shown = data.len().min(max_bytes);
    let mut out = String::with_capacity(shown * 3 + 24);

    for (i, byte) in data[..shown].iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // write! to a String cannot fail
        let _ = write!(out, "{byte:02x}");
    }

    if data.len() > shown {
        let _ = write!(out, " .. ({} bytes total)", data.len());
    }
    out
}
