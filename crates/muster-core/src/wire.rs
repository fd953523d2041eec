//! Bounds-checked reading of the flat key/value wire format.
//!
//! Serialized stores are a run of NUL-terminated strings. There is no
//! count prefix and no per-entry length, so decoding must never scan past
//! the declared end of the buffer; [`WireCursor`] enforces that.

use thiserror::Error;

/// Errors produced while encoding or decoding a serialized store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The destination buffer cannot hold the packed store.
    #[error("destination buffer too small: need {needed} bytes, have {capacity}")]
    InsufficientCapacity {
        /// Exact number of bytes packing requires.
        needed: usize,
        /// Capacity the caller supplied.
        capacity: usize,
    },

    /// A string ran past the declared end of the buffer before its
    /// terminator, or the buffer ended mid-entry.
    #[error("malformed buffer: unterminated string at offset {offset}")]
    Malformed {
        /// Byte offset at which the bad string started.
        offset: usize,
    },

    /// A decoded string was not valid UTF-8.
    #[error("malformed buffer: invalid utf-8 at offset {offset}")]
    InvalidUtf8 {
        /// Byte offset at which the bad string started.
        offset: usize,
    },
}

/// Result alias for wire operations.
pub type WireResult<T> = Result<T, WireError>;

/// Forward-only reader over a serialized store.
///
/// Every read is checked against the slice boundary; a missing terminator
/// yields [`WireError::Malformed`] instead of a scan past the end.
#[derive(Debug)]
pub struct WireCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireCursor<'a> {
    /// Wrap `buf`, positioned at its first byte.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// True once the declared length has been fully consumed.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Read one NUL-terminated string, consuming its terminator.
    pub fn read_str(&mut self) -> WireResult<&'a str> {
        let start = self.pos;
        let rest = &self.buf[start..];
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(WireError::Malformed { offset: start })?;
        let s = std::str::from_utf8(&rest[..nul])
            .map_err(|_| WireError::InvalidUtf8 { offset: start })?;
        self.pos = start + nul + 1;
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_consecutive_strings() {
        let mut cursor = WireCursor::new(b"abc\0de\0");

        assert_eq!(cursor.read_str(), Ok("abc"));
        assert_eq!(cursor.read_str(), Ok("de"));
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn empty_string_is_just_a_terminator() {
        let mut cursor = WireCursor::new(b"\0");

        assert_eq!(cursor.read_str(), Ok(""));
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn missing_terminator_reports_offset() {
        let mut cursor = WireCursor::new(b"ok\0trailing");

        assert_eq!(cursor.read_str(), Ok("ok"));
        assert_eq!(cursor.read_str(), Err(WireError::Malformed { offset: 3 }));
    }

    #[test]
    fn read_past_end_fails() {
        let mut cursor = WireCursor::new(b"");
        assert_eq!(cursor.read_str(), Err(WireError::Malformed { offset: 0 }));
    }
}
