//! Length limits enforced on namespace names, keys, and values.

use serde::{Deserialize, Serialize};

/// Default maximum for names, keys, and values, including the trailing
/// NUL the wire format appends to each string.
pub const DEFAULT_MAX_LEN: usize = 256;

/// Configurable length limits for the rendezvous key/value space.
///
/// Each limit counts the NUL terminator, so the default of 256 admits up
/// to 255 visible characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum namespace-name length.
    pub max_name_len: usize,
    /// Maximum key length.
    pub max_key_len: usize,
    /// Maximum value length.
    pub max_value_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_len: DEFAULT_MAX_LEN,
            max_key_len: DEFAULT_MAX_LEN,
            max_value_len: DEFAULT_MAX_LEN,
        }
    }
}

impl Limits {
    /// True when `name` fits within the namespace-name limit.
    pub fn name_fits(&self, name: &str) -> bool {
        name.len() < self.max_name_len
    }

    /// True when `key` fits within the key limit.
    pub fn key_fits(&self, key: &str) -> bool {
        key.len() < self.max_key_len
    }

    /// True when `value` fits within the value limit.
    pub fn value_fits(&self, value: &str) -> bool {
        value.len() < self.max_value_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_admit_255_chars() {
        let limits = Limits::default();
        let s255 = "x".repeat(255);
        let s256 = "x".repeat(256);

        assert!(limits.key_fits(&s255));
        assert!(!limits.key_fits(&s256));
        assert!(limits.value_fits(&s255));
        assert!(!limits.value_fits(&s256));
        assert!(limits.name_fits(&s255));
        assert!(!limits.name_fits(&s256));
    }
}
