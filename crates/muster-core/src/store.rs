//! The ordered key/value store exchanged at the barrier.

use crate::wire::{WireCursor, WireError, WireResult};
use std::collections::BTreeMap;

/// An ordered string-to-string store.
///
/// Iteration is lexicographic by key, which makes the serialized byte
/// layout deterministic: the same entry set always packs to the same
/// buffer. Each rendezvous process holds two of these, a staging store
/// filled by `put` and a committed store merged globally at the barrier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvsStore {
    entries: BTreeMap<String, String>,
}

impl KvsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert only if `key` is absent; returns whether the insertion
    /// happened. An existing value is never replaced by this call.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        use std::collections::btree_map::Entry;
        match self.entries.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Insert or replace unconditionally.
    pub fn overwrite(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Exact byte cost of packing the current store: for every entry,
    /// key and value each contribute their length plus one terminator.
    /// Zero for an empty store.
    pub fn packed_size(&self) -> usize {
        self.entries
            .iter()
            .map(|(k, v)| k.len() + 1 + v.len() + 1)
            .sum()
    }

    /// Pack the store into `buf` and return the bytes written, which
    /// always equals [`packed_size`](Self::packed_size).
    ///
    /// Entries are written in key order as a NUL-terminated key followed
    /// by a NUL-terminated value. Fails without writing when `buf` is too
    /// small. A key or value containing an embedded NUL is a caller bug,
    /// not a recoverable codec fault.
    pub fn pack_into(&self, buf: &mut [u8]) -> WireResult<usize> {
        let needed = self.packed_size();
        if buf.len() < needed {
            return Err(WireError::InsufficientCapacity {
                needed,
                capacity: buf.len(),
            });
        }

        let mut pos = 0;
        for (key, value) in &self.entries {
            debug_assert!(!key.as_bytes().contains(&0), "key contains NUL");
            debug_assert!(!value.as_bytes().contains(&0), "value contains NUL");
            for s in [key, value] {
                buf[pos..pos + s.len()].copy_from_slice(s.as_bytes());
                pos += s.len();
                buf[pos] = 0;
                pos += 1;
            }
        }
        Ok(pos)
    }

    /// Pack the store into a freshly allocated buffer.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.packed_size());
        for (key, value) in &self.entries {
            debug_assert!(!key.as_bytes().contains(&0), "key contains NUL");
            debug_assert!(!value.as_bytes().contains(&0), "value contains NUL");
            buf.extend_from_slice(key.as_bytes());
            buf.push(0);
            buf.extend_from_slice(value.as_bytes());
            buf.push(0);
        }
        buf
    }

    /// Merge a serialized store into this one, returning the number of
    /// entries merged.
    ///
    /// `buf` is parsed strictly as alternating NUL-terminated key/value
    /// strings until its declared length is exhausted. Decoded pairs
    /// overwrite existing keys unconditionally; within one buffer the
    /// last occurrence of a duplicate key wins. Fails with
    /// [`WireError::Malformed`] when a string runs past the end or the
    /// buffer ends after a key with no value, leaving any entries merged
    /// before the fault in place.
    pub fn unpack(&mut self, buf: &[u8]) -> WireResult<usize> {
        let mut cursor = WireCursor::new(buf);
        let mut merged = 0;
        while !cursor.is_exhausted() {
            let key = cursor.read_str()?;
            let value = cursor.read_str()?;
            self.entries.insert(key.to_owned(), value.to_owned());
            merged += 1;
        }
        Ok(merged)
    }
}

impl IntoIterator for KvsStore {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_size_empty_is_zero() {
        assert_eq!(KvsStore::new().packed_size(), 0);
    }

    #[test]
    fn packed_size_counts_terminators() {
        let mut store = KvsStore::new();
        store.insert("a", "bb");

        // "a\0" + "bb\0"
        assert_eq!(store.packed_size(), 5);
    }

    #[test]
    fn insert_is_first_write_wins() {
        let mut store = KvsStore::new();

        assert!(store.insert("k", "v1"));
        assert!(!store.insert("k", "v2"));
        assert_eq!(store.get("k"), Some("v1"));
    }

    #[test]
    fn overwrite_replaces() {
        let mut store = KvsStore::new();
        store.insert("k", "v1");
        store.overwrite("k", "v2");

        assert_eq!(store.get("k"), Some("v2"));
    }

    #[test]
    fn pack_writes_entries_in_key_order() {
        let mut store = KvsStore::new();
        store.insert("b", "2");
        store.insert("a", "1");

        assert_eq!(store.to_wire(), b"a\x001\x00b\x002\x00");
    }

    #[test]
    fn pack_into_returns_packed_size() {
        let mut store = KvsStore::new();
        store.insert("key", "value");
        let mut buf = vec![0u8; store.packed_size()];

        assert_eq!(store.pack_into(&mut buf), Ok(store.packed_size()));
        assert_eq!(buf, store.to_wire());
    }

    #[test]
    fn pack_into_rejects_short_buffer() {
        let mut store = KvsStore::new();
        store.insert("key", "value");
        let mut buf = vec![0u8; store.packed_size() - 1];

        assert_eq!(
            store.pack_into(&mut buf),
            Err(WireError::InsufficientCapacity {
                needed: store.packed_size(),
                capacity: store.packed_size() - 1,
            })
        );
    }

    #[test]
    fn unpack_merges_with_overwrite() {
        let mut store = KvsStore::new();
        store.insert("k", "old");

        let merged = store.unpack(b"k\0new\0other\0x\0").unwrap();

        assert_eq!(merged, 2);
        assert_eq!(store.get("k"), Some("new"));
        assert_eq!(store.get("other"), Some("x"));
    }

    #[test]
    fn unpack_duplicate_key_last_wins() {
        let mut store = KvsStore::new();

        store.unpack(b"k\0v1\0k\0v2\0").unwrap();

        assert_eq!(store.get("k"), Some("v2"));
    }

    #[test]
    fn unpack_rejects_unterminated_value() {
        let mut store = KvsStore::new();

        assert_eq!(
            store.unpack(b"key\0dangling"),
            Err(WireError::Malformed { offset: 4 })
        );
    }

    #[test]
    fn unpack_rejects_key_with_no_value() {
        let mut store = KvsStore::new();

        assert_eq!(
            store.unpack(b"lonely\0"),
            Err(WireError::Malformed { offset: 7 })
        );
    }

    #[test]
    fn unpack_empty_buffer_is_noop() {
        let mut store = KvsStore::new();

        assert_eq!(store.unpack(b""), Ok(0));
        assert!(store.is_empty());
    }
}
