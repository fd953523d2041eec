//! Round-trip property tests for the store codec.

use muster_core::KvsStore;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Keys and values free of the NUL separator.
fn entry_string() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[^\u{0}]{0,40}").unwrap()
}

fn entry_map() -> impl Strategy<Value = BTreeMap<String, String>> {
    proptest::collection::btree_map(entry_string(), entry_string(), 0..16)
}

proptest! {
    #[test]
    fn pack_then_unpack_reproduces_the_store(entries in entry_map()) {
        let mut original = KvsStore::new();
        for (k, v) in &entries {
            original.overwrite(k.clone(), v.clone());
        }

        let wire = original.to_wire();
        prop_assert_eq!(wire.len(), original.packed_size());

        let mut decoded = KvsStore::new();
        let merged = decoded.unpack(&wire).unwrap();

        prop_assert_eq!(merged, original.len());
        prop_assert_eq!(decoded, original);
    }

    #[test]
    fn pack_into_exact_buffer_succeeds(entries in entry_map()) {
        let mut store = KvsStore::new();
        for (k, v) in &entries {
            store.overwrite(k.clone(), v.clone());
        }

        let mut buf = vec![0u8; store.packed_size()];
        prop_assert_eq!(store.pack_into(&mut buf).unwrap(), store.packed_size());
        prop_assert_eq!(buf, store.to_wire());
    }
}
