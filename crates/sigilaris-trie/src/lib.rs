//! Hexary Merkle-Patricia trie: content-addressed nodes, path compression,
//! incremental diff-tracked mutation, and lazy in-order/reverse streaming.
//!
//! The trie never talks to persistent storage itself — it reads through a
//! [`NodeStore`] collaborator and accumulates writes in a [`TrieState`]'s
//! `diff`, leaving promotion of that diff into durable storage to a
//! separate commit step outside this crate.

mod config;
mod error;
mod nibbles;
mod node;
mod store;
mod stream;
mod trie;

pub use config::TrieConfig;
pub use error::TrieError;
pub use nibbles::Nibbles;
pub use node::{Children, Node};
pub use store::{MemoryNodeStore, NodeStore};
pub use stream::{reverse_stream_from, stream_from, TrieStream};
pub use trie::{get, put, rebase, remove, TrieState};

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn arb_key() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 1..4)
    }

    proptest! {
        /// Trie correctness: the root hash is a
        /// function of the contained key/value map alone, independent of
        /// insertion order.
        #[test]
        fn root_is_independent_of_insertion_order(
            pairs in prop::collection::vec((arb_key(), prop::collection::vec(any::<u8>(), 0..8)), 1..12)
        ) {
            let store = MemoryNodeStore::new();
            let config = TrieConfig::default();

            // Dedup by key, last write wins, matching a plain map's semantics.
            let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
            for (k, v) in &pairs {
                model.insert(k.clone(), v.clone());
            }

            let mut forward = TrieState::empty();
            for (k, v) in &pairs {
                forward = put(forward, &store, &config, &Nibbles::from_bytes(k), v).unwrap();
            }

            let mut reversed = TrieState::empty();
            for (k, v) in pairs.iter().rev() {
                reversed = put(reversed, &store, &config, &Nibbles::from_bytes(k), v).unwrap();
            }

            prop_assert_eq!(forward.root, reversed.root);

            for (k, v) in &model {
                prop_assert_eq!(
                    get(&forward, &store, &config, &Nibbles::from_bytes(k)).unwrap(),
                    Some(v.clone())
                );
            }
        }

        /// Streaming order: ascending and
        /// visits-each-key-exactly-once.
        #[test]
        fn stream_from_start_is_sorted_and_complete(
            pairs in prop::collection::vec((arb_key(), prop::collection::vec(any::<u8>(), 0..8)), 0..12)
        ) {
            let store = MemoryNodeStore::new();
            let config = TrieConfig::default();
            let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
            let mut state = TrieState::empty();
            for (k, v) in &pairs {
                model.insert(k.clone(), v.clone());
                state = put(state, &store, &config, &Nibbles::from_bytes(k), v).unwrap();
            }

            let streamed: Vec<_> = stream_from(&state, &store, Nibbles::empty())
                .map(|r| r.unwrap())
                .collect();

            prop_assert_eq!(streamed.len(), model.len());
            let mut prev: Option<Nibbles> = None;
            for (key, _) in &streamed {
                if let Some(p) = &prev {
                    prop_assert!(p < key);
                }
                prev = Some(key.clone());
            }
        }
    }
}
