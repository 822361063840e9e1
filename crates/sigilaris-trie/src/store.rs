use std::collections::HashMap;
use std::sync::RwLock;

use sigilaris_crypto::Hash32;

use crate::error::TrieError;
use crate::node::Node;

/// The content-addressed key→node collaborator the trie reads through but
/// never writes to directly — writes accumulate in a state's `diff`, and
/// promoting them to the store is a separate commit contract outside this
/// crate's scope.
pub trait NodeStore {
    fn get(&self, hash: &Hash32) -> Result<Option<Node>, TrieError>;
}

impl<T: NodeStore + ?Sized> NodeStore for &T {
    fn get(&self, hash: &Hash32) -> Result<Option<Node>, TrieError> {
        (**self).get(hash)
    }
}

/// An in-memory `NodeStore`, for tests and for callers who have not yet
/// wired up a persistence backend (out of scope for this crate per the
/// core specification — persistent storage is an external collaborator).
#[derive(Default)]
pub struct MemoryNodeStore {
    nodes: RwLock<HashMap<Hash32, Node>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Promote a state's diff into this store: the commit contract
    /// the commit contract this crate leaves to a separate collaborator. Entries with a
    /// positive refcount are inserted; this simple in-memory store never
    /// garbage-collects, so a zero or negative refcount is a no-op rather
    /// than a removal.
    pub fn commit(&self, entries: impl IntoIterator<Item = (Hash32, Node, i64)>) {
        let mut nodes = self.nodes.write().expect("node store lock poisoned");
        for (hash, node, ref_delta) in entries {
            if ref_delta > 0 {
                nodes.insert(hash, node);
            }
        }
    }
}

impl NodeStore for MemoryNodeStore {
    fn get(&self, hash: &Hash32) -> Result<Option<Node>, TrieError> {
        Ok(self
            .nodes
            .read()
            .expect("node store lock poisoned")
            .get(hash)
            .cloned())
    }
}
