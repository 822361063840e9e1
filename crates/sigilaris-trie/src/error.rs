use sigilaris_codec::DecodeError;
use sigilaris_crypto::Hash32;
use thiserror::Error;

/// Failures from trie operations. Missing keys are not failures — `get`
/// returns `Ok(None)` for those; this enum is reserved for malformed data
/// and the node-store collaborator being unable to produce a referenced
/// node.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrieError {
    /// A node's wire encoding (from the node store, or a base state) could
    /// not be decoded.
    #[error("corrupt trie node encoding: {0}")]
    DecodeFailure(#[from] DecodeError),

    /// A hash referenced by a node (or a state's `root`) was not found in
    /// the diff or the node store. Indicates corruption or incomplete
    /// sync, not a missing key.
    #[error("node store has no node for hash {}", hex_prefix(&.0))]
    StoreMiss(Hash32),

    /// `rebase(a, b)` was attempted between states that do not share a
    /// `base`.
    #[error("cannot rebase states with different bases")]
    DifferentBase,

    /// A traversal exceeded `TrieConfig::max_depth`, the DoS guard against
    /// pathologically deep tries.
    #[error("trie depth exceeded: max {max}")]
    DepthExceeded { max: usize },
}

fn hex_prefix(hash: &Hash32) -> String {
    hash[..4].iter().map(|b| format!("{b:02x}")).collect()
}
