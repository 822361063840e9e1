/// Tunable DoS-protection limits for trie traversal, following the
/// teacher's `StateConfig` pattern of surfacing per-subsystem limits as a
/// small `Default`-able struct rather than hard-coded constants.
#[derive(Clone, Copy, Debug)]
pub struct TrieConfig {
    /// Upper bound on the number of nibbles a single `put`/`get`/`remove`
    /// traversal may descend before `TrieError::DepthExceeded` is raised.
    pub max_depth: usize,
}

impl Default for TrieConfig {
    fn default() -> Self {
        TrieConfig { max_depth: 256 }
    }
}
