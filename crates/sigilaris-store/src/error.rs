use sigilaris_codec::DecodeError;
use sigilaris_trie::TrieError;
use thiserror::Error;

/// Failures surfaced by the table/schema layer and the store effect.
///
/// Missing keys are not failures — table `get` returns `Ok(None)`; this
/// enum covers malformed data, the trie's own failure modes, logical
/// preconditions a reducer rejected (nonce mismatch, already exists, a
/// non-empty disband), and access-log quota violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A stored value's bytes could not be decoded as the table's `V`.
    #[error("corrupt stored value: {0}")]
    DecodeFailure(#[from] DecodeError),

    /// The trie collaborator itself failed (corrupt node, depth exceeded,
    /// rebase mismatch).
    #[error(transparent)]
    TrieFailure(#[from] TrieError),

    /// A reducer-level logical precondition was violated: already exists,
    /// nonce mismatch, non-empty disband, and similar "found the row but
    /// the invariant doesn't hold" failures.
    #[error("{0}")]
    Logical(String),

    /// A mount-time schema validation failed (duplicate table name, a
    /// `needs` projection referencing an unmounted table).
    #[error("{0}")]
    Schema(String),

    /// A transaction's access log grew past the runtime's configured caps.
    #[error(
        "access log exceeded its quota: {reads} reads (max {max_reads}), {writes} writes (max {max_writes})"
    )]
    LimitExceeded {
        reads: usize,
        max_reads: usize,
        writes: usize,
        max_writes: usize,
    },
}

impl StoreError {
    pub fn logical(msg: impl Into<String>) -> Self {
        StoreError::Logical(msg.into())
    }
}
