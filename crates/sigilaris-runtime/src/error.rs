use sigilaris_crypto::CryptoError;
use sigilaris_store::StoreError;
use thiserror::Error;

/// Failures from mounting, routing, and executing a transaction against the
/// module runtime. Wraps the lower layers' error kinds (`CryptoFailure`,
/// the trie/store kinds) and adds the runtime's own routing and
/// authorization failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A mount-time proof failed, or a `needs` projection is missing from
    /// a peer's mounted schema.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Signature recovery failed, or a recovered key does not satisfy the
    /// Accounts pre-checks (not registered, expired, guardian mismatch).
    /// The message is deliberately generic, so as not to reveal which
    /// authorization step failed.
    #[error("authorization failed")]
    Unauthorized,

    #[error("signature processing failed: {0}")]
    Crypto(#[from] CryptoError),

    /// No child blueprint in a `ComposedBlueprint` claims the leading path
    /// segment of a transaction's module path.
    #[error("no module mounted at path segment {0:?}")]
    UnroutableModule(String),

    /// The module path named a module, but not a transaction type it
    /// recognizes.
    #[error("module {module:?} does not recognize transaction type {tx_type:?}")]
    UnrecognizedTransaction { module: String, tx_type: String },

    /// A transaction's access log exceeded the runtime's configured caps.
    #[error("access log exceeded its quota: {reads} reads (max {max_reads}), {writes} writes (max {max_writes})")]
    LimitExceeded {
        reads: usize,
        max_reads: usize,
        writes: usize,
        max_writes: usize,
    },
}
