use thiserror::Error;

/// Failures from the hash/ECDSA kernel, matching the taxonomy of the
/// abstract error kinds (`DecodeFailure`, `CryptoFailure`,
/// `CredentialsError`) rather than bubbling up raw `k256` error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Input bytes were the wrong length or otherwise not a well-formed
    /// scalar/point encoding.
    #[error("malformed cryptographic input: {msg}")]
    DecodeFailure { msg: String },

    /// A signing or recovery invariant was violated (e.g. `n·R ≠ O`, or the
    /// recovered point did not match the expected signer).
    #[error("cryptographic invariant violated: {msg}")]
    CryptoFailure { msg: String },

    /// `sign` searched every candidate recovery id and none recovered the
    /// signer's own public key.
    #[error("no recovery id reproduced the signer's public key")]
    CredentialsError,
}
