use thiserror::Error;

/// Failure to decode a byte string into a typed value.
///
/// This is the concrete shape of the `DecodeFailure` error kind from the
/// core error taxonomy — every other crate in the workspace that needs to
/// surface a decode failure wraps one of these rather than inventing its
/// own variant set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ran out before a value's encoding was fully consumed.
    #[error("unexpected end of input, needed at least {needed} more byte(s)")]
    UnexpectedEof { needed: usize },

    /// A length or tag byte encoded a value outside the domain this codec
    /// supports (e.g. a `BigNat` length prefix too large to fit a `usize`).
    #[error("invalid tag or length: {msg}")]
    InvalidTag { msg: String },

    /// `decode` was called on a buffer with trailing bytes the caller did
    /// not expect to remain (used by top-level callers that require an
    /// exact-length parse; mid-stream `decode` calls ignore this).
    #[error("trailing {extra} unexpected byte(s) after decoding")]
    TrailingBytes { extra: usize },
}

impl DecodeError {
    pub fn eof(needed: usize) -> Self {
        DecodeError::UnexpectedEof { needed }
    }

    pub fn invalid_tag(msg: impl Into<String>) -> Self {
        DecodeError::InvalidTag { msg: msg.into() }
    }
}
