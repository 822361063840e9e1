//! Deterministic binary codec for every value type that crosses the trie
//! boundary or enters a hash preimage.
//!
//! `encode` is a pure function of the value: equal values always produce
//! bit-identical output, independent of insertion order for the canonical
//! collection wrappers. This is the property the trie and the crypto kernel
//! both lean on — a node's hash is `keccak256` of its encoded bytes, and two
//! semantically equal values must hash identically regardless of how they
//! were built.
//!
//! Not RLP-compatible: the single-byte range is `0..=128` rather than
//! `0..=127`, and list/set/map length prefixes count elements, not
//! serialized byte length.

mod bignat;
mod canonical;
mod collection;
mod error;
mod primitive;
mod traits;
mod tuple;

pub use bignat::{BigInt, BigNat};
pub use canonical::{CanonicalMap, CanonicalSet};
pub use error::DecodeError;
pub use primitive::Instant;
pub use traits::{Decode, Encode};
