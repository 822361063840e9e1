//! Keccak-256 and secp256k1 ECDSA kernel.
//!
//! `keccak256` pools a reusable digest object per thread; `sign`/`recover`
//! delegate curve arithmetic to `k256` while keeping the Low-S
//! canonicalization and recovery-id search the module runtime's signature
//! checks depend on.

mod batch;
mod cache;
mod error;
mod hash;
mod keypair;
mod signature;

pub use batch::{batch_recover, PARALLEL_THRESHOLD};
pub use cache::{cache_enabled, set_cache_enabled};
pub use error::CryptoError;
pub use hash::{keccak256, Hash32};
pub use keypair::{KeyPair, PublicKey};
pub use signature::{recover, sign, Signature, SECP256K1_HALF_ORDER, SECP256K1_ORDER};
