use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

use lru::LruCache;

use crate::error::CryptoError;
use crate::hash::Hash32;
use crate::keypair::PublicKey;
use crate::signature::Signature;

const DEFAULT_CAPACITY: usize = 4_096;

/// Process-wide toggle for recovery caching: controls lazy caching of
/// computed affine coordinates and curve-point views; default on.
/// Disabling it is useful for benchmarking raw recovery cost or for a host
/// that wants to bound memory strictly.
static CACHE_ENABLED: AtomicBool = AtomicBool::new(true);

pub fn set_cache_enabled(enabled: bool) {
    CACHE_ENABLED.store(enabled, Ordering::SeqCst);
}

pub fn cache_enabled() -> bool {
    CACHE_ENABLED.load(Ordering::SeqCst)
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct RecoveryKey {
    v: u8,
    r: [u8; 32],
    s: [u8; 32],
    hash: Hash32,
}

static RECOVERY_CACHE: OnceLock<Mutex<LruCache<RecoveryKey, PublicKey>>> = OnceLock::new();

fn recovery_cache() -> &'static Mutex<LruCache<RecoveryKey, PublicKey>> {
    RECOVERY_CACHE
        .get_or_init(|| Mutex::new(LruCache::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap())))
}

/// Recover `sig`'s public key, consulting the process-wide LRU cache first
/// when caching is enabled. The cache stores the *result* of the curve-point
/// reconstruction a fresh `recover` call would otherwise redo for a
/// signature seen before (e.g. the same transaction re-verified by a second
/// module, or rebroadcast in a mempool) — this is the "curve-point view" the
/// spec's cache policy toggle governs.
pub(crate) fn cached_recover(
    sig: &Signature,
    hash: &Hash32,
    recover_fn: impl FnOnce(&Signature, &Hash32) -> Result<PublicKey, CryptoError>,
) -> Result<PublicKey, CryptoError> {
    if !cache_enabled() {
        return recover_fn(sig, hash);
    }
    let key = RecoveryKey {
        v: sig.v,
        r: sig.r,
        s: sig.s,
        hash: *hash,
    };
    if let Some(hit) = recovery_cache().lock().expect("recovery cache mutex poisoned").get(&key) {
        return Ok(*hit);
    }
    let result = recover_fn(sig, hash)?;
    recovery_cache()
        .lock()
        .expect("recovery cache mutex poisoned")
        .put(key, result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::keccak256;
    use crate::keypair::KeyPair;
    use crate::signature::sign;

    #[test]
    fn cached_recover_matches_direct_recover() {
        let mut d = [0u8; 32];
        d[31] = 42;
        let kp = KeyPair::from_private(&d).unwrap();
        let h = keccak256(b"cache me");
        let sig = sign(&kp, &h).unwrap();

        set_cache_enabled(true);
        let a = crate::signature::recover(&sig, &h).unwrap();
        let b = crate::signature::recover(&sig, &h).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, kp.public_key());
    }

    #[test]
    fn disabling_the_cache_still_recovers_correctly() {
        let mut d = [0u8; 32];
        d[31] = 43;
        let kp = KeyPair::from_private(&d).unwrap();
        let h = keccak256(b"no cache");
        let sig = sign(&kp, &h).unwrap();

        set_cache_enabled(false);
        let recovered = crate::signature::recover(&sig, &h).unwrap();
        assert_eq!(recovered, kp.public_key());
        set_cache_enabled(true);
    }
}
