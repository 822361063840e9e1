use rayon::prelude::*;

use crate::error::CryptoError;
use crate::hash::Hash32;
use crate::keypair::PublicKey;
use crate::signature::{recover, Signature};

/// Threshold below which `batch_recover` runs sequentially rather than
/// paying rayon's thread-pool dispatch cost on small batches.
pub const PARALLEL_THRESHOLD: usize = 8;

/// Recover every `(signature, hash)` pair's public key, in parallel once
/// the batch is large enough to be worth it. Each recovery is independent
/// (no shared mutable state beyond the process-wide recovery cache, which
/// is itself lock-protected), so a module runtime verifying many
/// transactions' signatures before dispatch can shard this across threads
/// without any further synchronization.
pub fn batch_recover(items: &[(Signature, Hash32)]) -> Vec<Result<PublicKey, CryptoError>> {
    if items.len() < PARALLEL_THRESHOLD {
        items.iter().map(|(sig, hash)| recover(sig, hash)).collect()
    } else {
        items.par_iter().map(|(sig, hash)| recover(sig, hash)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::keccak256;
    use crate::keypair::KeyPair;
    use crate::signature::sign;

    #[test]
    fn batch_recover_matches_individual_recovery_above_and_below_threshold() {
        for count in [2usize, PARALLEL_THRESHOLD + 4] {
            let mut items = Vec::new();
            let mut expected = Vec::new();
            for i in 0..count {
                let mut d = [0u8; 32];
                d[31] = (i + 1) as u8;
                let kp = KeyPair::from_private(&d).unwrap();
                let h = keccak256(format!("tx-{i}").as_bytes());
                let sig = sign(&kp, &h).unwrap();
                items.push((sig, h));
                expected.push(kp.public_key());
            }

            let recovered = batch_recover(&items);
            assert_eq!(recovered.len(), count);
            for (got, want) in recovered.into_iter().zip(expected) {
                assert_eq!(got.unwrap(), want);
            }
        }
    }
}
