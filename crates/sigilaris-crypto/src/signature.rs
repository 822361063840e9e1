use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey};
use subtle::{Choice, ConstantTimeEq, ConstantTimeLess};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::hash::Hash32;
use crate::keypair::{KeyPair, PublicKey};

/// secp256k1 curve order `n`.
pub const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// `halfN = floor(n / 2)`.
pub const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// `Signature{v, r, s}`: `v = 27 + recId`, `r`/`s` are 32-byte big-endian
/// scalars with `s` already normalized to Low-S.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

/// Constant-time check that `s <= SECP256K1_HALF_ORDER`.
fn is_low_s(s: &[u8; 32]) -> bool {
    let mut eq = Choice::from(1u8);
    for i in 0..32 {
        eq &= s[i].ct_eq(&SECP256K1_HALF_ORDER[i]);
    }
    bool::from(eq) || lexicographic_lt(s, &SECP256K1_HALF_ORDER)
}

/// Constant-time big-endian lexicographic `<`, scanning every byte
/// regardless of where the two arrays first differ.
fn lexicographic_lt(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let mut lt = Choice::from(0u8);
    let mut eq_so_far = Choice::from(1u8);
    for i in 0..32 {
        let byte_lt = a[i].ct_lt(&b[i]);
        let byte_eq = a[i].ct_eq(&b[i]);
        lt |= eq_so_far & byte_lt;
        eq_so_far &= byte_eq;
    }
    lt.into()
}

/// `n - s`, computed as the scalar field's additive inverse of `s` (the
/// curve order itself cannot be represented as a scalar, since scalars are
/// taken mod `n`, but `-s mod n` is exactly `n - s` for `0 < s < n`).
fn invert_s(s: &[u8; 32]) -> [u8; 32] {
    let s_scalar = k256::Scalar::from_repr((*s).into());
    let s_scalar =
        Option::<k256::Scalar>::from(s_scalar).expect("s already validated as a curve scalar");
    let diff = -s_scalar;
    let mut out = [0u8; 32];
    out.copy_from_slice(&diff.to_bytes());
    out
}

/// Deterministically sign `hash` (RFC 6979 over SHA-256, delegated to
/// `k256`), normalize to Low-S, and search for the smallest recovery id
/// that reproduces the signer's own public key.
pub fn sign(keypair: &KeyPair, hash: &Hash32) -> Result<Signature, CryptoError> {
    let (sig, rec_id): (K256Signature, RecoveryId) = keypair
        .signing_key()
        .sign_prehash_recoverable(hash)
        .map_err(|e| CryptoError::CryptoFailure {
            msg: format!("signing failed: {e}"),
        })?;

    let sig_bytes = sig.to_bytes();
    let mut r = [0u8; 32];
    let mut s_prime = [0u8; 32];
    r.copy_from_slice(&sig_bytes[..32]);
    s_prime.copy_from_slice(&sig_bytes[32..]);

    let (s, flip_parity) = if is_low_s(&s_prime) {
        (s_prime, false)
    } else {
        (invert_s(&s_prime), true)
    };
    s_prime.zeroize();

    let base_rec_id = rec_id.to_byte();
    let parity = if flip_parity {
        base_rec_id ^ 1
    } else {
        base_rec_id
    };

    let expected = keypair.public_key();
    for rec_id_candidate in [parity, parity ^ 1] {
        if let Ok(candidate) = try_recover(&r, &s, rec_id_candidate, hash) {
            if candidate == expected {
                return Ok(Signature {
                    v: 27 + rec_id_candidate,
                    r,
                    s,
                });
            }
        }
    }

    Err(CryptoError::CredentialsError)
}

fn try_recover(
    r: &[u8; 32],
    s: &[u8; 32],
    rec_id: u8,
    hash: &Hash32,
) -> Result<PublicKey, CryptoError> {
    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(r);
    sig_bytes[32..].copy_from_slice(s);
    let sig = K256Signature::from_slice(&sig_bytes).map_err(|e| CryptoError::DecodeFailure {
        msg: format!("invalid r/s: {e}"),
    })?;
    let recovery_id = RecoveryId::from_byte(rec_id).ok_or_else(|| CryptoError::DecodeFailure {
        msg: format!("invalid recovery id byte {rec_id}"),
    })?;
    let verifying_key = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id)
        .map_err(|e| CryptoError::CryptoFailure {
            msg: format!("recovery failed: {e}"),
        })?;
    Ok(PublicKey::from_verifying_key(verifying_key))
}

/// `Recover(sig, hash)`. `v - 27` gives the recovery id; `s` is normalized to
/// Low-S first, flipping the recovery id's parity bit to compensate (negating
/// `s` negates `R`'s y-coordinate, so the recovery id's low bit must flip
/// along with it). The curve-point reconstruction and the `n·R = O` sanity
/// check are `k256`'s `recover_from_prehash`, which performs exactly the
/// x-coordinate decompression and scalar arithmetic this operation calls for.
pub fn recover(sig: &Signature, hash: &Hash32) -> Result<PublicKey, CryptoError> {
    if sig.v < 27 || sig.v > 30 {
        return Err(CryptoError::DecodeFailure {
            msg: format!("v must be 27..=30, got {}", sig.v),
        });
    }
    crate::cache::cached_recover(sig, hash, |sig, hash| {
        let base_rec_id = sig.v - 27;
        let (s, rec_id) = if is_low_s(&sig.s) {
            (sig.s, base_rec_id)
        } else {
            (invert_s(&sig.s), base_rec_id ^ 1)
        };
        try_recover(&sig.r, &s, rec_id, hash)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::keccak256;

    #[test]
    fn sign_produces_low_s_and_recover_roundtrips() {
        // Signing with a small, fixed private scalar against a fixed message hash.
        let mut d = [0u8; 32];
        d[31] = 1;
        let kp = KeyPair::from_private(&d).unwrap();
        let h = keccak256(b"hello");

        let sig = sign(&kp, &h).unwrap();
        assert!(is_low_s(&sig.s));

        let recovered = recover(&sig, &h).unwrap();
        assert_eq!(recovered, kp.public_key());
    }

    #[test]
    fn recover_rejects_out_of_range_v() {
        let sig = Signature {
            v: 99,
            r: [1u8; 32],
            s: [1u8; 32],
        };
        assert!(recover(&sig, &[0u8; 32]).is_err());
    }

    #[test]
    fn recover_accepts_either_s_form() {
        // Property #8: recover(sig_highS, h) = recover(sig_lowS, h).
        let mut d = [0u8; 32];
        d[31] = 5;
        let kp = KeyPair::from_private(&d).unwrap();
        let h = keccak256(b"either s form");

        let sig_low = sign(&kp, &h).unwrap();
        assert!(is_low_s(&sig_low.s));

        // Flip to the High-S form with the matching recovery-id parity.
        let flipped_rec_id = (sig_low.v - 27) ^ 1;
        let sig_high = Signature {
            v: 27 + flipped_rec_id,
            r: sig_low.r,
            s: invert_s(&sig_low.s),
        };
        assert!(!is_low_s(&sig_high.s));

        let recovered_low = recover(&sig_low, &h).unwrap();
        let recovered_high = recover(&sig_high, &h).unwrap();
        assert_eq!(recovered_low, kp.public_key());
        assert_eq!(recovered_high, recovered_low);
    }

    #[test]
    fn is_low_s_boundary() {
        assert!(is_low_s(&{
            let mut s = SECP256K1_HALF_ORDER;
            s[31] -= 1;
            s
        }));
        // s == halfN is still Low-S under the `s <= halfN` rule.
        assert!(is_low_s(&SECP256K1_HALF_ORDER));
        assert!(!is_low_s(&{
            let mut s = SECP256K1_HALF_ORDER;
            s[31] += 1;
            s
        }));
    }
}
