use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::error::CryptoError;

/// A secp256k1 keypair: `d` as a 32-byte big-endian scalar, `Q` as the
/// uncompressed point `(x ‖ y)`.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Draw `d` uniformly from `[1, n-1]` using a cryptographically secure
    /// source and compute `Q = d·G`.
    pub fn generate() -> Self {
        KeyPair {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Derive a keypair from an existing private scalar. Rejects `d = 0`
    /// and `d ≥ n` (anything `k256` itself cannot represent as a scalar).
    pub fn from_private(d: &[u8; 32]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_bytes(d.into()).map_err(|e| CryptoError::DecodeFailure {
            msg: format!("invalid private scalar: {e}"),
        })?;
        Ok(KeyPair { signing_key })
    }

    pub fn private_key_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.signing_key.to_bytes());
        out
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(*self.signing_key.verifying_key())
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

/// An uncompressed secp256k1 public key, `(x ‖ y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(pub(crate) VerifyingKey);

impl PublicKey {
    pub(crate) fn from_verifying_key(key: VerifyingKey) -> Self {
        PublicKey(key)
    }

    /// The uncompressed SEC1 point encoding, `0x04 ‖ x ‖ y` with the leading
    /// tag byte stripped, i.e. the raw 64-byte `(x ‖ y)` pair.
    pub fn to_uncompressed_xy(&self) -> [u8; 64] {
        let encoded = self.0.to_encoded_point(false);
        let mut out = [0u8; 64];
        out.copy_from_slice(&encoded.as_bytes()[1..]);
        out
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }

    /// `KeyId20`: `keccak256(publicKey)[12..32]`.
    pub fn key_id(&self) -> [u8; 20] {
        let hash = crate::hash::keccak256(&self.to_uncompressed_xy());
        let mut out = [0u8; 20];
        out.copy_from_slice(&hash[12..32]);
        out
    }
}
