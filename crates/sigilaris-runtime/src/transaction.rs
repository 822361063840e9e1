use sigilaris_crypto::{keccak256, Hash32};

use crate::types::{AccountSignature, Envelope};

/// A transaction at the wire boundary, before a specific module decodes
/// `payload` into its own typed transaction struct. `module_path` is the
/// full path a `ComposedBlueprint` router peels segments off of to find
/// the leaf reducer; `payload` is already `encode(tx)` for whatever
/// module-specific struct the leaf reducer expects, so the signing hash
/// is simply `keccak256(payload)` rather than a second encoding pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTransaction {
    pub module_path: Vec<String>,
    pub tx_type: String,
    pub payload: Vec<u8>,
    pub envelope: Envelope,
    pub signature: AccountSignature,
}

impl RawTransaction {
    pub fn tx_hash(&self) -> Hash32 {
        keccak256(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Account;
    use sigilaris_codec::Instant;
    use sigilaris_crypto::Signature;

    #[test]
    fn tx_hash_is_deterministic_over_the_payload_bytes() {
        let tx = RawTransaction {
            module_path: vec!["accounts".to_string()],
            tx_type: "CreateNamedAccount".to_string(),
            payload: b"fields".to_vec(),
            envelope: Envelope {
                network_id: 1,
                created_at: Instant::from_epoch_millis(0),
                memo: None,
            },
            signature: AccountSignature {
                account: Account::Named("alice".to_string()),
                sig: Signature {
                    v: 27,
                    r: [0u8; 32],
                    s: [0u8; 32],
                },
            },
        };
        assert_eq!(tx.tx_hash(), keccak256(b"fields"));
    }
}
