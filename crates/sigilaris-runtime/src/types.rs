use sigilaris_codec::{Decode, DecodeError, Encode, Instant};
use sigilaris_crypto::{keccak256, CryptoError, PublicKey, Signature};

/// `keccak256(publicKey)[12..32]`'s 20-byte identifier.
pub type KeyId20 = [u8; 20];

pub fn key_id_of(public_key: &PublicKey) -> KeyId20 {
    public_key.key_id()
}

/// A tagged union identifying who signed a transaction: either a
/// registered name, or a bare key identity with no name attached.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Account {
    Named(String),
    Unnamed(KeyId20),
}

impl Encode for Account {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Account::Named(name) => {
                out.push(0);
                name.encode(out);
            }
            Account::Unnamed(key_id) => {
                out.push(1);
                key_id.encode(out);
            }
        }
    }
}

impl Decode for Account {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (tag, rest) = u8::decode(buf)?;
        match tag {
            0 => {
                let (name, rest) = String::decode(rest)?;
                Ok((Account::Named(name), rest))
            }
            1 => {
                let (key_id, rest) = <[u8; 20]>::decode(rest)?;
                Ok((Account::Unnamed(key_id), rest))
            }
            other => Err(DecodeError::invalid_tag(format!(
                "unknown Account tag {other}"
            ))),
        }
    }
}

/// Every transaction carries this envelope alongside its module-specific
/// fields: the network it targets, the time it claims to have been
/// created, and an optional human memo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub network_id: i64,
    pub created_at: Instant,
    pub memo: Option<String>,
}

impl Encode for Envelope {
    fn encode(&self, out: &mut Vec<u8>) {
        self.network_id.encode(out);
        self.created_at.encode(out);
        self.memo.encode(out);
    }
}

impl Decode for Envelope {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (network_id, rest) = i64::decode(buf)?;
        let (created_at, rest) = Instant::decode(rest)?;
        let (memo, rest) = Option::<String>::decode(rest)?;
        Ok((
            Envelope {
                network_id,
                created_at,
                memo,
            },
            rest,
        ))
    }
}

/// `AccountSignature{account, sig}`: the claimed signer and its ECDSA
/// signature over `keccak256(encode(payload))`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountSignature {
    pub account: Account,
    pub sig: Signature,
}

/// `Signed<T>`: a value together with the `AccountSignature` over its
/// encoded bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signed<T> {
    pub value: T,
    pub signature: AccountSignature,
}

impl<T: Encode> Signed<T> {
    /// `keccak256(encode(payload))`, the hash every pre-check recovers
    /// against.
    pub fn tx_hash(&self) -> [u8; 32] {
        keccak256(&self.value.encode_to_vec())
    }

    /// Recovers the public key the signature claims, without yet checking
    /// it against `self.signature.account` or any table state — callers
    /// run the Accounts pre-checks on top of this.
    pub fn recover_signer(&self) -> Result<PublicKey, CryptoError> {
        sigilaris_crypto::recover(&self.signature.sig, &self.tx_hash())
    }
}

/// A module-emitted event: a name plus codec-encoded, module-defined
/// fields. Kept type-erased at the runtime layer so a `ComposedBlueprint`
/// can hold reducers whose concrete event types differ without any of
/// them needing a common sum type baked into this crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub fields: Vec<u8>,
}

impl Event {
    pub fn new(name: impl Into<String>, fields: impl Encode) -> Self {
        Event {
            name: name.into(),
            fields: fields.encode_to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_roundtrips_both_variants() {
        let named = Account::Named("alice".to_string());
        let (decoded, rest) = Account::decode(&named.encode_to_vec()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, named);

        let unnamed = Account::Unnamed([9u8; 20]);
        let (decoded, rest) = Account::decode(&unnamed.encode_to_vec()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, unnamed);
    }

    #[test]
    fn envelope_roundtrips_with_and_without_memo() {
        let with_memo = Envelope {
            network_id: 7,
            created_at: Instant::from_epoch_millis(1_000),
            memo: Some("hi".to_string()),
        };
        let (decoded, rest) = Envelope::decode(&with_memo.encode_to_vec()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, with_memo);

        let without_memo = Envelope {
            network_id: 7,
            created_at: Instant::from_epoch_millis(1_000),
            memo: None,
        };
        let (decoded, _) = Envelope::decode(&without_memo.encode_to_vec()).unwrap();
        assert_eq!(decoded, without_memo);
    }
}
