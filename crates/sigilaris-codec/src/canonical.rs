use crate::bignat::BigNat;
use crate::error::DecodeError;
use crate::traits::{Decode, Encode};

/// A set encoded canonically: every element is encoded, the resulting byte
/// strings are sorted lexicographically, and the sorted bytes are
/// concatenated behind a `BigNat(size)` prefix.
///
/// Ordering is on the *encoded bytes*, not on `T: Ord` — this is what makes
/// `encode` invariant under insertion order without requiring every element
/// type to carry a meaningful `Ord` impl of its own.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CanonicalSet<T>(Vec<T>);

impl<T> CanonicalSet<T> {
    pub fn new() -> Self {
        CanonicalSet(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        CanonicalSet(items)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Encode> Encode for CanonicalSet<T> {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut encoded: Vec<Vec<u8>> = self.0.iter().map(|item| item.encode_to_vec()).collect();
        encoded.sort();
        BigNat::from_usize(encoded.len()).encode(out);
        for bytes in encoded {
            out.extend_from_slice(&bytes);
        }
    }
}

impl<T: Decode> Decode for CanonicalSet<T> {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (len, mut rest) = BigNat::decode(buf)?;
        let len = len.to_usize()?;
        let mut items = Vec::with_capacity(len.min(1 << 20));
        for _ in 0..len {
            let (item, next) = T::decode(rest)?;
            items.push(item);
            rest = next;
        }
        Ok((CanonicalSet(items), rest))
    }
}

/// `Map<K, V>` → `Set<(K, V)>`: every pair is encoded as a concatenated
/// tuple, then the pairs are sorted and deduplicated-by-bytes like
/// `CanonicalSet`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CanonicalMap<K, V>(Vec<(K, V)>);

impl<K, V> CanonicalMap<K, V> {
    pub fn new() -> Self {
        CanonicalMap(Vec::new())
    }

    pub fn from_vec(items: Vec<(K, V)>) -> Self {
        CanonicalMap(items)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, V)> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<(K, V)> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Encode, V: Encode> Encode for CanonicalMap<K, V> {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut encoded: Vec<Vec<u8>> = self
            .0
            .iter()
            .map(|(k, v)| {
                let mut bytes = Vec::new();
                k.encode(&mut bytes);
                v.encode(&mut bytes);
                bytes
            })
            .collect();
        encoded.sort();
        BigNat::from_usize(encoded.len()).encode(out);
        for bytes in encoded {
            out.extend_from_slice(&bytes);
        }
    }
}

impl<K: Decode, V: Decode> Decode for CanonicalMap<K, V> {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (len, mut rest) = BigNat::decode(buf)?;
        let len = len.to_usize()?;
        let mut items = Vec::with_capacity(len.min(1 << 20));
        for _ in 0..len {
            let (k, next) = K::decode(rest)?;
            let (v, next) = V::decode(next)?;
            items.push((k, v));
            rest = next;
        }
        Ok((CanonicalMap(items), rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bignat::BigInt;

    #[test]
    fn set_encoding_is_order_invariant_and_sorted() {
        // encode(Set[BigInt]{3, 1, 2}) must equal 0x03 ‖ 0x02 ‖ 0x04 ‖ 0x06
        let a = CanonicalSet::from_vec(vec![
            BigInt::from_i64(3),
            BigInt::from_i64(1),
            BigInt::from_i64(2),
        ]);
        let b = CanonicalSet::from_vec(vec![
            BigInt::from_i64(1),
            BigInt::from_i64(2),
            BigInt::from_i64(3),
        ]);
        let encoded_a = a.encode_to_vec();
        let encoded_b = b.encode_to_vec();
        assert_eq!(encoded_a, encoded_b);
        assert_eq!(encoded_a, vec![0x03, 0x02, 0x04, 0x06]);
    }

    #[test]
    fn set_roundtrip() {
        let s = CanonicalSet::from_vec(vec![10i64, -5, 0, 99]);
        let bytes = s.encode_to_vec();
        let (decoded, rest) = CanonicalSet::<i64>::decode(&bytes).unwrap();
        assert!(rest.is_empty());
        let mut original: Vec<i64> = s.into_vec();
        let mut got: Vec<i64> = decoded.into_vec();
        original.sort();
        got.sort();
        assert_eq!(original, got);
    }

    #[test]
    fn map_roundtrip() {
        let m = CanonicalMap::from_vec(vec![("b".to_string(), 2i64), ("a".to_string(), 1i64)]);
        let bytes = m.encode_to_vec();
        let (decoded, rest) = CanonicalMap::<String, i64>::decode(&bytes).unwrap();
        assert!(rest.is_empty());
        let mut got = decoded.into_vec();
        got.sort();
        assert_eq!(got, vec![("a".to_string(), 1i64), ("b".to_string(), 2i64)]);
    }
}
