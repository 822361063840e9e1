use crate::error::DecodeError;

/// A type with a deterministic binary encoding.
///
/// `encode` must be a pure function of the value: equal values always
/// produce bit-identical output, and output never depends on insertion
/// order for the collection wrappers in this crate (`CanonicalSet`,
/// `CanonicalMap`). This is what lets the trie use the codec's output
/// directly as the preimage of a node hash.
pub trait Encode {
    fn encode(&self, out: &mut Vec<u8>);

    /// Convenience wrapper for callers that just want the bytes.
    fn encode_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// The algorithmic inverse of `Encode`.
///
/// Returns the decoded value and the unconsumed remainder of the buffer,
/// so product types and collections can decode their fields/elements in
/// sequence without each one needing to know the others' lengths up front.
pub trait Decode: Sized {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError>;

    /// Decode expecting the buffer to be fully consumed.
    fn decode_exact(buf: &[u8]) -> Result<Self, DecodeError> {
        let (value, rest) = Self::decode(buf)?;
        if !rest.is_empty() {
            return Err(DecodeError::TrailingBytes { extra: rest.len() });
        }
        Ok(value)
    }
}

pub(crate) fn take(buf: &[u8], n: usize) -> Result<(&[u8], &[u8]), DecodeError> {
    if buf.len() < n {
        return Err(DecodeError::eof(n - buf.len()));
    }
    Ok(buf.split_at(n))
}

pub(crate) fn take_one(buf: &[u8]) -> Result<(u8, &[u8]), DecodeError> {
    let (head, rest) = take(buf, 1)?;
    Ok((head[0], rest))
}
