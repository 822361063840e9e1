use crate::error::DecodeError;
use crate::traits::{take, take_one, Decode, Encode};

// `Unit` — the empty encoding.
impl Encode for () {
    fn encode(&self, _out: &mut Vec<u8>) {}
}

impl Decode for () {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        Ok(((), buf))
    }
}

// `Byte` — a single raw byte.
impl Encode for u8 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl Decode for u8 {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        take_one(buf)
    }
}

// `Long` — 8 bytes, big-endian, two's complement.
impl Encode for i64 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl Decode for i64 {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (head, rest) = take(buf, 8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(head);
        Ok((i64::from_be_bytes(bytes), rest))
    }
}

/// `Instant` — epoch milliseconds, encoded as `Long`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(pub i64);

impl Instant {
    pub fn from_epoch_millis(millis: i64) -> Self {
        Instant(millis)
    }

    pub fn epoch_millis(&self) -> i64 {
        self.0
    }
}

impl Encode for Instant {
    fn encode(&self, out: &mut Vec<u8>) {
        self.0.encode(out);
    }
}

impl Decode for Instant {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (millis, rest) = i64::decode(buf)?;
        Ok((Instant(millis), rest))
    }
}

/// A UTF-8 string, encoded as a length-prefixed byte string of its UTF-8
/// bytes (`List<Byte>` per the collection codec).
impl Encode for String {
    fn encode(&self, out: &mut Vec<u8>) {
        self.as_bytes().to_vec().encode(out);
    }
}

impl Decode for String {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (bytes, rest) = Vec::<u8>::decode(buf)?;
        let s = String::from_utf8(bytes)
            .map_err(|e| DecodeError::invalid_tag(format!("invalid utf8: {e}")))?;
        Ok((s, rest))
    }
}

/// A fixed-size byte array encodes as its raw bytes, with no length
/// prefix — the length is already known from `N` at both ends. This is
/// what lets hash digests and other fixed-width identifiers (`KeyId20`,
/// `UInt256`) enter a hash preimage or a table key without an extra
/// length byte.
impl<const N: usize> Encode for [u8; N] {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (head, rest) = take(buf, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(head);
        Ok((out, rest))
    }
}
