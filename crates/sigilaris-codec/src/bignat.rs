use num_bigint::{BigInt as NumBigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::error::DecodeError;
use crate::traits::{take, take_one, Decode, Encode};

/// A non-negative arbitrary-precision integer, encoded with the three-range
/// scheme: small values (`0..=128`) as a single byte, medium values as a
/// length-prefixed big-endian byte string, and large values (length itself
/// needing more than one byte to express) as a nested length-of-length
/// prefix.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BigNat(pub BigUint);

impl BigNat {
    pub fn from_usize(n: usize) -> Self {
        BigNat(BigUint::from(n))
    }

    pub fn to_usize(&self) -> Result<usize, DecodeError> {
        self.0
            .to_usize()
            .ok_or_else(|| DecodeError::invalid_tag("BigNat does not fit in usize"))
    }

    pub fn to_u64(&self) -> Result<u64, DecodeError> {
        self.0
            .to_u64()
            .ok_or_else(|| DecodeError::invalid_tag("BigNat does not fit in u64"))
    }
}

impl From<u64> for BigNat {
    fn from(n: u64) -> Self {
        BigNat(BigUint::from(n))
    }
}

impl Encode for BigNat {
    fn encode(&self, out: &mut Vec<u8>) {
        if let Some(small) = self.0.to_u64() {
            if small <= 0x80 {
                out.push(small as u8);
                return;
            }
        }
        let b = self.0.to_bytes_be();
        if b.len() <= 119 {
            out.push(0x80 + b.len() as u8);
            out.extend_from_slice(&b);
        } else {
            let l = minimal_be(b.len() as u64);
            out.push(0xf8 + (l.len() as u8) - 1);
            out.extend_from_slice(&l);
            out.extend_from_slice(&b);
        }
    }
}

impl Decode for BigNat {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (tag, rest) = take_one(buf)?;
        if tag <= 0x80 {
            return Ok((BigNat(BigUint::from(tag)), rest));
        }
        if tag <= 0x80 + 119 {
            let len = (tag - 0x80) as usize;
            let (b, rest) = take(rest, len)?;
            return Ok((BigNat(BigUint::from_bytes_be(b)), rest));
        }
        if tag <= 0xff {
            let llen = (tag - 0xf8) as usize + 1;
            let (l, rest) = take(rest, llen)?;
            let len = BigUint::from_bytes_be(l).to_usize().ok_or_else(|| {
                DecodeError::invalid_tag("BigNat length-of-length does not fit in usize")
            })?;
            let (b, rest) = take(rest, len)?;
            return Ok((BigNat(BigUint::from_bytes_be(b)), rest));
        }
        Err(DecodeError::invalid_tag(format!("unreachable BigNat tag {tag:#x}")))
    }
}

fn minimal_be(n: u64) -> Vec<u8> {
    let b = n.to_be_bytes();
    let first_nonzero = b.iter().position(|&x| x != 0).unwrap_or(b.len() - 1);
    b[first_nonzero..].to_vec()
}

/// An arbitrary-precision signed integer, encoded as a zigzag-mapped
/// `BigNat`: non-negative `n` becomes `BigNat(2n)`, negative `n` becomes
/// `BigNat(-2n + 1)`. This keeps small magnitudes (of either sign) cheap to
/// encode while staying within the non-negative `BigNat` domain.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BigInt(pub NumBigInt);

impl BigInt {
    pub fn from_i64(n: i64) -> Self {
        BigInt(NumBigInt::from(n))
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }
}

impl From<i64> for BigInt {
    fn from(n: i64) -> Self {
        BigInt::from_i64(n)
    }
}

impl Encode for BigInt {
    fn encode(&self, out: &mut Vec<u8>) {
        let mapped = if self.0.sign() != Sign::Minus {
            &self.0 + &self.0
        } else {
            let two_n = &self.0 + &self.0;
            -two_n + NumBigInt::from(1)
        };
        let (_, mag) = mapped.into_parts();
        BigNat(mag).encode(out);
    }
}

impl Decode for BigInt {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (nat, rest) = BigNat::decode(buf)?;
        let m = NumBigInt::from_biguint(Sign::Plus, nat.0);
        let n = if (&m % 2u8).is_zero() {
            m / 2
        } else {
            -((m - NumBigInt::from(1)) / 2)
        };
        Ok((BigInt(n), rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bignat_single_byte_boundary() {
        assert_eq!(BigNat::from_usize(0).encode_to_vec(), vec![0x00]);
        assert_eq!(BigNat::from_usize(128).encode_to_vec(), vec![0x80]);
        assert_eq!(BigNat::from_usize(129).encode_to_vec(), vec![0x81, 0x81]);
    }

    #[test]
    fn bignat_roundtrip() {
        for n in [0u64, 1, 128, 129, 255, 256, 100_000, u64::MAX] {
            let encoded = BigNat::from(n).encode_to_vec();
            let (decoded, rest) = BigNat::decode(&encoded).unwrap();
            assert!(rest.is_empty());
            assert_eq!(decoded.to_u64().unwrap(), n);
        }
    }

    #[test]
    fn bigint_zigzag_vectors() {
        // BigInt zigzag encoding of small signed values.
        assert_eq!(BigInt::from_i64(-2).encode_to_vec(), vec![0x05]);
        assert_eq!(BigInt::from_i64(1).encode_to_vec(), vec![0x02]);
        assert_eq!(BigInt::from_i64(0).encode_to_vec(), vec![0x00]);
    }

    #[test]
    fn bigint_roundtrip() {
        for n in [0i64, 1, -1, 2, -2, i64::MIN, i64::MAX, 123_456, -123_456] {
            let encoded = BigInt::from_i64(n).encode_to_vec();
            let (decoded, rest) = BigInt::decode(&encoded).unwrap();
            assert!(rest.is_empty());
            assert_eq!(decoded.0, NumBigInt::from(n));
        }
    }
}
