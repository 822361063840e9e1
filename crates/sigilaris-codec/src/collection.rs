use crate::bignat::BigNat;
use crate::error::DecodeError;
use crate::traits::{Decode, Encode};

/// `List<A>` → `BigNat(length) ‖ enc(a₁) ‖ … ‖ enc(aₙ)`.
impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, out: &mut Vec<u8>) {
        BigNat::from_usize(self.len()).encode(out);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (len, mut rest) = BigNat::decode(buf)?;
        let len = len.to_usize()?;
        let mut items = Vec::with_capacity(len.min(1 << 20));
        for _ in 0..len {
            let (item, next) = T::decode(rest)?;
            items.push(item);
            rest = next;
        }
        Ok((items, rest))
    }
}

/// `Option<A>` → same as `List<A>` with length 0 or 1.
impl<T: Encode> Encode for Option<T> {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            None => BigNat::from_usize(0).encode(out),
            Some(value) => {
                BigNat::from_usize(1).encode(out);
                value.encode(out);
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (len, rest) = BigNat::decode(buf)?;
        match len.to_usize()? {
            0 => Ok((None, rest)),
            1 => {
                let (value, rest) = T::decode(rest)?;
                Ok((Some(value), rest))
            }
            n => Err(DecodeError::invalid_tag(format!(
                "Option length must be 0 or 1, got {n}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_roundtrip() {
        let xs: Vec<i64> = vec![1, 2, 3, -4];
        let bytes = xs.encode_to_vec();
        let (decoded, rest) = Vec::<i64>::decode(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, xs);
    }

    #[test]
    fn option_roundtrip() {
        let some: Option<i64> = Some(42);
        let none: Option<i64> = None;
        let (decoded_some, _) = Option::<i64>::decode(&some.encode_to_vec()).unwrap();
        let (decoded_none, _) = Option::<i64>::decode(&none.encode_to_vec()).unwrap();
        assert_eq!(decoded_some, some);
        assert_eq!(decoded_none, none);
    }

    #[test]
    fn empty_list_is_single_zero_byte() {
        let xs: Vec<i64> = vec![];
        assert_eq!(xs.encode_to_vec(), vec![0x00]);
    }
}
