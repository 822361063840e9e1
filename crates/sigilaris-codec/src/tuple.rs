use crate::error::DecodeError;
use crate::traits::{Decode, Encode};

macro_rules! impl_tuple_codec {
    ($(($name:ident, $field:ident, $idx:tt)),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            fn encode(&self, out: &mut Vec<u8>) {
                $(self.$idx.encode(out);)+
            }
        }

        impl<$($name: Decode),+> Decode for ($($name,)+) {
            fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
                let rest = buf;
                $(let ($field, rest) = $name::decode(rest)?;)+
                Ok((($($field,)+), rest))
            }
        }
    };
}

impl_tuple_codec!((A, a, 0), (B, b, 1));
impl_tuple_codec!((A, a, 0), (B, b, 1), (C, c, 2));
impl_tuple_codec!((A, a, 0), (B, b, 1), (C, c, 2), (D, d, 3));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_roundtrip() {
        let pair = (7i64, "x".to_string());
        let bytes = pair.encode_to_vec();
        let (decoded, rest) = <(i64, String)>::decode(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, pair);
    }

    #[test]
    fn triple_roundtrip() {
        let triple = (1i64, 2i64, 3i64);
        let bytes = triple.encode_to_vec();
        let (decoded, rest) = <(i64, i64, i64)>::decode(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(decoded, triple);
    }
}
