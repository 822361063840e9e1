use sigilaris_codec::{BigNat, Encode};

/// Encodes one path/name segment as `len_prefix ‖ utf8_bytes ‖ 0x00`. The
/// trailing sentinel is what makes a sequence of segments prefix-free: no
/// encoding of a shorter segment list can ever be a byte-prefix of a longer
/// one, since the shorter one always ends in a `0x00` the longer one's next
/// length byte cannot reproduce at that position (a `BigNat` length prefix
/// is never itself `0x00` for a non-empty segment, and an empty segment's
/// `0x00` length byte is immediately followed by its own sentinel).
pub fn encode_segment(segment: &str) -> Vec<u8> {
    let mut out = Vec::new();
    BigNat::from_usize(segment.len()).encode(&mut out);
    out.extend_from_slice(segment.as_bytes());
    out.push(0x00);
    out
}

/// `encodePath(Path)`: the concatenation of every segment's encoding, in
/// order.
pub fn encode_path(path: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    for segment in path {
        out.extend_from_slice(&encode_segment(segment));
    }
    out
}

/// `tablePrefix = encodePath(path) ‖ encodeSegment(name)`.
pub fn table_prefix(path: &[String], name: &str) -> Vec<u8> {
    let mut out = encode_path(path);
    out.extend_from_slice(&encode_segment(name));
    out
}
