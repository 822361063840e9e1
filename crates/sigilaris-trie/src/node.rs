use sigilaris_codec::{BigNat, Decode, DecodeError as CodecDecodeError, Encode};
use sigilaris_crypto::{keccak256, Hash32};

use crate::nibbles::Nibbles;

const TAG_LEAF: u8 = 0x01;
const TAG_BRANCH: u8 = 0x02;
const TAG_BRANCH_WITH_DATA: u8 = 0x03;

pub type Children = [Option<Hash32>; 16];

/// The three node shapes the trie is built from. Every node is identified
/// by the Keccak-256 hash of its wire encoding (`node.hash()`), which is
/// what makes the structure content-addressed: two nodes with the same
/// hash are the same node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Leaf {
        prefix: Nibbles,
        value: Vec<u8>,
    },
    Branch {
        prefix: Nibbles,
        children: Children,
    },
    BranchWithData {
        prefix: Nibbles,
        children: Children,
        value: Vec<u8>,
    },
}

impl Node {
    pub fn prefix(&self) -> &Nibbles {
        match self {
            Node::Leaf { prefix, .. } => prefix,
            Node::Branch { prefix, .. } => prefix,
            Node::BranchWithData { prefix, .. } => prefix,
        }
    }

    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Node::Leaf { value, .. } => Some(value),
            Node::Branch { .. } => None,
            Node::BranchWithData { value, .. } => Some(value),
        }
    }

    pub fn children(&self) -> Option<&Children> {
        match self {
            Node::Leaf { .. } => None,
            Node::Branch { children, .. } => Some(children),
            Node::BranchWithData { children, .. } => Some(children),
        }
    }

    /// Decompose into the uniform `(prefix, children, value)` shape every
    /// put/remove case operates on, regardless of which of the three
    /// variants this node happens to be.
    pub fn decompose(&self) -> (Nibbles, Option<Children>, Option<Vec<u8>>) {
        match self {
            Node::Leaf { prefix, value } => (prefix.clone(), None, Some(value.clone())),
            Node::Branch { prefix, children } => (prefix.clone(), Some(*children), None),
            Node::BranchWithData {
                prefix,
                children,
                value,
            } => (prefix.clone(), Some(*children), Some(value.clone())),
        }
    }

    /// Rebuild a node of the same shape as `self` (leaf / branch /
    /// branch-with-data, as determined by whether children/value are
    /// present) but with a different prefix. Used when a node's own
    /// prefix changes (split / merge) without touching its children or
    /// value.
    pub fn with_prefix_and_parts(
        prefix: Nibbles,
        children: Option<Children>,
        value: Option<Vec<u8>>,
    ) -> Node {
        match (children, value) {
            (None, Some(value)) => Node::Leaf { prefix, value },
            (Some(children), None) => Node::Branch { prefix, children },
            (Some(children), Some(value)) => Node::BranchWithData {
                prefix,
                children,
                value,
            },
            (None, None) => unreachable!("a node must carry a value, children, or both"),
        }
    }

    fn exist_bits(children: &Children) -> u16 {
        let mut bits = 0u16;
        for (i, child) in children.iter().enumerate() {
            if child.is_some() {
                bits |= 1u16 << (15 - i);
            }
        }
        bits
    }

    fn encode_children(out: &mut Vec<u8>, children: &Children) {
        out.extend_from_slice(&Self::exist_bits(children).to_be_bytes());
        for child in children.iter().flatten() {
            out.extend_from_slice(child);
        }
    }

    pub fn encode_wire(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Node::Leaf { prefix, value } => {
                out.push(TAG_LEAF);
                prefix.encode(&mut out);
                BigNat::from_usize(value.len()).encode(&mut out);
                out.extend_from_slice(value);
            }
            Node::Branch { prefix, children } => {
                out.push(TAG_BRANCH);
                prefix.encode(&mut out);
                Self::encode_children(&mut out, children);
            }
            Node::BranchWithData {
                prefix,
                children,
                value,
            } => {
                out.push(TAG_BRANCH_WITH_DATA);
                prefix.encode(&mut out);
                Self::encode_children(&mut out, children);
                BigNat::from_usize(value.len()).encode(&mut out);
                out.extend_from_slice(value);
            }
        }
        out
    }

    pub fn hash(&self) -> Hash32 {
        keccak256(&self.encode_wire())
    }

    pub fn decode_wire(buf: &[u8]) -> Result<Node, CodecDecodeError> {
        let (tag, rest) = buf
            .split_first()
            .ok_or_else(|| CodecDecodeError::eof(1))?;
        let (prefix, rest) = Nibbles::decode(rest)?;
        match *tag {
            TAG_LEAF => {
                let (len, rest) = BigNat::decode(rest)?;
                let len = len.to_usize()?;
                if rest.len() < len {
                    return Err(CodecDecodeError::eof(len - rest.len()));
                }
                let value = rest[..len].to_vec();
                Ok(Node::Leaf { prefix, value })
            }
            TAG_BRANCH => {
                let (children, rest) = decode_children(rest)?;
                if !rest.is_empty() {
                    return Err(CodecDecodeError::TrailingBytes { extra: rest.len() });
                }
                Ok(Node::Branch { prefix, children })
            }
            TAG_BRANCH_WITH_DATA => {
                let (children, rest) = decode_children(rest)?;
                let (len, rest) = BigNat::decode(rest)?;
                let len = len.to_usize()?;
                if rest.len() < len {
                    return Err(CodecDecodeError::eof(len - rest.len()));
                }
                let value = rest[..len].to_vec();
                Ok(Node::BranchWithData {
                    prefix,
                    children,
                    value,
                })
            }
            other => Err(CodecDecodeError::invalid_tag(format!(
                "unknown node tag {other:#x}"
            ))),
        }
    }
}

fn decode_children(buf: &[u8]) -> Result<(Children, &[u8]), CodecDecodeError> {
    if buf.len() < 2 {
        return Err(CodecDecodeError::eof(2 - buf.len()));
    }
    let bits = u16::from_be_bytes([buf[0], buf[1]]);
    let mut rest = &buf[2..];
    let mut children: Children = [None; 16];
    for i in 0..16 {
        if bits & (1u16 << (15 - i)) != 0 {
            if rest.len() < 32 {
                return Err(CodecDecodeError::eof(32 - rest.len()));
            }
            let mut h = [0u8; 32];
            h.copy_from_slice(&rest[..32]);
            children[i] = Some(h);
            rest = &rest[32..];
        }
    }
    Ok((children, rest))
}
