use sigilaris_crypto::Hash32;

use crate::error::TrieError;
use crate::nibbles::Nibbles;
use crate::node::Node;
use crate::store::NodeStore;
use crate::trie::TrieState;

enum Frame {
    Visit(Nibbles, Hash32),
    EmitValue(Nibbles, Vec<u8>),
}

/// A restartable, lazy in-order walk of every `(key, value)` pair in a
/// trie snapshot, stack-based so each `next()` fetches only the node(s) it
/// needs and never holds the node store open between pulls.
pub struct TrieStream<'a> {
    state: &'a TrieState,
    store: &'a dyn NodeStore,
    stack: Vec<Frame>,
    descending: bool,
}

impl<'a> TrieStream<'a> {
    fn new(
        state: &'a TrieState,
        store: &'a dyn NodeStore,
        root: Option<Hash32>,
        descending: bool,
    ) -> Self {
        let mut stack = Vec::new();
        if let Some(h) = root {
            stack.push(Frame::Visit(Nibbles::empty(), h));
        }
        TrieStream {
            state,
            store,
            stack,
            descending,
        }
    }

    fn fetch(&self, hash: &Hash32) -> Result<Node, TrieError> {
        if let Some((node, _)) = self.state.diff.get(hash) {
            return Ok(node.clone());
        }
        self.store
            .get(hash)?
            .ok_or(TrieError::StoreMiss(*hash))
    }

    fn push_children(&mut self, path: &Nibbles, node: &Node) {
        let Some(children) = node.children() else {
            return;
        };
        // Ascending iteration pops nibble 0 first, so push in descending
        // order (15 down to 0); descending iteration is the mirror image.
        let order: Box<dyn Iterator<Item = usize>> = if self.descending {
            Box::new(0..16)
        } else {
            Box::new((0..16).rev())
        };
        for i in order {
            if let Some(child_hash) = children[i] {
                let child_path = path.concat(&Nibbles::from_single(i as u8));
                self.stack.push(Frame::Visit(child_path, child_hash));
            }
        }
    }
}

impl<'a> Iterator for TrieStream<'a> {
    type Item = Result<(Nibbles, Vec<u8>), TrieError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop()? {
                Frame::EmitValue(key, value) => return Some(Ok((key, value))),
                Frame::Visit(path, hash) => {
                    let node = match self.fetch(&hash) {
                        Ok(node) => node,
                        Err(e) => return Some(Err(e)),
                    };
                    let full_key = path.concat(node.prefix());

                    if self.descending {
                        // A node's own value sits at `full_key`, strictly
                        // less than any key extending it, so it must be
                        // emitted only after every child subtree has been
                        // exhausted. Push it first (bottom), children on
                        // top (popped first).
                        if let Some(value) = node.value() {
                            self.stack
                                .push(Frame::EmitValue(full_key.clone(), value.to_vec()));
                        }
                        self.push_children(&full_key, &node);
                        continue;
                    }

                    self.push_children(&full_key, &node);
                    if let Some(value) = node.value() {
                        return Some(Ok((full_key, value.to_vec())));
                    }
                }
            }
        }
    }
}

/// `streamFrom(state, startKey)`: ascending `(key, value)` pairs with
/// `key >= start_key`. Built as a filter over the full ascending walk —
/// still lazy (no subtree is visited until its frame is popped) and
/// correct, trading the seek-specific pruning an embedded store index
/// could do for a much simpler implementation.
pub fn stream_from<'a>(
    state: &'a TrieState,
    store: &'a dyn NodeStore,
    start_key: Nibbles,
) -> impl Iterator<Item = Result<(Nibbles, Vec<u8>), TrieError>> + 'a {
    TrieStream::new(state, store, state.root, false).filter(move |item| match item {
        Ok((key, _)) => *key >= start_key,
        Err(_) => true,
    })
}

/// `reverseStreamFrom(state, prefix, optSuffix)`: descending `(key,
/// value)` pairs with `key` in `[prefix, prefix ++ suffix)` if `suffix` is
/// given, else every key starting with `prefix`.
pub fn reverse_stream_from<'a>(
    state: &'a TrieState,
    store: &'a dyn NodeStore,
    prefix: Nibbles,
    suffix: Option<Nibbles>,
) -> impl Iterator<Item = Result<(Nibbles, Vec<u8>), TrieError>> + 'a {
    let upper_bound = suffix.map(|s| prefix.concat(&s));
    TrieStream::new(state, store, state.root, true).filter(move |item| match item {
        Ok((key, _)) => {
            key.starts_with(&prefix)
                && match &upper_bound {
                    Some(bound) => key < bound,
                    None => true,
                }
        }
        Err(_) => true,
    })
}
