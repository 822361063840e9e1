use std::collections::HashMap;

use sigilaris_crypto::Hash32;
use tracing::trace;

use crate::config::TrieConfig;
use crate::error::TrieError;
use crate::nibbles::Nibbles;
use crate::node::{Children, Node};
use crate::store::NodeStore;

/// `{ root, base, diff }`: `root` is the current logical
/// root, `base` is the root this state was branched from, and `diff`
/// accumulates every node created since `base` together with a reference
/// count `rebase` uses to merge two diffs.
#[derive(Clone, Debug, Default)]
pub struct TrieState {
    pub root: Option<Hash32>,
    pub base: Option<Hash32>,
    pub diff: HashMap<Hash32, (Node, i64)>,
}

impl TrieState {
    /// A state with no keys, branched from nothing.
    pub fn empty() -> Self {
        TrieState {
            root: None,
            base: None,
            diff: HashMap::new(),
        }
    }

    /// Reconstruct a state pinned at `root`, with an empty diff branched
    /// from that same root. This is what a caller does after a commit step
    /// promotes a diff into the node store.
    pub fn from_root(root: Hash32) -> Self {
        TrieState {
            root: Some(root),
            base: Some(root),
            diff: HashMap::new(),
        }
    }
}

fn fetch(state: &TrieState, store: &dyn NodeStore, hash: &Hash32) -> Result<Node, TrieError> {
    if let Some((node, _)) = state.diff.get(hash) {
        return Ok(node.clone());
    }
    match store.get(hash)? {
        Some(node) => Ok(node),
        None => {
            trace!(hash = %hex(hash), "node store miss");
            Err(TrieError::StoreMiss(*hash))
        }
    }
}

fn hex(hash: &Hash32) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

fn insert_diff(state: &mut TrieState, node: Node) -> Hash32 {
    let hash = node.hash();
    let entry = state.diff.entry(hash).or_insert_with(|| (node, 0));
    entry.1 += 1;
    hash
}

fn decrement_diff(state: &mut TrieState, hash: &Hash32) {
    if let Some(entry) = state.diff.get_mut(hash) {
        entry.1 -= 1;
    }
}

fn check_depth(config: &TrieConfig, depth: usize) -> Result<(), TrieError> {
    if depth > config.max_depth {
        return Err(TrieError::DepthExceeded {
            max: config.max_depth,
        });
    }
    Ok(())
}

/// `get(state, key)`: descend from the root, stripping each node's prefix
/// from the remaining key, until the key is exhausted (return the node's
/// value, if any) or a required child is absent (the key is not present).
pub fn get(
    state: &TrieState,
    store: &dyn NodeStore,
    config: &TrieConfig,
    key: &Nibbles,
) -> Result<Option<Vec<u8>>, TrieError> {
    let Some(mut cur) = state.root else {
        return Ok(None);
    };
    let mut remaining = key.clone();
    let mut depth = 0usize;
    loop {
        check_depth(config, depth)?;
        let node = fetch(state, store, &cur)?;
        let (prefix, children_opt, value_opt) = node.decompose();
        let Some(rest) = remaining.strip_prefix(&prefix) else {
            return Ok(None);
        };
        if rest.is_empty() {
            return Ok(value_opt);
        }
        let Some(children) = children_opt else {
            return Ok(None);
        };
        let (nibble, tail) = rest.head_tail().expect("non-empty rest has a head");
        let Some(child) = children[nibble as usize] else {
            return Ok(None);
        };
        cur = child;
        remaining = tail;
        depth += 1;
    }
}

/// `put(state, key, value)`, covering the five structural insertion
/// cases. Returns the new state; the old state's nodes remain reachable
/// through `base` as long as they are still referenced.
pub fn put(
    mut state: TrieState,
    store: &dyn NodeStore,
    config: &TrieConfig,
    key: &Nibbles,
    value: &[u8],
) -> Result<TrieState, TrieError> {
    let new_root = match state.root {
        None => insert_diff(
            &mut state,
            Node::Leaf {
                prefix: key.clone(),
                value: value.to_vec(),
            },
        ),
        Some(h) => put_rec(&mut state, store, config, h, key, value, 0)?,
    };
    state.root = Some(new_root);
    Ok(state)
}

#[allow(clippy::too_many_arguments)]
fn put_rec(
    state: &mut TrieState,
    store: &dyn NodeStore,
    config: &TrieConfig,
    node_hash: Hash32,
    key: &Nibbles,
    value: &[u8],
    depth: usize,
) -> Result<Hash32, TrieError> {
    check_depth(config, depth)?;
    let node = fetch(state, store, &node_hash)?;
    let (prefix, children_opt, value_opt) = node.decompose();
    let common = prefix.common_prefix_len(key);

    if common == prefix.len() && common == key.len() {
        // Case 1/2: `p == k`. Replace the value slot, promoting a pure
        // `Branch` to `BranchWithData` if it had none.
        decrement_diff(state, &node_hash);
        let new_node =
            Node::with_prefix_and_parts(prefix, children_opt, Some(value.to_vec()));
        return Ok(insert_diff(state, new_node));
    }

    if common == prefix.len() && common < key.len() {
        // Case 3: `p` is a strict prefix of `k`. Recurse into the child at
        // `k[len(p)]`, installing a fresh `Leaf` if that slot is empty. A
        // `Leaf` here has no children of its own, so it is treated as all
        // slots empty (and the result is promoted to `BranchWithData`).
        let mut children = children_opt.unwrap_or([None; 16]);
        let rest = key.slice_from(common);
        let (nibble, tail) = rest.head_tail().expect("common < key.len()");
        let new_child = match children[nibble as usize] {
            Some(child_hash) => {
                put_rec(state, store, config, child_hash, &tail, value, depth + 1)?
            }
            None => insert_diff(
                state,
                Node::Leaf {
                    prefix: tail,
                    value: value.to_vec(),
                },
            ),
        };
        children[nibble as usize] = Some(new_child);
        decrement_diff(state, &node_hash);
        let new_node = Node::with_prefix_and_parts(prefix, Some(children), value_opt);
        return Ok(insert_diff(state, new_node));
    }

    if common == key.len() && common < prefix.len() {
        // Case 4: `k` is a strict prefix of `p`. Split `N` into a fresh
        // `BranchWithData(k, ...)` whose single child slot holds `N` with
        // its prefix trimmed down to what remains after `k` and the
        // branching nibble.
        let p_nibble = prefix.at(common);
        let trimmed_prefix = prefix.slice_from(common + 1);
        let trimmed = Node::with_prefix_and_parts(trimmed_prefix, children_opt, value_opt);
        let trimmed_hash = insert_diff(state, trimmed);
        let mut children: Children = [None; 16];
        children[p_nibble as usize] = Some(trimmed_hash);
        decrement_diff(state, &node_hash);
        let new_node = Node::BranchWithData {
            prefix: key.clone(),
            children,
            value: value.to_vec(),
        };
        return Ok(insert_diff(state, new_node));
    }

    // Case 5: `p` and `k` share a strict common prefix `c` with both
    // having more suffix. Split into a pure `Branch(c, ...)` with two
    // sibling slots: `N` trimmed, and a fresh `Leaf` for `k`'s suffix.
    let common_prefix = prefix.slice_range(0, common);
    let p_nibble = prefix.at(common);
    let p_trimmed = prefix.slice_from(common + 1);
    let trimmed = Node::with_prefix_and_parts(p_trimmed, children_opt, value_opt);
    let trimmed_hash = insert_diff(state, trimmed);

    let k_nibble = key.at(common);
    let k_tail = key.slice_from(common + 1);
    let new_leaf_hash = insert_diff(
        state,
        Node::Leaf {
            prefix: k_tail,
            value: value.to_vec(),
        },
    );

    let mut children: Children = [None; 16];
    children[p_nibble as usize] = Some(trimmed_hash);
    children[k_nibble as usize] = Some(new_leaf_hash);
    decrement_diff(state, &node_hash);
    let new_node = Node::Branch {
        prefix: common_prefix,
        children,
    };
    Ok(insert_diff(state, new_node))
}

/// `remove(state, key)`. Returns `(state', false)` unchanged if the key
/// was absent.
pub fn remove(
    mut state: TrieState,
    store: &dyn NodeStore,
    config: &TrieConfig,
    key: &Nibbles,
) -> Result<(TrieState, bool), TrieError> {
    let Some(root) = state.root else {
        return Ok((state, false));
    };
    let (new_root, removed) = remove_rec(&mut state, store, config, root, key, 0)?;
    state.root = new_root;
    Ok((state, removed))
}

fn remove_rec(
    state: &mut TrieState,
    store: &dyn NodeStore,
    config: &TrieConfig,
    node_hash: Hash32,
    key: &Nibbles,
    depth: usize,
) -> Result<(Option<Hash32>, bool), TrieError> {
    check_depth(config, depth)?;
    let node = fetch(state, store, &node_hash)?;
    let (prefix, children_opt, value_opt) = node.decompose();

    let Some(rest) = key.strip_prefix(&prefix) else {
        return Ok((Some(node_hash), false));
    };

    if rest.is_empty() {
        let Some(_) = value_opt else {
            return Ok((Some(node_hash), false));
        };
        decrement_diff(state, &node_hash);
        return match children_opt {
            // Leaf: deleting its value deletes the whole node.
            None => Ok((None, true)),
            Some(children) => {
                let new_hash = canonicalize(state, store, config, prefix, children, None, depth)?;
                Ok((new_hash, true))
            }
        };
    }

    let Some(children) = children_opt else {
        return Ok((Some(node_hash), false));
    };
    let (nibble, tail) = rest.head_tail().expect("non-empty rest has a head");
    let Some(child_hash) = children[nibble as usize] else {
        return Ok((Some(node_hash), false));
    };

    let (new_child, removed) = remove_rec(state, store, config, child_hash, &tail, depth + 1)?;
    if !removed {
        return Ok((Some(node_hash), false));
    }

    decrement_diff(state, &node_hash);
    let mut new_children = children;
    new_children[nibble as usize] = new_child;
    let new_hash = canonicalize(state, store, config, prefix, new_children, value_opt, depth)?;
    Ok((new_hash, true))
}

/// Re-canonicalize a node's `(prefix, children, value)` after a removal
/// dropped one child slot or the node's own value, applying the collapse
/// collapse rules so the root hash stays a function of the
/// surviving key/value set alone.
fn canonicalize(
    state: &mut TrieState,
    store: &dyn NodeStore,
    config: &TrieConfig,
    prefix: Nibbles,
    children: Children,
    value: Option<Vec<u8>>,
    depth: usize,
) -> Result<Option<Hash32>, TrieError> {
    let count = children.iter().filter(|c| c.is_some()).count();
    match (count, value) {
        (0, None) => Ok(None),
        (0, Some(v)) => Ok(Some(insert_diff(state, Node::Leaf { prefix, value: v }))),
        (1, None) => {
            // A pure `Branch` whose child count dropped to one: merge
            // parent-prefix, branching nibble, and child-prefix into a
            // single node of the child's own shape.
            let i = children
                .iter()
                .position(|c| c.is_some())
                .expect("count == 1");
            let child_hash = children[i].expect("count == 1");
            check_depth(config, depth + 1)?;
            let child = fetch(state, store, &child_hash)?;
            let (child_prefix, child_children, child_value) = child.decompose();
            let merged_prefix = prefix
                .concat(&Nibbles::from_single(i as u8))
                .concat(&child_prefix);
            decrement_diff(state, &child_hash);
            let merged = Node::with_prefix_and_parts(merged_prefix, child_children, child_value);
            Ok(Some(insert_diff(state, merged)))
        }
        (_, value) => {
            // Either a `BranchWithData` that keeps its value with however
            // many children remain, or a `Branch` with >= 2 children: no
            // collapse needed, just rebuild with the updated slots.
            let new_node = Node::with_prefix_and_parts(prefix, Some(children), value);
            Ok(Some(insert_diff(state, new_node)))
        }
    }
}

/// `rebase(a, b)`: valid only when both states share a `base`. Produces a
/// state whose diff is the pointwise union of `a.diff` and `b.diff` with
/// summed ref counts, keeping `a`'s root as the logical result (the module
/// runtime's access-log conflict detection is what decides which of two
/// racing transactions' roots should actually be kept; `rebase` itself
/// does no reconciliation).
pub fn rebase(a: &TrieState, b: &TrieState) -> Result<TrieState, TrieError> {
    if a.base != b.base {
        return Err(TrieError::DifferentBase);
    }
    let mut diff = a.diff.clone();
    for (hash, (node, count)) in &b.diff {
        let entry = diff.entry(*hash).or_insert_with(|| (node.clone(), 0));
        entry.1 += count;
    }
    Ok(TrieState {
        root: a.root,
        base: b.root,
        diff,
    })
}
