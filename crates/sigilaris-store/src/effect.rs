use sigilaris_trie::{Nibbles, NodeStore, TrieConfig, TrieState};

use crate::access_log::AccessLog;
use crate::error::StoreError;

/// The pair the store effect threads through a reducer: the trie snapshot
/// being mutated and the log of every table/key it touched along the way.
#[derive(Clone, Debug, Default)]
pub struct StoreState {
    pub trie: TrieState,
    pub log: AccessLog,
}

impl StoreState {
    pub fn new(trie: TrieState) -> Self {
        StoreState {
            trie,
            log: AccessLog::new(),
        }
    }
}

/// A sequenceable, fallible, stateful computation over [`StoreState`].
///
/// This is a plain function type, kept free of mutable global state,
/// wrapped in a struct so callers get `map`/`and_then`
/// instead of writing `.run(...)` chains by hand. `'a` ties the computation
/// to the `NodeStore`/`TrieConfig` collaborators its leaves (`read`/`write`/
/// `delete`) close over.
pub struct StoreM<'a, T> {
    run: Box<dyn FnOnce(StoreState) -> Result<(StoreState, T), StoreError> + 'a>,
}

impl<'a, T: 'a> StoreM<'a, T> {
    pub fn run(self, state: StoreState) -> Result<(StoreState, T), StoreError> {
        (self.run)(state)
    }

    pub fn map<U: 'a>(self, f: impl FnOnce(T) -> U + 'a) -> StoreM<'a, U> {
        StoreM {
            run: Box::new(move |state| {
                let (state, value) = (self.run)(state)?;
                Ok((state, f(value)))
            }),
        }
    }

    pub fn and_then<U: 'a>(self, f: impl FnOnce(T) -> StoreM<'a, U> + 'a) -> StoreM<'a, U> {
        StoreM {
            run: Box::new(move |state| {
                let (state, value) = (self.run)(state)?;
                f(value).run(state)
            }),
        }
    }
}

pub fn pure<'a, T: 'a>(value: T) -> StoreM<'a, T> {
    StoreM {
        run: Box::new(move |state| Ok((state, value))),
    }
}

pub fn raise<'a, T: 'a>(err: StoreError) -> StoreM<'a, T> {
    StoreM {
        run: Box::new(move |_state| Err(err)),
    }
}

/// `read(tablePrefix, encKey)`: logs the read, then delegates to the trie.
/// The log update happens before the fallible trie call so a `StoreMiss`
/// still leaves the log describing the attempt.
pub fn read<'a>(
    store: &'a dyn NodeStore,
    config: &'a TrieConfig,
    table_prefix: Vec<u8>,
    enc_key: Vec<u8>,
) -> StoreM<'a, Option<Vec<u8>>> {
    StoreM {
        run: Box::new(move |mut state| {
            let full_key_bytes = full_key_bytes(&table_prefix, &enc_key);
            state.log.record_read(&table_prefix, &full_key_bytes);
            let key = Nibbles::from_bytes(&full_key_bytes);
            let value = sigilaris_trie::get(&state.trie, store, config, &key)?;
            Ok((state, value))
        }),
    }
}

/// `write(tablePrefix, encKey, encVal)`: logs, then delegates to the trie.
pub fn write<'a>(
    store: &'a dyn NodeStore,
    config: &'a TrieConfig,
    table_prefix: Vec<u8>,
    enc_key: Vec<u8>,
    enc_val: Vec<u8>,
) -> StoreM<'a, ()> {
    StoreM {
        run: Box::new(move |mut state| {
            let full_key_bytes = full_key_bytes(&table_prefix, &enc_key);
            state.log.record_write(&table_prefix, &full_key_bytes);
            let key = Nibbles::from_bytes(&full_key_bytes);
            let new_trie = sigilaris_trie::put(state.trie, store, config, &key, &enc_val)?;
            Ok((
                StoreState {
                    trie: new_trie,
                    log: state.log,
                },
                (),
            ))
        }),
    }
}

/// `delete(tablePrefix, encKey)`: logs, then delegates to the trie. Returns
/// whether anything was actually removed.
pub fn delete<'a>(
    store: &'a dyn NodeStore,
    config: &'a TrieConfig,
    table_prefix: Vec<u8>,
    enc_key: Vec<u8>,
) -> StoreM<'a, bool> {
    StoreM {
        run: Box::new(move |mut state| {
            let full_key_bytes = full_key_bytes(&table_prefix, &enc_key);
            state.log.record_write(&table_prefix, &full_key_bytes);
            let key = Nibbles::from_bytes(&full_key_bytes);
            let (new_trie, removed) = sigilaris_trie::remove(state.trie, store, config, &key)?;
            Ok((
                StoreState {
                    trie: new_trie,
                    log: state.log,
                },
                removed,
            ))
        }),
    }
}

fn full_key_bytes(table_prefix: &[u8], enc_key: &[u8]) -> Vec<u8> {
    let mut out = table_prefix.to_vec();
    out.extend_from_slice(enc_key);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigilaris_trie::MemoryNodeStore;

    #[test]
    fn write_then_read_round_trips_and_logs_both() {
        let store = MemoryNodeStore::new();
        let config = TrieConfig::default();
        let prefix = b"accounts\x00".to_vec();

        let program = write(
            &store,
            &config,
            prefix.clone(),
            b"alice".to_vec(),
            b"info-bytes".to_vec(),
        )
        .and_then(|_| read(&store, &config, prefix.clone(), b"alice".to_vec()));

        let (state, value) = program.run(StoreState::default()).unwrap();
        assert_eq!(value, Some(b"info-bytes".to_vec()));
        assert_eq!(state.log.write_count(), 1);
        assert_eq!(state.log.read_count(), 1);
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let store = MemoryNodeStore::new();
        let config = TrieConfig::default();
        let prefix = b"accounts\x00".to_vec();

        let program = write(&store, &config, prefix.clone(), b"alice".to_vec(), b"x".to_vec())
            .and_then(|_| delete(&store, &config, prefix.clone(), b"alice".to_vec()))
            .and_then(|removed| delete(&store, &config, prefix, b"alice".to_vec()).map(move |second| (removed, second)));

        let (_, (first, second)) = program.run(StoreState::default()).unwrap();
        assert!(first);
        assert!(!second);
    }

    #[test]
    fn raise_short_circuits_without_touching_state() {
        let store = MemoryNodeStore::new();
        let config = TrieConfig::default();
        let prefix = b"accounts\x00".to_vec();

        let program: StoreM<()> = write(&store, &config, prefix, b"alice".to_vec(), b"x".to_vec())
            .and_then(|_| raise(StoreError::logical("nonce mismatch")));

        let err = program.run(StoreState::default()).unwrap_err();
        assert_eq!(err, StoreError::logical("nonce mismatch"));
    }
}
