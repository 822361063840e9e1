use std::collections::HashSet;
use std::marker::PhantomData;

use sigilaris_codec::{Decode, Encode};
use sigilaris_trie::{NodeStore, TrieConfig};

use crate::effect::{delete, read, write, StoreM};
use crate::error::StoreError;
use crate::path::table_prefix;

/// A schema entry's name, carried independently of its `K`/`V` types so a
/// whole `Schema` can be a plain `Vec<EntryMeta>`: schemas lowered to
/// runtime-validated data rather than typeclass machinery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryMeta {
    pub name: String,
}

impl EntryMeta {
    pub fn new(name: impl Into<String>) -> Self {
        EntryMeta { name: name.into() }
    }
}

/// An ordered tuple of table names — the runtime stand-in for the source's
/// compile-time-checked `Entry<Name, K, V>` tuples.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema(Vec<EntryMeta>);

impl Schema {
    pub fn new(entries: Vec<EntryMeta>) -> Self {
        Schema(entries)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|e| e.name == name)
    }

    pub fn entries(&self) -> &[EntryMeta] {
        &self.0
    }
}

/// `mount(path, schema)`'s two mandatory proofs: unique
/// names, and (trivially, given [`crate::path`]'s sentinel-terminated
/// encoding) prefix-free table prefixes. Returns the computed prefix for
/// each entry, keyed by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MountedSchema {
    path: Vec<String>,
    prefixes: Vec<(String, Vec<u8>)>,
}

impl MountedSchema {
    pub fn mount(path: &[String], schema: &Schema) -> Result<MountedSchema, StoreError> {
        let mut seen = HashSet::new();
        let mut prefixes = Vec::with_capacity(schema.entries().len());
        for entry in schema.entries() {
            if !seen.insert(entry.name.clone()) {
                return Err(StoreError::Schema(format!(
                    "duplicate table name {:?} in schema mounted at {:?}",
                    entry.name, path
                )));
            }
            prefixes.push((entry.name.clone(), table_prefix(path, &entry.name)));
        }
        // Prefix-freedom is structurally guaranteed by the sentinel-terminated
        // segment encoding (see `path::encode_segment`) for any two entries
        // with distinct names under the same mount path. Verify it anyway —
        // a violation here means the encoding itself regressed, a
        // configuration bug worth failing loudly on rather than silently
        // trusting.
        for i in 0..prefixes.len() {
            for j in 0..prefixes.len() {
                if i != j && prefixes[j].1.starts_with(&prefixes[i].1) {
                    return Err(StoreError::Schema(format!(
                        "table prefix for {:?} is a prefix of the one for {:?}",
                        prefixes[i].0, prefixes[j].0
                    )));
                }
            }
        }
        Ok(MountedSchema {
            path: path.to_vec(),
            prefixes,
        })
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn prefix_of(&self, name: &str) -> Option<&[u8]> {
        self.prefixes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p.as_slice())
    }

    /// Checks `needs ⊆ owns ∪ peer` for a dependent module: every name the
    /// `needs` schema lists must be present in `self`.
    pub fn satisfies(&self, needs: &Schema) -> bool {
        needs.names().all(|name| self.prefix_of(name).is_some())
    }
}

/// A key branded for table `Table`, a zero-cost nominal wrapper
/// so a key meant for one table cannot be passed to
/// another's `get`/`put`/`remove` without going through that table's own
/// `brand`.
pub struct BrandedKey<Table, K> {
    key: K,
    _table: PhantomData<fn() -> Table>,
}

impl<Table, K> BrandedKey<Table, K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn into_key(self) -> K {
        self.key
    }
}

/// A handle to one mounted table, `Entry<Name, K, V>` lowered to a
/// concrete, runtime-validated `tablePrefix` plus the `K`/`V` codecs
/// carried at the type level.
pub struct StateTable<Table, K, V> {
    table_prefix: Vec<u8>,
    _marker: PhantomData<fn() -> (Table, K, V)>,
}

// Hand-written rather than `#[derive(Clone)]`: the derive would require
// `Table: Clone` even though the marker is only ever used as a
// zero-sized phantom type, which most table markers never implement.
impl<Table, K, V> Clone for StateTable<Table, K, V> {
    fn clone(&self) -> Self {
        StateTable {
            table_prefix: self.table_prefix.clone(),
            _marker: PhantomData,
        }
    }
}

impl<Table, K, V> StateTable<Table, K, V>
where
    K: Encode + Decode,
    V: Encode + Decode,
{
    pub fn new(table_prefix: Vec<u8>) -> Self {
        StateTable {
            table_prefix,
            _marker: PhantomData,
        }
    }

    pub fn from_mount(mounted: &MountedSchema, name: &str) -> Result<Self, StoreError> {
        let prefix = mounted.prefix_of(name).ok_or_else(|| {
            StoreError::Schema(format!("table {name:?} not present in mounted schema"))
        })?;
        Ok(StateTable::new(prefix.to_vec()))
    }

    pub fn brand(&self, key: K) -> BrandedKey<Table, K> {
        BrandedKey {
            key,
            _table: PhantomData,
        }
    }

    pub fn get<'a>(
        &self,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
        key: &BrandedKey<Table, K>,
    ) -> StoreM<'a, Option<V>> {
        let enc_key = key.key.encode_to_vec();
        read(store, config, self.table_prefix.clone(), enc_key).and_then(|raw| match raw {
            None => crate::effect::pure(None),
            Some(bytes) => match V::decode_exact(&bytes) {
                Ok(value) => crate::effect::pure(Some(value)),
                Err(e) => crate::effect::raise(StoreError::DecodeFailure(e)),
            },
        })
    }

    pub fn put<'a>(
        &self,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
        key: &BrandedKey<Table, K>,
        value: &V,
    ) -> StoreM<'a, ()> {
        let enc_key = key.key.encode_to_vec();
        let enc_val = value.encode_to_vec();
        write(store, config, self.table_prefix.clone(), enc_key, enc_val)
    }

    pub fn remove<'a>(
        &self,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
        key: &BrandedKey<Table, K>,
    ) -> StoreM<'a, bool> {
        let enc_key = key.key.encode_to_vec();
        delete(store, config, self.table_prefix.clone(), enc_key)
    }

    pub fn table_prefix(&self) -> &[u8] {
        &self.table_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::StoreState;
    use sigilaris_trie::MemoryNodeStore;

    struct Accounts;

    #[test]
    fn mount_rejects_duplicate_names() {
        let schema = Schema::new(vec![EntryMeta::new("accounts"), EntryMeta::new("accounts")]);
        assert!(MountedSchema::mount(&[], &schema).is_err());
    }

    #[test]
    fn mount_accepts_distinct_names_and_needs_check_passes() {
        let owns = Schema::new(vec![EntryMeta::new("accounts"), EntryMeta::new("nameKey")]);
        let mounted = MountedSchema::mount(&[], &owns).unwrap();
        let needs = Schema::new(vec![EntryMeta::new("accounts")]);
        assert!(mounted.satisfies(&needs));

        let missing = Schema::new(vec![EntryMeta::new("groups")]);
        assert!(!mounted.satisfies(&missing));
    }

    #[test]
    fn table_put_get_round_trips_through_the_trie() {
        let store = MemoryNodeStore::new();
        let config = TrieConfig::default();
        let owns = Schema::new(vec![EntryMeta::new("accounts")]);
        let mounted = MountedSchema::mount(&["accounts_module".to_string()], &owns).unwrap();
        let table: StateTable<Accounts, String, i64> =
            StateTable::from_mount(&mounted, "accounts").unwrap();

        let key = table.brand("alice".to_string());
        let program = table
            .put(&store, &config, &key, &42i64)
            .and_then(|_| table.get(&store, &config, &key));

        let (_, got) = program.run(StoreState::default()).unwrap();
        assert_eq!(got, Some(42i64));
    }
}
