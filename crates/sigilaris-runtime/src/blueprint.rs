use std::sync::Arc;

use sigilaris_crypto::{Hash32, Signature};
use sigilaris_store::{MountedSchema, Schema, StoreM};
use sigilaris_trie::{NodeStore, TrieConfig};

use crate::error::RuntimeError;
use crate::provider::TablesProvider;
use crate::types::{Account, Envelope, Event};

/// A recognized transaction type for a module, with the table projections
/// it touches — used for documentation and for a runtime that wants to
/// pre-check a transaction's declared footprint before running it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxMeta {
    pub tx_type: String,
    pub reads: Vec<String>,
    pub writes: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxRegistry(Vec<TxMeta>);

impl TxRegistry {
    pub fn new(entries: Vec<TxMeta>) -> Self {
        TxRegistry(entries)
    }

    pub fn recognizes(&self, tx_type: &str) -> bool {
        self.0.iter().any(|m| m.tx_type == tx_type)
    }

    pub fn entries(&self) -> &[TxMeta] {
        &self.0
    }
}

/// The path-independent specification of a state module.
/// `reducer.apply` is total over any `(remaining_path, tx_type)` pair: it
/// either recognizes and runs the transaction, or returns a
/// [`RuntimeError`] inside the store effect's success channel rather than
/// panicking, so the caller always gets back an access log.
pub trait Reducer: Send + Sync {
    /// `remaining_path` is what is left of the transaction's `module_path`
    /// after every enclosing `ComposedBlueprint` has peeled its own head
    /// segment off; a leaf reducer expects it to be empty.
    #[allow(clippy::too_many_arguments)]
    fn apply<'a>(
        &self,
        remaining_path: &[String],
        tx_type: &str,
        payload: &[u8],
        envelope: &Envelope,
        signer: &Account,
        sig: &Signature,
        tx_hash: &Hash32,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
    ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>>;
}

/// The path-independent specification of a state module: the tables it
/// owns and needs, its reducer, the transaction types it recognizes, and
/// the provider through which it reads tables it `needs` from a peer
/// that was already mounted.
pub struct Blueprint {
    pub owns: Schema,
    pub needs: Schema,
    pub reducer: Arc<dyn Reducer>,
    pub tx_registry: TxRegistry,
    pub provider: TablesProvider,
}

/// The result of mounting a [`Blueprint`] at a `Path`: computed table
/// prefixes, ready for the reducer to read and write through.
pub struct StateModule {
    pub path: Vec<String>,
    pub owns: Schema,
    pub needs: Schema,
    pub tables: Arc<MountedSchema>,
    pub reducer: Arc<dyn Reducer>,
    pub tx_registry: TxRegistry,
    pub provider: TablesProvider,
}

/// Mounts `blueprint` at `path`: computes table prefixes for `owns`
/// (validating unique names and prefix-freedom) and checks
/// that `blueprint.provider` already satisfies `blueprint.needs`.
pub fn mount(path: &[String], blueprint: Blueprint) -> Result<StateModule, RuntimeError> {
    let mounted = MountedSchema::mount(path, &blueprint.owns)?;
    blueprint.provider.narrow(&blueprint.needs)?;
    Ok(StateModule {
        path: path.to_vec(),
        owns: blueprint.owns,
        needs: blueprint.needs,
        tables: Arc::new(mounted),
        reducer: blueprint.reducer,
        tx_registry: blueprint.tx_registry,
        provider: blueprint.provider,
    })
}

impl StateModule {
    pub fn tables_provider(&self) -> TablesProvider {
        TablesProvider::from_module(Arc::clone(&self.tables))
    }
}
