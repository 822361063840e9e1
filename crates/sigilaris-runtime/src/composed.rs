use std::collections::HashMap;
use std::sync::Arc;

use sigilaris_crypto::{Hash32, Signature};
use sigilaris_store::{pure, StoreM};
use sigilaris_trie::{NodeStore, TrieConfig};

use crate::blueprint::{Reducer, StateModule};
use crate::error::RuntimeError;
use crate::types::{Account, Envelope, Event};

/// Bundles several mounted modules under a shared head segment.
/// Its `Reducer` impl is the router: it peels the first
/// remaining path segment off the transaction and dispatches to whichever
/// child claims it, so a `ComposedBlueprint` can itself be one child of an
/// enclosing `ComposedBlueprint`.
pub struct ComposedBlueprint {
    children: HashMap<String, Arc<StateModule>>,
}

impl ComposedBlueprint {
    pub fn new(children: Vec<(String, Arc<StateModule>)>) -> Self {
        ComposedBlueprint {
            children: children.into_iter().collect(),
        }
    }
}

impl Reducer for ComposedBlueprint {
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
    ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>> {
        let Some((head, tail)) = remaining_path.split_first() else {
            return pure(Err(RuntimeError::UnroutableModule(String::new())));
        };
        match self.children.get(head) {
            Some(module) => module.reducer.apply(
                tail, tx_type, payload, envelope, signer, sig, tx_hash, store, config,
            ),
            None => pure(Err(RuntimeError::UnroutableModule(head.clone()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TablesProvider;
    use sigilaris_store::{EntryMeta, Schema};
    use sigilaris_trie::{MemoryNodeStore, TrieConfig};

    fn sample_sig() -> Signature {
        Signature {
            v: 27,
            r: [0u8; 32],
            s: [0u8; 32],
        }
    }

    struct StubReducer;

    impl Reducer for StubReducer {
        fn apply<'a>(
            &self,
            remaining_path: &[String],
            _tx_type: &str,
            _payload: &[u8],
            _envelope: &Envelope,
            _signer: &Account,
            _sig: &Signature,
            _tx_hash: &Hash32,
            _store: &'a dyn NodeStore,
            _config: &'a TrieConfig,
        ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>> {
            if !remaining_path.is_empty() {
                return pure(Err(RuntimeError::UnroutableModule(remaining_path[0].clone())));
            }
            pure(Ok(vec![Event::new("Stubbed", ())]))
        }
    }

    fn stub_module(name: &str) -> Arc<StateModule> {
        let owns = Schema::new(vec![EntryMeta::new("rows")]);
        let mounted = sigilaris_store::MountedSchema::mount(&[name.to_string()], &owns).unwrap();
        Arc::new(StateModule {
            path: vec![name.to_string()],
            owns,
            needs: Schema::default(),
            tables: Arc::new(mounted),
            reducer: Arc::new(StubReducer),
            tx_registry: Default::default(),
            provider: TablesProvider::from_module(Arc::new(
                sigilaris_store::MountedSchema::mount(&[], &Schema::default()).unwrap(),
            )),
        })
    }

    #[test]
    fn routes_to_the_child_claiming_the_head_segment() {
        crate::test_support::init_tracing();
        let store = MemoryNodeStore::new();
        let config = TrieConfig::default();
        let composed = ComposedBlueprint::new(vec![
            ("accounts".to_string(), stub_module("accounts")),
            ("groups".to_string(), stub_module("groups")),
        ]);

        let envelope = Envelope {
            network_id: 1,
            created_at: sigilaris_codec::Instant::from_epoch_millis(0),
            memo: None,
        };
        let program = composed.apply(
            &["groups".to_string()],
            "CreateGroup",
            b"",
            &envelope,
            &Account::Named("alice".to_string()),
            &sample_sig(),
            &[0u8; 32],
            &store,
            &config,
        );
        let (_, result) = program
            .run(sigilaris_store::StoreState::default())
            .unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn unknown_head_segment_is_unroutable() {
        let store = MemoryNodeStore::new();
        let config = TrieConfig::default();
        let composed = ComposedBlueprint::new(vec![("accounts".to_string(), stub_module("accounts"))]);
        let envelope = Envelope {
            network_id: 1,
            created_at: sigilaris_codec::Instant::from_epoch_millis(0),
            memo: None,
        };
        let program = composed.apply(
            &["unknown".to_string()],
            "Foo",
            b"",
            &envelope,
            &Account::Named("alice".to_string()),
            &sample_sig(),
            &[0u8; 32],
            &store,
            &config,
        );
        let (_, result) = program
            .run(sigilaris_store::StoreState::default())
            .unwrap();
        assert_eq!(result, Err(RuntimeError::UnroutableModule("unknown".to_string())));
    }
}
