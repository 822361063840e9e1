use sigilaris_store::StoreState;
use sigilaris_trie::{NodeStore, TrieConfig};

use crate::blueprint::Reducer;
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::transaction::RawTransaction;
use crate::types::Event;

/// A reducer branch that recognized the transaction but rejects it before
/// touching the store: wraps `err` as the effect's success-channel
/// `Result::Err`, so the caller still gets back an access log: a reducer
/// is total, it never panics on a recognized-but-invalid transaction.
pub fn pure_event_err<'a>(err: RuntimeError) -> sigilaris_store::StoreM<'a, Result<Vec<Event>, RuntimeError>> {
    sigilaris_store::pure(Err(err))
}

/// Runs one transaction against `reducer`, implementing the runtime's
/// per-transaction execution semantics:
///
/// 1. Recover the signer (the structural/type-level validation the source
///    does at the proof layer — here, a failed recovery is itself the
///    rejection).
/// 2. Begin with `state`.
/// 3. Run the reducer.
/// 4. On success, return the committed `(StoreState, [Event])` — the
///    caller treats this as atomic.
/// 5. On any failure (hard store error, or a logical rejection the
///    reducer returned), discard the state transition entirely and
///    surface the error; the access log accrued so far is still attached
///    to the error's originating `StoreState` is not retained by this
///    function, since conflict analysis of failed attempts is left to
///    the caller holding the pre-attempt log.
pub fn execute_transaction<'a>(
    reducer: &dyn Reducer,
    tx: &RawTransaction,
    store: &'a dyn NodeStore,
    config: &'a TrieConfig,
    runtime_config: &RuntimeConfig,
    state: StoreState,
) -> Result<(StoreState, Vec<Event>), RuntimeError> {
    // Signature recovery and the account-specific authorization checks
    // (registered key, expiry, guardian) live inside the reducer, which
    // already has the table access it needs to look them up.
    let tx_hash = tx.tx_hash();
    let program = reducer.apply(
        &tx.module_path,
        &tx.tx_type,
        &tx.payload,
        &tx.envelope,
        &tx.signature.account,
        &tx.signature.sig,
        &tx_hash,
        store,
        config,
    );

    let (new_state, outcome) = program.run(state)?;

    let events = outcome?;

    if new_state
        .log
        .exceeds_limits(runtime_config.max_reads, runtime_config.max_writes)
    {
        return Err(RuntimeError::LimitExceeded {
            reads: new_state.log.read_count(),
            max_reads: runtime_config.max_reads,
            writes: new_state.log.write_count(),
            max_writes: runtime_config.max_writes,
        });
    }

    Ok((new_state, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, AccountSignature, Envelope};
    use sigilaris_codec::Instant;
    use sigilaris_crypto::{Hash32, Signature};
    use sigilaris_store::pure;
    use sigilaris_trie::MemoryNodeStore;

    struct AlwaysSucceeds;

    impl Reducer for AlwaysSucceeds {
        fn apply<'a>(
            &self,
            _remaining_path: &[String],
            _tx_type: &str,
            _payload: &[u8],
            _envelope: &Envelope,
            _signer: &Account,
            _sig: &Signature,
            _tx_hash: &Hash32,
            _store: &'a dyn NodeStore,
            _config: &'a TrieConfig,
        ) -> sigilaris_store::StoreM<'a, Result<Vec<Event>, RuntimeError>> {
            pure(Ok(vec![Event::new("Did", ())]))
        }
    }

    struct AlwaysRejects;

    impl Reducer for AlwaysRejects {
        fn apply<'a>(
            &self,
            _remaining_path: &[String],
            _tx_type: &str,
            _payload: &[u8],
            _envelope: &Envelope,
            _signer: &Account,
            _sig: &Signature,
            _tx_hash: &Hash32,
            _store: &'a dyn NodeStore,
            _config: &'a TrieConfig,
        ) -> sigilaris_store::StoreM<'a, Result<Vec<Event>, RuntimeError>> {
            pure(Err(RuntimeError::Unauthorized))
        }
    }

    fn sample_tx() -> RawTransaction {
        RawTransaction {
            module_path: vec![],
            tx_type: "Noop".to_string(),
            payload: b"x".to_vec(),
            envelope: Envelope {
                network_id: 1,
                created_at: Instant::from_epoch_millis(0),
                memo: None,
            },
            signature: AccountSignature {
                account: Account::Named("alice".to_string()),
                sig: Signature {
                    v: 27,
                    r: [0u8; 32],
                    s: [0u8; 32],
                },
            },
        }
    }

    #[test]
    fn successful_reducer_returns_its_events() {
        crate::test_support::init_tracing();
        let store = MemoryNodeStore::new();
        let config = TrieConfig::default();
        let runtime_config = RuntimeConfig::default();
        let (_, events) = execute_transaction(
            &AlwaysSucceeds,
            &sample_tx(),
            &store,
            &config,
            &runtime_config,
            StoreState::default(),
        )
        .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn rejected_reducer_surfaces_its_error() {
        crate::test_support::init_tracing();
        let store = MemoryNodeStore::new();
        let config = TrieConfig::default();
        let runtime_config = RuntimeConfig::default();
        let err = execute_transaction(
            &AlwaysRejects,
            &sample_tx(),
            &store,
            &config,
            &runtime_config,
            StoreState::default(),
        )
        .unwrap_err();
        assert_eq!(err, RuntimeError::Unauthorized);
    }
}
