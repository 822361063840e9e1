use std::sync::Arc;

use sigilaris_codec::{CanonicalMap, CanonicalSet, Decode, DecodeError, Encode, Instant};
use sigilaris_crypto::{recover, Hash32, Signature};
use sigilaris_runtime::{
    key_id_of, pure_event_err, Account, Blueprint, Envelope, Event, KeyId20, Reducer, RuntimeError,
    TablesProvider, TxMeta, TxRegistry,
};
use sigilaris_store::{pure, table_prefix, EntryMeta, MountedSchema, Schema, StateTable, StoreError, StoreM};
use sigilaris_trie::{NodeStore, TrieConfig};

/// `accounts: Utf8 → AccountInfo`'s table marker.
pub struct AccountsTable;
/// `nameKey: (Utf8, KeyId20) → KeyInfo`'s table marker.
pub struct NameKeyTable;

pub const ACCOUNTS_TABLE: &str = "accounts";
pub const NAME_KEY_TABLE: &str = "nameKey";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    pub guardian: Option<Account>,
    pub nonce: i64,
}

impl Encode for AccountInfo {
    fn encode(&self, out: &mut Vec<u8>) {
        self.guardian.encode(out);
        self.nonce.encode(out);
    }
}

impl Decode for AccountInfo {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (guardian, rest) = Option::<Account>::decode(buf)?;
        let (nonce, rest) = i64::decode(rest)?;
        Ok((AccountInfo { guardian, nonce }, rest))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyInfo {
    pub added_at: Instant,
    pub expires_at: Option<Instant>,
    pub description: String,
}

impl Encode for KeyInfo {
    fn encode(&self, out: &mut Vec<u8>) {
        self.added_at.encode(out);
        self.expires_at.encode(out);
        self.description.encode(out);
    }
}

impl Decode for KeyInfo {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (added_at, rest) = Instant::decode(buf)?;
        let (expires_at, rest) = Option::<Instant>::decode(rest)?;
        let (description, rest) = String::decode(rest)?;
        Ok((
            KeyInfo {
                added_at,
                expires_at,
                description,
            },
            rest,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateNamedAccount {
    pub name: String,
    pub initial_key_id: KeyId20,
    pub guardian: Option<Account>,
}

impl Encode for CreateNamedAccount {
    fn encode(&self, out: &mut Vec<u8>) {
        self.name.encode(out);
        self.initial_key_id.encode(out);
        self.guardian.encode(out);
    }
}

impl Decode for CreateNamedAccount {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (name, rest) = String::decode(buf)?;
        let (initial_key_id, rest) = <[u8; 20]>::decode(rest)?;
        let (guardian, rest) = Option::<Account>::decode(rest)?;
        Ok((
            CreateNamedAccount {
                name,
                initial_key_id,
                guardian,
            },
            rest,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateAccount {
    pub name: String,
    pub nonce: i64,
    pub new_guardian: Option<Account>,
}

impl Encode for UpdateAccount {
    fn encode(&self, out: &mut Vec<u8>) {
        self.name.encode(out);
        self.nonce.encode(out);
        self.new_guardian.encode(out);
    }
}

impl Decode for UpdateAccount {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (name, rest) = String::decode(buf)?;
        let (nonce, rest) = i64::decode(rest)?;
        let (new_guardian, rest) = Option::<Account>::decode(rest)?;
        Ok((
            UpdateAccount {
                name,
                nonce,
                new_guardian,
            },
            rest,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddKeyIds {
    pub name: String,
    pub nonce: i64,
    pub key_ids: CanonicalMap<KeyId20, String>,
    pub expires_at: Option<Instant>,
}

impl Encode for AddKeyIds {
    fn encode(&self, out: &mut Vec<u8>) {
        self.name.encode(out);
        self.nonce.encode(out);
        self.key_ids.encode(out);
        self.expires_at.encode(out);
    }
}

impl Decode for AddKeyIds {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (name, rest) = String::decode(buf)?;
        let (nonce, rest) = i64::decode(rest)?;
        let (key_ids, rest) = CanonicalMap::<KeyId20, String>::decode(rest)?;
        let (expires_at, rest) = Option::<Instant>::decode(rest)?;
        Ok((
            AddKeyIds {
                name,
                nonce,
                key_ids,
                expires_at,
            },
            rest,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoveKeyIds {
    pub name: String,
    pub nonce: i64,
    pub key_ids: CanonicalSet<KeyId20>,
}

impl Encode for RemoveKeyIds {
    fn encode(&self, out: &mut Vec<u8>) {
        self.name.encode(out);
        self.nonce.encode(out);
        self.key_ids.encode(out);
    }
}

impl Decode for RemoveKeyIds {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (name, rest) = String::decode(buf)?;
        let (nonce, rest) = i64::decode(rest)?;
        let (key_ids, rest) = CanonicalSet::<KeyId20>::decode(rest)?;
        Ok((
            RemoveKeyIds {
                name,
                nonce,
                key_ids,
            },
            rest,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoveAccount {
    pub name: String,
    pub nonce: i64,
}

impl Encode for RemoveAccount {
    fn encode(&self, out: &mut Vec<u8>) {
        self.name.encode(out);
        self.nonce.encode(out);
    }
}

impl Decode for RemoveAccount {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (name, rest) = String::decode(buf)?;
        let (nonce, rest) = i64::decode(rest)?;
        Ok((RemoveAccount { name, nonce }, rest))
    }
}

/// `owns: { accounts, nameKey }`, `needs: {}`.
pub fn schema() -> Schema {
    Schema::new(vec![EntryMeta::new(ACCOUNTS_TABLE), EntryMeta::new(NAME_KEY_TABLE)])
}

fn tx_registry() -> TxRegistry {
    TxRegistry::new(vec![
        TxMeta {
            tx_type: "CreateNamedAccount".to_string(),
            reads: vec![ACCOUNTS_TABLE.to_string()],
            writes: vec![ACCOUNTS_TABLE.to_string(), NAME_KEY_TABLE.to_string()],
        },
        TxMeta {
            tx_type: "UpdateAccount".to_string(),
            reads: vec![ACCOUNTS_TABLE.to_string(), NAME_KEY_TABLE.to_string()],
            writes: vec![ACCOUNTS_TABLE.to_string()],
        },
        TxMeta {
            tx_type: "AddKeyIds".to_string(),
            reads: vec![ACCOUNTS_TABLE.to_string(), NAME_KEY_TABLE.to_string()],
            writes: vec![ACCOUNTS_TABLE.to_string(), NAME_KEY_TABLE.to_string()],
        },
        TxMeta {
            tx_type: "RemoveKeyIds".to_string(),
            reads: vec![ACCOUNTS_TABLE.to_string(), NAME_KEY_TABLE.to_string()],
            writes: vec![ACCOUNTS_TABLE.to_string(), NAME_KEY_TABLE.to_string()],
        },
        TxMeta {
            tx_type: "RemoveAccount".to_string(),
            reads: vec![ACCOUNTS_TABLE.to_string(), NAME_KEY_TABLE.to_string()],
            writes: vec![ACCOUNTS_TABLE.to_string()],
        },
    ])
}

/// Builds the Accounts [`Blueprint`] for mounting at `path`. `needs` is
/// empty, so the provider is a dummy handle over an empty mount — there is
/// nothing for `mount`'s `provider.narrow(&needs)` check to validate.
pub fn blueprint(path: &[String]) -> Blueprint {
    let accounts = StateTable::new(table_prefix(path, ACCOUNTS_TABLE));
    let name_key = StateTable::new(table_prefix(path, NAME_KEY_TABLE));
    let empty = MountedSchema::mount(&[], &Schema::default())
        .expect("mounting the empty schema at the empty path cannot fail");
    Blueprint {
        owns: schema(),
        needs: Schema::default(),
        reducer: Arc::new(AccountsReducer::new(accounts, name_key)),
        tx_registry: tx_registry(),
        provider: TablesProvider::from_module(Arc::new(empty)),
    }
}

/// Owns `accounts` and `nameKey`; needs nothing from any peer module. The
/// authorization contract here is reused verbatim by
/// [`crate::groups::GroupsReducer`] through its injected provider into
/// these same two tables.
pub struct AccountsReducer {
    accounts: StateTable<AccountsTable, String, AccountInfo>,
    name_key: StateTable<NameKeyTable, (String, KeyId20), KeyInfo>,
}

impl AccountsReducer {
    pub fn new(
        accounts: StateTable<AccountsTable, String, AccountInfo>,
        name_key: StateTable<NameKeyTable, (String, KeyId20), KeyInfo>,
    ) -> Self {
        AccountsReducer { accounts, name_key }
    }
}

/// Steps 2-5 of the shared pre-check: recover the
/// signature, then confirm the recovered key is one the claimed `account`
/// may act through. Step 6 (guardian authorization against a specific
/// target) is the caller's job, since only mutations that target an
/// *existing* account need it. `pub(crate)` so [`crate::groups`] can reuse
/// it verbatim.
pub(crate) fn verify_signer<'a>(
    name_key: &StateTable<NameKeyTable, (String, KeyId20), KeyInfo>,
    account: Account,
    tx_hash: Hash32,
    sig: Signature,
    created_at: Instant,
    store: &'a dyn NodeStore,
    config: &'a TrieConfig,
) -> StoreM<'a, Result<KeyId20, RuntimeError>> {
    let recovered = match recover(&sig, &tx_hash) {
        Ok(pk) => pk,
        Err(_) => return pure(Err(RuntimeError::Unauthorized)),
    };
    let recovered_key_id = key_id_of(&recovered);

    match account {
        Account::Named(name) => {
            let key = name_key.brand((name, recovered_key_id));
            name_key.get(store, config, &key).map(move |info| match info {
                None => Err(RuntimeError::Unauthorized),
                Some(info) => match info.expires_at {
                    Some(expires_at) if created_at.epoch_millis() > expires_at.epoch_millis() => {
                        Err(RuntimeError::Unauthorized)
                    }
                    _ => Ok(recovered_key_id),
                },
            })
        }
        Account::Unnamed(key_id) => {
            if key_id == recovered_key_id {
                pure(Ok(recovered_key_id))
            } else {
                pure(Err(RuntimeError::Unauthorized))
            }
        }
    }
}

/// Step 6: `account == Named(targetName) OR accounts[targetName].guardian
/// == Some(account)`. Loads the target row, failing with a `Logical`
/// not-found if it is absent (distinct from an authorization failure).
fn authorize_target<'a>(
    accounts: &StateTable<AccountsTable, String, AccountInfo>,
    account: Account,
    target_name: String,
    store: &'a dyn NodeStore,
    config: &'a TrieConfig,
) -> StoreM<'a, Result<AccountInfo, RuntimeError>> {
    let key = accounts.brand(target_name.clone());
    accounts.get(store, config, &key).map(move |existing| {
        let info = existing
            .ok_or_else(|| RuntimeError::Store(StoreError::logical(format!("account {target_name:?} not found"))))?;
        let authorized =
            account == Account::Named(target_name.clone()) || info.guardian.as_ref() == Some(&account);
        if !authorized {
            return Err(RuntimeError::Unauthorized);
        }
        Ok(info)
    })
}

/// Runs the shared pre-check (steps 2-6) against a named target: recover
/// and verify the signer, then load and authorize the target's row.
fn checked_target<'a>(
    accounts: StateTable<AccountsTable, String, AccountInfo>,
    name_key: StateTable<NameKeyTable, (String, KeyId20), KeyInfo>,
    account: Account,
    target_name: String,
    tx_hash: Hash32,
    sig: Signature,
    created_at: Instant,
    store: &'a dyn NodeStore,
    config: &'a TrieConfig,
) -> StoreM<'a, Result<AccountInfo, RuntimeError>> {
    verify_signer(&name_key, account.clone(), tx_hash, sig, created_at, store, config).and_then(
        move |verified| match verified {
            Err(e) => pure(Err(e)),
            Ok(_) => authorize_target(&accounts, account, target_name, store, config),
        },
    )
}

fn decode_payload<T: Decode>(payload: &[u8]) -> Result<T, RuntimeError> {
    T::decode_exact(payload).map_err(|e| RuntimeError::Store(StoreError::DecodeFailure(e)))
}

impl Reducer for AccountsReducer {
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
        if !remaining_path.is_empty() {
            return pure_event_err(RuntimeError::UnroutableModule(remaining_path[0].clone()));
        }

        let envelope = envelope.clone();
        let signer = signer.clone();
        let sig = *sig;
        let tx_hash = *tx_hash;

        match tx_type {
            "CreateNamedAccount" => {
                let tx: CreateNamedAccount = match decode_payload(payload) {
                    Ok(tx) => tx,
                    Err(e) => return pure_event_err(e),
                };
                self.create_named_account(tx, envelope, sig, tx_hash, store, config)
            }
            "UpdateAccount" => {
                let tx: UpdateAccount = match decode_payload(payload) {
                    Ok(tx) => tx,
                    Err(e) => return pure_event_err(e),
                };
                self.update_account(tx, envelope, signer, sig, tx_hash, store, config)
            }
            "AddKeyIds" => {
                let tx: AddKeyIds = match decode_payload(payload) {
                    Ok(tx) => tx,
                    Err(e) => return pure_event_err(e),
                };
                self.add_key_ids(tx, envelope, signer, sig, tx_hash, store, config)
            }
            "RemoveKeyIds" => {
                let tx: RemoveKeyIds = match decode_payload(payload) {
                    Ok(tx) => tx,
                    Err(e) => return pure_event_err(e),
                };
                self.remove_key_ids(tx, envelope, signer, sig, tx_hash, store, config)
            }
            "RemoveAccount" => {
                let tx: RemoveAccount = match decode_payload(payload) {
                    Ok(tx) => tx,
                    Err(e) => return pure_event_err(e),
                };
                self.remove_account(tx, envelope, signer, sig, tx_hash, store, config)
            }
            other => pure_event_err(RuntimeError::UnrecognizedTransaction {
                module: "accounts".to_string(),
                tx_type: other.to_string(),
            }),
        }
    }
}

impl AccountsReducer {
    fn create_named_account<'a>(
        &self,
        tx: CreateNamedAccount,
        envelope: Envelope,
        sig: Signature,
        tx_hash: Hash32,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
    ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>> {
        let recovered = match recover(&sig, &tx_hash) {
            Ok(pk) => pk,
            Err(_) => return pure_event_err(RuntimeError::Unauthorized),
        };
        if key_id_of(&recovered) != tx.initial_key_id {
            return pure_event_err(RuntimeError::Unauthorized);
        }

        let accounts = self.accounts.clone();
        let name_key = self.name_key.clone();
        let name = tx.name.clone();
        let initial_key_id = tx.initial_key_id;
        let guardian = tx.guardian.clone();
        let created_at = envelope.created_at;

        let key = accounts.brand(name.clone());
        accounts.get(store, config, &key).and_then(move |existing| {
            if existing.is_some() {
                return pure(Err(RuntimeError::Store(StoreError::logical(format!(
                    "account {name:?} already exists"
                )))));
            }
            let info = AccountInfo {
                guardian: guardian.clone(),
                nonce: 0,
            };
            let name_key_entry = name_key.brand((name.clone(), initial_key_id));
            let key_info = KeyInfo {
                added_at: created_at,
                expires_at: None,
                description: String::new(),
            };
            accounts
                .put(store, config, &key, &info)
                .and_then(move |_| name_key.put(store, config, &name_key_entry, &key_info))
                .map(move |_| {
                    Ok(vec![Event::new(
                        "AccountCreated",
                        (name.clone(), initial_key_id, guardian.clone()),
                    )])
                })
        })
    }

    fn update_account<'a>(
        &self,
        tx: UpdateAccount,
        envelope: Envelope,
        signer: Account,
        sig: Signature,
        tx_hash: Hash32,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
    ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>> {
        let accounts = self.accounts.clone();
        let name = tx.name.clone();
        let new_guardian = tx.new_guardian.clone();
        let nonce = tx.nonce;

        checked_target(
            self.accounts.clone(),
            self.name_key.clone(),
            signer,
            name.clone(),
            tx_hash,
            sig,
            envelope.created_at,
            store,
            config,
        )
        .and_then(move |checked| match checked {
            Err(e) => pure(Err(e)),
            Ok(info) => {
                if info.nonce != nonce {
                    return pure(Err(RuntimeError::Store(StoreError::logical(format!(
                        "Nonce mismatch: expected {}, got {nonce}",
                        info.nonce
                    )))));
                }
                let updated = AccountInfo {
                    guardian: new_guardian.clone(),
                    nonce: info.nonce + 1,
                };
                let key = accounts.brand(name.clone());
                accounts.put(store, config, &key, &updated).map(move |_| {
                    Ok(vec![Event::new(
                        "AccountUpdated",
                        (name.clone(), new_guardian.clone()),
                    )])
                })
            }
        })
    }

    fn add_key_ids<'a>(
        &self,
        tx: AddKeyIds,
        envelope: Envelope,
        signer: Account,
        sig: Signature,
        tx_hash: Hash32,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
    ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>> {
        let accounts = self.accounts.clone();
        let name_key = self.name_key.clone();
        let name = tx.name.clone();
        let nonce = tx.nonce;
        let created_at = envelope.created_at;
        let expires_at = tx.expires_at;
        let entries: Vec<(KeyId20, String)> = tx.key_ids.into_vec();

        checked_target(
            self.accounts.clone(),
            self.name_key.clone(),
            signer,
            name.clone(),
            tx_hash,
            sig,
            created_at,
            store,
            config,
        )
        .and_then(move |checked| match checked {
            Err(e) => pure(Err(e)),
            Ok(info) => {
                if info.nonce != nonce {
                    return pure(Err(RuntimeError::Store(StoreError::logical(format!(
                        "Nonce mismatch: expected {}, got {nonce}",
                        info.nonce
                    )))));
                }

                let mut chain: StoreM<'a, Vec<KeyId20>> = pure(Vec::new());
                for (kid, description) in entries {
                    let name_key = name_key.clone();
                    let name = name.clone();
                    let description = description.clone();
                    chain = chain.and_then(move |mut added| {
                        let key = name_key.brand((name.clone(), kid));
                        name_key.get(store, config, &key).and_then(move |existing| {
                            if existing.is_some() {
                                return pure(added);
                            }
                            let info = KeyInfo {
                                added_at: created_at,
                                expires_at,
                                description,
                            };
                            name_key.put(store, config, &key, &info).map(move |_| {
                                added.push(kid);
                                added
                            })
                        })
                    });
                }

                let accounts = accounts.clone();
                let name_final = name.clone();
                chain.and_then(move |added| {
                    let updated = AccountInfo {
                        guardian: info.guardian.clone(),
                        nonce: info.nonce + 1,
                    };
                    let key = accounts.brand(name_final.clone());
                    accounts.put(store, config, &key, &updated).map(move |_| {
                        Ok(vec![Event::new(
                            "KeysAdded",
                            CanonicalSet::from_vec(added.clone()),
                        )])
                    })
                })
            }
        })
    }

    fn remove_key_ids<'a>(
        &self,
        tx: RemoveKeyIds,
        envelope: Envelope,
        signer: Account,
        sig: Signature,
        tx_hash: Hash32,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
    ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>> {
        let accounts = self.accounts.clone();
        let name_key = self.name_key.clone();
        let name = tx.name.clone();
        let nonce = tx.nonce;
        let key_ids: Vec<KeyId20> = tx.key_ids.into_vec();

        checked_target(
            self.accounts.clone(),
            self.name_key.clone(),
            signer,
            name.clone(),
            tx_hash,
            sig,
            envelope.created_at,
            store,
            config,
        )
        .and_then(move |checked| match checked {
            Err(e) => pure(Err(e)),
            Ok(info) => {
                if info.nonce != nonce {
                    return pure(Err(RuntimeError::Store(StoreError::logical(format!(
                        "Nonce mismatch: expected {}, got {nonce}",
                        info.nonce
                    )))));
                }

                let mut chain: StoreM<'a, Vec<KeyId20>> = pure(Vec::new());
                for kid in key_ids {
                    let name_key = name_key.clone();
                    let name = name.clone();
                    chain = chain.and_then(move |mut removed| {
                        let key = name_key.brand((name.clone(), kid));
                        name_key.remove(store, config, &key).map(move |did_remove| {
                            if did_remove {
                                removed.push(kid);
                            }
                            removed
                        })
                    });
                }

                let accounts = accounts.clone();
                let name_final = name.clone();
                chain.and_then(move |removed| {
                    let updated = AccountInfo {
                        guardian: info.guardian.clone(),
                        nonce: info.nonce + 1,
                    };
                    let key = accounts.brand(name_final.clone());
                    accounts.put(store, config, &key, &updated).map(move |_| {
                        Ok(vec![Event::new(
                            "KeysRemoved",
                            CanonicalSet::from_vec(removed.clone()),
                        )])
                    })
                })
            }
        })
    }

    fn remove_account<'a>(
        &self,
        tx: RemoveAccount,
        envelope: Envelope,
        signer: Account,
        sig: Signature,
        tx_hash: Hash32,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
    ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>> {
        let accounts = self.accounts.clone();
        let name = tx.name.clone();
        let nonce = tx.nonce;

        checked_target(
            self.accounts.clone(),
            self.name_key.clone(),
            signer,
            name.clone(),
            tx_hash,
            sig,
            envelope.created_at,
            store,
            config,
        )
        .and_then(move |checked| match checked {
            Err(e) => pure(Err(e)),
            Ok(info) => {
                if info.nonce != nonce {
                    return pure(Err(RuntimeError::Store(StoreError::logical(format!(
                        "Nonce mismatch: expected {}, got {nonce}",
                        info.nonce
                    )))));
                }
                let key = accounts.brand(name.clone());
                accounts.remove(store, config, &key).map(move |_| {
                    Ok(vec![Event::new("AccountRemoved", name.clone())])
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigilaris_crypto::{sign, KeyPair};
    use sigilaris_store::StoreState;
    use sigilaris_trie::MemoryNodeStore;

    fn reducer() -> AccountsReducer {
        AccountsReducer::new(
            StateTable::new(table_prefix(&[], ACCOUNTS_TABLE)),
            StateTable::new(table_prefix(&[], NAME_KEY_TABLE)),
        )
    }

    fn envelope(created_at_millis: i64) -> Envelope {
        Envelope {
            network_id: 1,
            created_at: Instant::from_epoch_millis(created_at_millis),
            memo: None,
        }
    }

    fn run<'a>(
        reducer: &AccountsReducer,
        store: &'a MemoryNodeStore,
        config: &'a TrieConfig,
        state: StoreState,
        tx_type: &str,
        payload: Vec<u8>,
        envelope: Envelope,
        signer: Account,
        sig: Signature,
    ) -> Result<(StoreState, Result<Vec<Event>, RuntimeError>), StoreError> {
        let tx_hash = sigilaris_crypto::keccak256(&payload);
        reducer
            .apply(&[], tx_type, &payload, &envelope, &signer, &sig, &tx_hash, store, config)
            .run(state)
    }

    #[test]
    fn create_named_account_then_update_then_replay_fails() {
        let store = MemoryNodeStore::new();
        let config = TrieConfig::default();
        let reducer = reducer();

        let mut d = [0u8; 32];
        d[31] = 7;
        let kp = KeyPair::from_private(&d).unwrap();
        let key_id = key_id_of(&kp.public_key());

        let create = CreateNamedAccount {
            name: "alice".to_string(),
            initial_key_id: key_id,
            guardian: None,
        };
        let payload = create.encode_to_vec();
        let tx_hash = sigilaris_crypto::keccak256(&payload);
        let sig = sign(&kp, &tx_hash).unwrap();

        let (state, result) = run(
            &reducer,
            &store,
            &config,
            StoreState::default(),
            "CreateNamedAccount",
            payload,
            envelope(1_000),
            Account::Unnamed(key_id),
            sig,
        )
        .unwrap();
        let events = result.unwrap();
        assert_eq!(events[0].name, "AccountCreated");

        let update = UpdateAccount {
            name: "alice".to_string(),
            nonce: 0,
            new_guardian: Some(Account::Named("bob".to_string())),
        };
        let payload = update.encode_to_vec();
        let tx_hash = sigilaris_crypto::keccak256(&payload);
        let sig = sign(&kp, &tx_hash).unwrap();

        let (state, result) = run(
            &reducer,
            &store,
            &config,
            state,
            "UpdateAccount",
            payload.clone(),
            envelope(2_000),
            Account::Named("alice".to_string()),
            sig,
        )
        .unwrap();
        result.unwrap();

        let key = reducer.accounts.brand("alice".to_string());
        let (_, info) = reducer.accounts.get(&store, &config, &key).run(state.clone()).unwrap();
        assert_eq!(info.unwrap().nonce, 1);

        // Replaying the same UpdateAccount (still nonce 0) must fail now.
        let err = run(
            &reducer,
            &store,
            &config,
            state,
            "UpdateAccount",
            payload,
            envelope(2_000),
            Account::Named("alice".to_string()),
            sig,
        )
        .unwrap()
        .1
        .unwrap_err();
        assert!(matches!(err, RuntimeError::Store(StoreError::Logical(_))));
    }

    #[test]
    fn create_named_account_rejects_mismatched_signature() {
        let store = MemoryNodeStore::new();
        let config = TrieConfig::default();
        let reducer = reducer();

        let mut d = [0u8; 32];
        d[31] = 9;
        let kp = KeyPair::from_private(&d).unwrap();
        let other_key_id = [0xAAu8; 20];

        let create = CreateNamedAccount {
            name: "mallory".to_string(),
            initial_key_id: other_key_id,
            guardian: None,
        };
        let payload = create.encode_to_vec();
        let tx_hash = sigilaris_crypto::keccak256(&payload);
        let sig = sign(&kp, &tx_hash).unwrap();

        let err = run(
            &reducer,
            &store,
            &config,
            StoreState::default(),
            "CreateNamedAccount",
            payload,
            envelope(0),
            Account::Unnamed(other_key_id),
            sig,
        )
        .unwrap()
        .1
        .unwrap_err();
        assert_eq!(err, RuntimeError::Unauthorized);
    }

    #[test]
    fn add_key_ids_is_idempotent_for_already_registered_keys() {
        let store = MemoryNodeStore::new();
        let config = TrieConfig::default();
        let reducer = reducer();

        let mut d = [0u8; 32];
        d[31] = 3;
        let kp = KeyPair::from_private(&d).unwrap();
        let key_id = key_id_of(&kp.public_key());

        let create = CreateNamedAccount {
            name: "carol".to_string(),
            initial_key_id: key_id,
            guardian: None,
        };
        let payload = create.encode_to_vec();
        let tx_hash = sigilaris_crypto::keccak256(&payload);
        let sig = sign(&kp, &tx_hash).unwrap();
        let (state, _) = run(
            &reducer,
            &store,
            &config,
            StoreState::default(),
            "CreateNamedAccount",
            payload,
            envelope(0),
            Account::Unnamed(key_id),
            sig,
        )
        .unwrap();

        let add = CanonicalMap::from_vec(vec![(key_id, "dup".to_string()), ([1u8; 20], "fresh".to_string())]);
        let tx = AddKeyIds {
            name: "carol".to_string(),
            nonce: 0,
            key_ids: add,
            expires_at: None,
        };
        let payload = tx.encode_to_vec();
        let tx_hash = sigilaris_crypto::keccak256(&payload);
        let sig = sign(&kp, &tx_hash).unwrap();
        let (_, result) = run(
            &reducer,
            &store,
            &config,
            state,
            "AddKeyIds",
            payload,
            envelope(0),
            Account::Named("carol".to_string()),
            sig,
        )
        .unwrap();
        let events = result.unwrap();
        assert_eq!(events[0].name, "KeysAdded");
        let (added, rest) = CanonicalSet::<KeyId20>::decode(&events[0].fields).unwrap();
        assert!(rest.is_empty());
        // Only the fresh key id was actually added; the duplicate was skipped.
        assert_eq!(added.into_vec(), vec![[1u8; 20]]);
    }
}
