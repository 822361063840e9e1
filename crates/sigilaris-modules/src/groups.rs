use std::sync::Arc;

use sigilaris_codec::{CanonicalSet, Decode, DecodeError, Encode, Instant};
use sigilaris_crypto::{Hash32, Signature};
use sigilaris_runtime::{
    pure_event_err, Account, Blueprint, Envelope, Event, Reducer, RuntimeError, TablesProvider,
    TxMeta, TxRegistry,
};
use sigilaris_store::{pure, table_prefix, EntryMeta, MountedSchema, Schema, StateTable, StoreError, StoreM};
use sigilaris_trie::{NodeStore, TrieConfig};

use crate::accounts::{self, AccountInfo, AccountsTable, KeyInfo, NameKeyTable, ACCOUNTS_TABLE, NAME_KEY_TABLE};

/// A group's id, a separate namespace from any account or key name
/// (`GroupData` carries its own `name` alongside the row's `GroupId` key).
pub type GroupId = String;

/// `groups: Utf8 → GroupData`'s table marker.
pub struct GroupsTable;
/// `groupAccounts: (GroupId, Account) → Unit`'s table marker.
pub struct GroupAccountsTable;

pub const GROUPS_TABLE: &str = "groups";
pub const GROUP_ACCOUNTS_TABLE: &str = "groupAccounts";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupData {
    pub name: String,
    pub coordinator: Account,
    pub nonce: i64,
    pub member_count: i64,
    pub created_at: Instant,
}

impl Encode for GroupData {
    fn encode(&self, out: &mut Vec<u8>) {
        self.name.encode(out);
        self.coordinator.encode(out);
        self.nonce.encode(out);
        self.member_count.encode(out);
        self.created_at.encode(out);
    }
}

impl Decode for GroupData {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (name, rest) = String::decode(buf)?;
        let (coordinator, rest) = Account::decode(rest)?;
        let (nonce, rest) = i64::decode(rest)?;
        let (member_count, rest) = i64::decode(rest)?;
        let (created_at, rest) = Instant::decode(rest)?;
        Ok((
            GroupData {
                name,
                coordinator,
                nonce,
                member_count,
                created_at,
            },
            rest,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateGroup {
    pub group_id: GroupId,
    pub name: String,
    pub coordinator: Account,
}

impl Encode for CreateGroup {
    fn encode(&self, out: &mut Vec<u8>) {
        self.group_id.encode(out);
        self.name.encode(out);
        self.coordinator.encode(out);
    }
}

impl Decode for CreateGroup {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (group_id, rest) = String::decode(buf)?;
        let (name, rest) = String::decode(rest)?;
        let (coordinator, rest) = Account::decode(rest)?;
        Ok((
            CreateGroup {
                group_id,
                name,
                coordinator,
            },
            rest,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisbandGroup {
    pub group_id: GroupId,
    pub group_nonce: i64,
}

impl Encode for DisbandGroup {
    fn encode(&self, out: &mut Vec<u8>) {
        self.group_id.encode(out);
        self.group_nonce.encode(out);
    }
}

impl Decode for DisbandGroup {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (group_id, rest) = String::decode(buf)?;
        let (group_nonce, rest) = i64::decode(rest)?;
        Ok((
            DisbandGroup {
                group_id,
                group_nonce,
            },
            rest,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddAccounts {
    pub group_id: GroupId,
    pub accounts: CanonicalSet<Account>,
    pub group_nonce: i64,
}

impl Encode for AddAccounts {
    fn encode(&self, out: &mut Vec<u8>) {
        self.group_id.encode(out);
        self.accounts.encode(out);
        self.group_nonce.encode(out);
    }
}

impl Decode for AddAccounts {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (group_id, rest) = String::decode(buf)?;
        let (accounts, rest) = CanonicalSet::<Account>::decode(rest)?;
        let (group_nonce, rest) = i64::decode(rest)?;
        Ok((
            AddAccounts {
                group_id,
                accounts,
                group_nonce,
            },
            rest,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoveAccounts {
    pub group_id: GroupId,
    pub accounts: CanonicalSet<Account>,
    pub group_nonce: i64,
}

impl Encode for RemoveAccounts {
    fn encode(&self, out: &mut Vec<u8>) {
        self.group_id.encode(out);
        self.accounts.encode(out);
        self.group_nonce.encode(out);
    }
}

impl Decode for RemoveAccounts {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (group_id, rest) = String::decode(buf)?;
        let (accounts, rest) = CanonicalSet::<Account>::decode(rest)?;
        let (group_nonce, rest) = i64::decode(rest)?;
        Ok((
            RemoveAccounts {
                group_id,
                accounts,
                group_nonce,
            },
            rest,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplaceCoordinator {
    pub group_id: GroupId,
    pub new_coordinator: Account,
    pub group_nonce: i64,
}

impl Encode for ReplaceCoordinator {
    fn encode(&self, out: &mut Vec<u8>) {
        self.group_id.encode(out);
        self.new_coordinator.encode(out);
        self.group_nonce.encode(out);
    }
}

impl Decode for ReplaceCoordinator {
    fn decode(buf: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let (group_id, rest) = String::decode(buf)?;
        let (new_coordinator, rest) = Account::decode(rest)?;
        let (group_nonce, rest) = i64::decode(rest)?;
        Ok((
            ReplaceCoordinator {
                group_id,
                new_coordinator,
                group_nonce,
            },
            rest,
        ))
    }
}

pub fn schema() -> Schema {
    Schema::new(vec![EntryMeta::new(GROUPS_TABLE), EntryMeta::new(GROUP_ACCOUNTS_TABLE)])
}

/// `needs: { accounts.accounts, accounts.nameKey }`: Groups
/// reuses Accounts' `nameKey` for its own signer pre-check, and its
/// `accounts` table to confirm a named account exists before admitting it
/// to a group.
fn needs_schema() -> Schema {
    Schema::new(vec![EntryMeta::new(ACCOUNTS_TABLE), EntryMeta::new(NAME_KEY_TABLE)])
}

fn tx_registry() -> TxRegistry {
    TxRegistry::new(vec![
        TxMeta {
            tx_type: "CreateGroup".to_string(),
            reads: vec![GROUPS_TABLE.to_string()],
            writes: vec![GROUPS_TABLE.to_string()],
        },
        TxMeta {
            tx_type: "DisbandGroup".to_string(),
            reads: vec![GROUPS_TABLE.to_string()],
            writes: vec![GROUPS_TABLE.to_string()],
        },
        TxMeta {
            tx_type: "AddAccounts".to_string(),
            reads: vec![GROUPS_TABLE.to_string(), ACCOUNTS_TABLE.to_string()],
            writes: vec![GROUPS_TABLE.to_string(), GROUP_ACCOUNTS_TABLE.to_string()],
        },
        TxMeta {
            tx_type: "RemoveAccounts".to_string(),
            reads: vec![GROUPS_TABLE.to_string()],
            writes: vec![GROUPS_TABLE.to_string(), GROUP_ACCOUNTS_TABLE.to_string()],
        },
        TxMeta {
            tx_type: "ReplaceCoordinator".to_string(),
            reads: vec![GROUPS_TABLE.to_string()],
            writes: vec![GROUPS_TABLE.to_string()],
        },
    ])
}

/// Builds the Groups [`Blueprint`] for mounting at `path`, given a
/// `provider` over the already-mounted Accounts module (its `accounts` and
/// `nameKey` tables). `accounts_path` is the path Accounts was itself
/// mounted at — needed to recompute the `StateTable` handles this reducer
/// reads through, since a `TablesProvider` hands back byte prefixes, not
/// typed table handles.
pub fn blueprint(path: &[String], accounts_path: &[String], provider: TablesProvider) -> Blueprint {
    let groups = StateTable::new(table_prefix(path, GROUPS_TABLE));
    let group_accounts = StateTable::new(table_prefix(path, GROUP_ACCOUNTS_TABLE));
    let accounts_table = StateTable::new(table_prefix(accounts_path, ACCOUNTS_TABLE));
    let name_key_table = StateTable::new(table_prefix(accounts_path, NAME_KEY_TABLE));
    Blueprint {
        owns: schema(),
        needs: needs_schema(),
        reducer: Arc::new(GroupsReducer::new(groups, group_accounts, accounts_table, name_key_table)),
        tx_registry: tx_registry(),
        provider,
    }
}

/// Owns `groups` and `groupAccounts`; needs Accounts' `accounts` and
/// `nameKey` tables to check a candidate member exists and to run the
/// shared signer pre-check.
pub struct GroupsReducer {
    groups: StateTable<GroupsTable, GroupId, GroupData>,
    group_accounts: StateTable<GroupAccountsTable, (GroupId, Account), ()>,
    accounts: StateTable<AccountsTable, String, AccountInfo>,
    name_key: StateTable<NameKeyTable, (String, sigilaris_runtime::KeyId20), KeyInfo>,
}

impl GroupsReducer {
    pub fn new(
        groups: StateTable<GroupsTable, GroupId, GroupData>,
        group_accounts: StateTable<GroupAccountsTable, (GroupId, Account), ()>,
        accounts: StateTable<AccountsTable, String, AccountInfo>,
        name_key: StateTable<NameKeyTable, (String, sigilaris_runtime::KeyId20), KeyInfo>,
    ) -> Self {
        GroupsReducer {
            groups,
            group_accounts,
            accounts,
            name_key,
        }
    }
}

fn decode_payload<T: Decode>(payload: &[u8]) -> Result<T, RuntimeError> {
    T::decode_exact(payload).map_err(|e| RuntimeError::Store(StoreError::DecodeFailure(e)))
}

impl Reducer for GroupsReducer {
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
            "CreateGroup" => {
                let tx: CreateGroup = match decode_payload(payload) {
                    Ok(tx) => tx,
                    Err(e) => return pure_event_err(e),
                };
                self.create_group(tx, envelope, signer, sig, tx_hash, store, config)
            }
            "DisbandGroup" => {
                let tx: DisbandGroup = match decode_payload(payload) {
                    Ok(tx) => tx,
                    Err(e) => return pure_event_err(e),
                };
                self.disband_group(tx, envelope, signer, sig, tx_hash, store, config)
            }
            "AddAccounts" => {
                let tx: AddAccounts = match decode_payload(payload) {
                    Ok(tx) => tx,
                    Err(e) => return pure_event_err(e),
                };
                self.add_accounts(tx, envelope, signer, sig, tx_hash, store, config)
            }
            "RemoveAccounts" => {
                let tx: RemoveAccounts = match decode_payload(payload) {
                    Ok(tx) => tx,
                    Err(e) => return pure_event_err(e),
                };
                self.remove_accounts(tx, envelope, signer, sig, tx_hash, store, config)
            }
            "ReplaceCoordinator" => {
                let tx: ReplaceCoordinator = match decode_payload(payload) {
                    Ok(tx) => tx,
                    Err(e) => return pure_event_err(e),
                };
                self.replace_coordinator(tx, envelope, signer, sig, tx_hash, store, config)
            }
            other => pure_event_err(RuntimeError::UnrecognizedTransaction {
                module: "groups".to_string(),
                tx_type: other.to_string(),
            }),
        }
    }
}

/// Step 6 for Groups mutations on an existing group: the signer account
/// must equal the group's current coordinator.
fn authorize_coordinator<'a>(
    groups: &StateTable<GroupsTable, GroupId, GroupData>,
    account: Account,
    group_id: GroupId,
    store: &'a dyn NodeStore,
    config: &'a TrieConfig,
) -> StoreM<'a, Result<GroupData, RuntimeError>> {
    let key = groups.brand(group_id.clone());
    groups.get(store, config, &key).map(move |existing| {
        let data = existing
            .ok_or_else(|| RuntimeError::Store(StoreError::logical(format!("group {group_id:?} not found"))))?;
        if data.coordinator != account {
            return Err(RuntimeError::Unauthorized);
        }
        Ok(data)
    })
}

/// Runs the Accounts signer pre-check (reused across every Groups
/// transaction) and then the coordinator-authorization
/// check against an existing group.
fn checked_coordinator<'a>(
    groups: StateTable<GroupsTable, GroupId, GroupData>,
    name_key: StateTable<NameKeyTable, (String, sigilaris_runtime::KeyId20), KeyInfo>,
    account: Account,
    group_id: GroupId,
    tx_hash: Hash32,
    sig: Signature,
    created_at: Instant,
    store: &'a dyn NodeStore,
    config: &'a TrieConfig,
) -> StoreM<'a, Result<GroupData, RuntimeError>> {
    accounts::verify_signer(&name_key, account.clone(), tx_hash, sig, created_at, store, config).and_then(
        move |verified| match verified {
            Err(e) => pure(Err(e)),
            Ok(_) => authorize_coordinator(&groups, account, group_id, store, config),
        },
    )
}

impl GroupsReducer {
    fn create_group<'a>(
        &self,
        tx: CreateGroup,
        envelope: Envelope,
        signer: Account,
        sig: Signature,
        tx_hash: Hash32,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
    ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>> {
        let groups = self.groups.clone();
        let group_id = tx.group_id.clone();
        let name = tx.name.clone();
        let coordinator = tx.coordinator.clone();
        let created_at = envelope.created_at;

        if signer != coordinator {
            return pure_event_err(RuntimeError::Unauthorized);
        }

        accounts::verify_signer(&self.name_key, signer, tx_hash, sig, created_at, store, config).and_then(
            move |verified| match verified {
                Err(e) => pure(Err(e)),
                Ok(_) => {
                    let key = groups.brand(group_id.clone());
                    groups.get(store, config, &key).and_then(move |existing| {
                        if existing.is_some() {
                            return pure(Err(RuntimeError::Store(StoreError::logical(format!(
                                "group {group_id:?} already exists"
                            )))));
                        }
                        let data = GroupData {
                            name: name.clone(),
                            coordinator: coordinator.clone(),
                            nonce: 0,
                            member_count: 0,
                            created_at,
                        };
                        groups.put(store, config, &key, &data).map(move |_| {
                            Ok(vec![Event::new(
                                "GroupCreated",
                                (group_id.clone(), name.clone(), coordinator.clone()),
                            )])
                        })
                    })
                }
            },
        )
    }

    fn disband_group<'a>(
        &self,
        tx: DisbandGroup,
        envelope: Envelope,
        signer: Account,
        sig: Signature,
        tx_hash: Hash32,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
    ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>> {
        let groups = self.groups.clone();
        let group_id = tx.group_id.clone();
        let nonce = tx.group_nonce;

        checked_coordinator(
            self.groups.clone(),
            self.name_key.clone(),
            signer,
            group_id.clone(),
            tx_hash,
            sig,
            envelope.created_at,
            store,
            config,
        )
        .and_then(move |checked| match checked {
            Err(e) => pure(Err(e)),
            Ok(data) => {
                if data.nonce != nonce {
                    return pure(Err(RuntimeError::Store(StoreError::logical("Nonce mismatch"))));
                }
                if data.member_count != 0 {
                    return pure(Err(RuntimeError::Store(StoreError::logical(format!(
                        "group {group_id:?} still has {} member(s)",
                        data.member_count
                    )))));
                }
                let key = groups.brand(group_id.clone());
                groups
                    .remove(store, config, &key)
                    .map(move |_| Ok(vec![Event::new("GroupDisbanded", group_id.clone())]))
            }
        })
    }

    fn add_accounts<'a>(
        &self,
        tx: AddAccounts,
        envelope: Envelope,
        signer: Account,
        sig: Signature,
        tx_hash: Hash32,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
    ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>> {
        if tx.accounts.is_empty() {
            return pure_event_err(RuntimeError::Store(StoreError::logical(
                "AddAccounts requires a non-empty account set",
            )));
        }

        let groups = self.groups.clone();
        let group_accounts = self.group_accounts.clone();
        let accounts_table = self.accounts.clone();
        let group_id = tx.group_id.clone();
        let nonce = tx.group_nonce;
        let candidates: Vec<Account> = tx.accounts.into_vec();

        checked_coordinator(
            self.groups.clone(),
            self.name_key.clone(),
            signer,
            group_id.clone(),
            tx_hash,
            sig,
            envelope.created_at,
            store,
            config,
        )
        .and_then(move |checked| match checked {
            Err(e) => pure(Err(e)),
            Ok(data) => {
                if data.nonce != nonce {
                    return pure(Err(RuntimeError::Store(StoreError::logical("Nonce mismatch"))));
                }

                let mut chain: StoreM<'a, Vec<Account>> = pure(Vec::new());
                for candidate in candidates {
                    let group_accounts = group_accounts.clone();
                    let accounts_table = accounts_table.clone();
                    let group_id = group_id.clone();
                    let candidate = candidate.clone();
                    chain = chain.and_then(move |mut added| {
                        let member_key = group_accounts.brand((group_id.clone(), candidate.clone()));
                        group_accounts.get(store, config, &member_key).and_then(move |already| {
                            if already.is_some() {
                                return pure(added);
                            }
                            let exists_check: StoreM<'a, bool> = match &candidate {
                                Account::Named(name) => {
                                    let acct_key = accounts_table.brand(name.clone());
                                    accounts_table.get(store, config, &acct_key).map(|v| v.is_some())
                                }
                                Account::Unnamed(_) => pure(true),
                            };
                            exists_check.and_then(move |exists| {
                                if !exists {
                                    return pure(added);
                                }
                                group_accounts.put(store, config, &member_key, &()).map(move |_| {
                                    added.push(candidate.clone());
                                    added
                                })
                            })
                        })
                    });
                }

                let groups = groups.clone();
                let group_id_final = group_id.clone();
                chain.and_then(move |added| {
                    let updated = GroupData {
                        name: data.name.clone(),
                        coordinator: data.coordinator.clone(),
                        nonce: data.nonce + 1,
                        member_count: data.member_count + added.len() as i64,
                        created_at: data.created_at,
                    };
                    let key = groups.brand(group_id_final.clone());
                    groups.put(store, config, &key, &updated).map(move |_| {
                        Ok(vec![Event::new(
                            "GroupMembersAdded",
                            CanonicalSet::from_vec(added.clone()),
                        )])
                    })
                })
            }
        })
    }

    fn remove_accounts<'a>(
        &self,
        tx: RemoveAccounts,
        envelope: Envelope,
        signer: Account,
        sig: Signature,
        tx_hash: Hash32,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
    ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>> {
        if tx.accounts.is_empty() {
            return pure_event_err(RuntimeError::Store(StoreError::logical(
                "RemoveAccounts requires a non-empty account set",
            )));
        }

        let groups = self.groups.clone();
        let group_accounts = self.group_accounts.clone();
        let group_id = tx.group_id.clone();
        let nonce = tx.group_nonce;
        let candidates: Vec<Account> = tx.accounts.into_vec();

        checked_coordinator(
            self.groups.clone(),
            self.name_key.clone(),
            signer,
            group_id.clone(),
            tx_hash,
            sig,
            envelope.created_at,
            store,
            config,
        )
        .and_then(move |checked| match checked {
            Err(e) => pure(Err(e)),
            Ok(data) => {
                if data.nonce != nonce {
                    return pure(Err(RuntimeError::Store(StoreError::logical("Nonce mismatch"))));
                }

                let mut chain: StoreM<'a, Vec<Account>> = pure(Vec::new());
                for candidate in candidates {
                    let group_accounts = group_accounts.clone();
                    let group_id = group_id.clone();
                    let candidate = candidate.clone();
                    chain = chain.and_then(move |mut removed| {
                        let member_key = group_accounts.brand((group_id.clone(), candidate.clone()));
                        group_accounts.remove(store, config, &member_key).map(move |did_remove| {
                            if did_remove {
                                removed.push(candidate.clone());
                            }
                            removed
                        })
                    });
                }

                let groups = groups.clone();
                let group_id_final = group_id.clone();
                chain.and_then(move |removed| {
                    let updated = GroupData {
                        name: data.name.clone(),
                        coordinator: data.coordinator.clone(),
                        nonce: data.nonce + 1,
                        member_count: (data.member_count - removed.len() as i64).max(0),
                        created_at: data.created_at,
                    };
                    let key = groups.brand(group_id_final.clone());
                    groups.put(store, config, &key, &updated).map(move |_| {
                        Ok(vec![Event::new(
                            "GroupMembersRemoved",
                            CanonicalSet::from_vec(removed.clone()),
                        )])
                    })
                })
            }
        })
    }

    fn replace_coordinator<'a>(
        &self,
        tx: ReplaceCoordinator,
        envelope: Envelope,
        signer: Account,
        sig: Signature,
        tx_hash: Hash32,
        store: &'a dyn NodeStore,
        config: &'a TrieConfig,
    ) -> StoreM<'a, Result<Vec<Event>, RuntimeError>> {
        let groups = self.groups.clone();
        let group_id = tx.group_id.clone();
        let nonce = tx.group_nonce;
        let new_coordinator = tx.new_coordinator.clone();

        checked_coordinator(
            self.groups.clone(),
            self.name_key.clone(),
            signer,
            group_id.clone(),
            tx_hash,
            sig,
            envelope.created_at,
            store,
            config,
        )
        .and_then(move |checked| match checked {
            Err(e) => pure(Err(e)),
            Ok(data) => {
                if data.nonce != nonce {
                    return pure(Err(RuntimeError::Store(StoreError::logical("Nonce mismatch"))));
                }
                let updated = GroupData {
                    name: data.name.clone(),
                    coordinator: new_coordinator.clone(),
                    nonce: data.nonce + 1,
                    member_count: data.member_count,
                    created_at: data.created_at,
                };
                let key = groups.brand(group_id.clone());
                groups.put(store, config, &key, &updated).map(move |_| {
                    Ok(vec![Event::new(
                        "GroupCoordinatorReplaced",
                        (group_id.clone(), new_coordinator.clone()),
                    )])
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

    fn reducer() -> GroupsReducer {
        GroupsReducer::new(
            StateTable::new(table_prefix(&[], GROUPS_TABLE)),
            StateTable::new(table_prefix(&[], GROUP_ACCOUNTS_TABLE)),
            StateTable::new(table_prefix(&[], ACCOUNTS_TABLE)),
            StateTable::new(table_prefix(&[], NAME_KEY_TABLE)),
        )
    }

    fn create_account(
        store: &MemoryNodeStore,
        config: &TrieConfig,
        state: StoreState,
        name: &str,
        kp: &KeyPair,
    ) -> StoreState {
        let acc_reducer = accounts::AccountsReducer::new(
            StateTable::new(table_prefix(&[], ACCOUNTS_TABLE)),
            StateTable::new(table_prefix(&[], NAME_KEY_TABLE)),
        );
        let tx = accounts::CreateNamedAccount {
            name: name.to_string(),
            initial_key_id: sigilaris_runtime::key_id_of(&kp.public_key()),
            guardian: None,
        };
        let payload = tx.encode_to_vec();
        let tx_hash = sigilaris_crypto::keccak256(&payload);
        let sig = sign(kp, &tx_hash).unwrap();
        let envelope = Envelope {
            network_id: 1,
            created_at: Instant::from_epoch_millis(0),
            memo: None,
        };
        let (state, result) = acc_reducer
            .apply(
                &[],
                "CreateNamedAccount",
                &payload,
                &envelope,
                &Account::Unnamed(sigilaris_runtime::key_id_of(&kp.public_key())),
                &sig,
                &tx_hash,
                store,
                config,
            )
            .run(state)
            .unwrap();
        result.unwrap();
        state
    }

    #[test]
    fn create_group_add_member_then_disband_requires_empty_membership() {
        let store = MemoryNodeStore::new();
        let config = TrieConfig::default();
        let reducer = reducer();

        let mut d = [0u8; 32];
        d[31] = 11;
        let kp = KeyPair::from_private(&d).unwrap();
        let state = create_account(&store, &config, StoreState::default(), "coordinator", &kp);

        let mut d2 = [0u8; 32];
        d2[31] = 12;
        let kp2 = KeyPair::from_private(&d2).unwrap();
        let state = create_account(&store, &config, state, "member", &kp2);

        let envelope = Envelope {
            network_id: 1,
            created_at: Instant::from_epoch_millis(0),
            memo: None,
        };

        let create = CreateGroup {
            group_id: "g1".to_string(),
            name: "eng".to_string(),
            coordinator: Account::Named("coordinator".to_string()),
        };
        let payload = create.encode_to_vec();
        let tx_hash = sigilaris_crypto::keccak256(&payload);
        let sig = sign(&kp, &tx_hash).unwrap();
        let (state, result) = reducer
            .apply(
                &[],
                "CreateGroup",
                &payload,
                &envelope,
                &Account::Named("coordinator".to_string()),
                &sig,
                &tx_hash,
                &store,
                &config,
            )
            .run(state)
            .unwrap();
        result.unwrap();

        let add = AddAccounts {
            group_id: "g1".to_string(),
            accounts: CanonicalSet::from_vec(vec![
                Account::Named("member".to_string()),
                Account::Named("nobody".to_string()),
            ]),
            group_nonce: 0,
        };
        let payload = add.encode_to_vec();
        let tx_hash = sigilaris_crypto::keccak256(&payload);
        let sig = sign(&kp, &tx_hash).unwrap();
        let (state, result) = reducer
            .apply(
                &[],
                "AddAccounts",
                &payload,
                &envelope,
                &Account::Named("coordinator".to_string()),
                &sig,
                &tx_hash,
                &store,
                &config,
            )
            .run(state)
            .unwrap();
        let events = result.unwrap();
        let (added, _) = CanonicalSet::<Account>::decode(&events[0].fields).unwrap();
        // "nobody" was never created as an account, so only "member" is added.
        assert_eq!(added.into_vec(), vec![Account::Named("member".to_string())]);

        let disband = DisbandGroup {
            group_id: "g1".to_string(),
            group_nonce: 1,
        };
        let payload = disband.encode_to_vec();
        let tx_hash = sigilaris_crypto::keccak256(&payload);
        let sig = sign(&kp, &tx_hash).unwrap();
        let err = reducer
            .apply(
                &[],
                "DisbandGroup",
                &payload,
                &envelope,
                &Account::Named("coordinator".to_string()),
                &sig,
                &tx_hash,
                &store,
                &config,
            )
            .run(state)
            .unwrap()
            .1
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Store(StoreError::Logical(_))));
    }
}
