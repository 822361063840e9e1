//! Module runtime: blueprints, mounting, path routing, and per-transaction
//! execution semantics over [`sigilaris_store`].
//!
//! A [`Blueprint`] is the path-independent spec of a state module; [`mount`]
//! binds it to a path and computes its table prefixes. A
//! [`ComposedBlueprint`] bundles several mounted modules and routes by
//! peeling path segments. [`execute_transaction`] runs one transaction
//! through a reducer's [`StoreM`] program and applies the runtime's
//! access-log quotas.

mod blueprint;
mod composed;
mod config;
mod dispatch;
mod error;
mod provider;
#[cfg(test)]
mod test_support;
mod transaction;
mod types;

pub use blueprint::{mount, Blueprint, Reducer, StateModule, TxMeta, TxRegistry};
pub use composed::ComposedBlueprint;
pub use config::RuntimeConfig;
pub use dispatch::{execute_transaction, pure_event_err};
pub use error::RuntimeError;
pub use provider::TablesProvider;
pub use transaction::RawTransaction;
pub use types::{key_id_of, Account, AccountSignature, Envelope, Event, KeyId20, Signed};

pub use sigilaris_store::StoreM;
