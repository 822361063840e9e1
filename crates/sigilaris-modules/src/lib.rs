//! Accounts and Groups: the canonical example reducers over
//! [`sigilaris_runtime`]'s module framework.
//!
//! Accounts owns the `accounts`/`nameKey` tables and needs nothing; Groups
//! owns `groups`/`groupAccounts` and needs Accounts' two tables through a
//! [`sigilaris_runtime::TablesProvider`] handed to it at mount time. Both
//! reducers share the same signer pre-check (recover, then confirm the
//! recovered key is registered and unexpired against `nameKey`) via
//! [`accounts::verify_signer`].

pub mod accounts;
pub mod groups;
