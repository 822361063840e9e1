//! Table/schema layer and the store effect over [`sigilaris_trie`].
//!
//! A `Schema` binds table names to byte codecs; mounting it at a path
//! computes prefix-free, content-addressable table prefixes. The store
//! effect (`StoreM<T>`) is the sequenceable, fallible computation reducers
//! use to read and write through those tables, accumulating an
//! [`AccessLog`] as it goes for the module runtime's conflict detection.

mod access_log;
mod effect;
mod error;
mod path;
mod schema;

pub use access_log::AccessLog;
pub use effect::{delete, pure, raise, read, write, StoreM, StoreState};
pub use error::StoreError;
pub use path::{encode_path, encode_segment, table_prefix};
pub use schema::{BrandedKey, EntryMeta, MountedSchema, Schema, StateTable};
