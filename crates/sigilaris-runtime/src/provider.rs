use std::sync::Arc;

use sigilaris_store::{MountedSchema, Schema};

use crate::error::RuntimeError;

/// Exposes a mounted module's tables to dependent modules
/// (`TablesProvider.fromModule(m)`). A trait-object/`Arc` handle rather than
/// a higher-kinded generic, since Rust has no higher-kinded polymorphism to
/// parameterize over "whatever schema `needs` names" — the idiomatic
/// substitute is a concrete struct validated against the consumer's
/// declared `needs` at construction time.
///
/// The provider is a capability: a dependent mounted with `needs` for a
/// producer's schema can read those tables, but nothing stops a careless
/// caller from handing the same `Arc` to an unrelated module. That misuse
/// is a structural bug in the assembly, not something this type can
/// prevent at runtime.
#[derive(Clone)]
pub struct TablesProvider {
    mounted: Arc<MountedSchema>,
}

impl TablesProvider {
    pub fn from_module(mounted: Arc<MountedSchema>) -> Self {
        TablesProvider { mounted }
    }

    pub fn prefix_of(&self, name: &str) -> Option<Vec<u8>> {
        self.mounted.prefix_of(name).map(|p| p.to_vec())
    }

    pub fn mounted(&self) -> &MountedSchema {
        &self.mounted
    }

    /// Validates that every table a dependent's `needs` schema names is
    /// present in this provider, narrowing the capability to exactly that
    /// projection in spirit (the underlying handle is unchanged — see the
    /// capability-discipline note above).
    pub fn narrow(&self, needs: &Schema) -> Result<TablesProvider, RuntimeError> {
        if !self.mounted.satisfies(needs) {
            return Err(RuntimeError::Store(sigilaris_store::StoreError::Schema(
                format!(
                    "provider mounted at {:?} does not satisfy needs schema {:?}",
                    self.mounted.path(),
                    needs.names().collect::<Vec<_>>()
                ),
            )));
        }
        Ok(self.clone())
    }
}
