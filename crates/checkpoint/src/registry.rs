//! Named owners participating in a checkpoint.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::blob::{RESERVED_PREFIX, is_reserved};
use crate::error::{CheckpointError, Result};
use crate::owner::Owner;

/// Mapping from entry name to a shared owner.
///
/// Iteration is ordered by name, so checkpoint blobs come out in a stable order.
#[derive(Default)]
pub struct Registry {
    owners: BTreeMap<String, Arc<dyn Owner>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `owner` under `name`, replacing any previous binding.
    ///
    /// # Errors
    ///
    /// `ContractViolation` for an empty name or one starting with the reserved
    /// prefix.
    pub fn register(&mut self, name: impl Into<String>, owner: Arc<dyn Owner>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(CheckpointError::contract(name, "entry names must not be empty"));
        }
        if is_reserved(&name) {
            return Err(CheckpointError::contract(
                name,
                format!("names starting with '{}' are reserved", RESERVED_PREFIX),
            ));
        }

        if self.owners.insert(name.clone(), owner).is_some() {
            tracing::debug!("Replaced checkpoint entry '{}'", name);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Owner>> {
        self.owners
            .get(name)
            .cloned()
            .ok_or_else(|| CheckpointError::UnknownOwner(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.owners.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.owners.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Owner>)> {
        self.owners.iter().map(|(name, owner)| (name.as_str(), owner))
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.owners.keys()).finish()
    }
}
