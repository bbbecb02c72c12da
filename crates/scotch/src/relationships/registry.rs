//! Target Registry - name → type lookup for relationship targets
//!
//! Types are registered explicitly when the context is built, so a by-name
//! lookup never depends on load order and both "not found" and "ambiguous"
//! fail the same way every time.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::types::{EntityType, RegistryRoot, TargetRef};
use crate::error::{ScotchError, ScotchResult};
use crate::model::{LocalModel, RemoteEntity};

/// Thread-safe registry of relationship target types.
///
/// Clones share their tables, so every clone of one context sees the same
/// registrations and the same resolved names.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    /// Map of (root, declared name) -> every type registered under that name
    types: Arc<DashMap<(RegistryRoot, String), Vec<EntityType>>>,
    /// Names already resolved through this registry
    resolved: Arc<DashMap<(RegistryRoot, String), EntityType>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type handle; registering the same type twice is a no-op
    pub fn register(&self, entity_type: EntityType) {
        let mut candidates = self
            .types
            .entry((entity_type.root(), entity_type.name().to_string()))
            .or_default();

        if !candidates.contains(&entity_type) {
            debug!(
                name = entity_type.name(),
                type_name = entity_type.type_name(),
                root = %entity_type.root(),
                "registered relationship target"
            );
            candidates.push(entity_type);
            drop(candidates);
            // A new candidate can make a resolved name ambiguous
            self.resolved.remove(&(entity_type.root(), entity_type.name().to_string()));
        }
    }

    pub fn register_remote<E: RemoteEntity>(&self) {
        self.register(EntityType::remote::<E>());
    }

    pub fn register_local<L: LocalModel>(&self) {
        self.register(EntityType::local::<L>());
    }

    /// Every type registered under `name` in `root`
    pub fn candidates(&self, root: RegistryRoot, name: &str) -> Vec<EntityType> {
        self.types
            .get(&(root, name.to_string()))
            .map(|candidates| candidates.clone())
            .unwrap_or_default()
    }

    /// Declared names registered in `root`, sorted
    pub fn names(&self, root: RegistryRoot) -> Vec<String> {
        let mut names: Vec<String> = self
            .types
            .iter()
            .filter(|entry| entry.key().0 == root)
            .map(|entry| entry.key().1.clone())
            .collect();
        names.sort();
        names
    }

    /// Turn a target reference into a concrete type.
    ///
    /// A `Type` reference comes back unchanged. A `Name` reference must match
    /// exactly one type registered in `root`; a successful lookup is kept for
    /// later calls on this registry only.
    pub fn resolve(&self, target: &TargetRef, root: RegistryRoot) -> ScotchResult<EntityType> {
        let name = match target {
            TargetRef::Type(entity_type) => return Ok(*entity_type),
            TargetRef::Name(name) => name,
        };

        let key = (root, name.clone());
        if let Some(resolved) = self.resolved.get(&key) {
            return Ok(*resolved);
        }

        let candidates = self.candidates(root, name);
        match candidates.as_slice() {
            [found] => {
                self.resolved.insert(key, *found);
                Ok(*found)
            }
            [] => Err(ScotchError::resolution(format!(
                "no {} named '{}' is registered (known: {})",
                root,
                name,
                self.names(root).join(", ")
            ))),
            several => Err(ScotchError::resolution(format!(
                "{} name '{}' is ambiguous: {}",
                root,
                name,
                several
                    .iter()
                    .map(EntityType::type_name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}
