//! Lazy Proxy Cache - per-instance memoization of relationship fields
//!
//! Each owner instance embeds a [`ProxyCache`] holding one slot per declared
//! relationship field. The first read of a field runs its descriptor's
//! query or request; later reads on the same instance return the cached
//! value. Other instances have their own slots.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use super::descriptor::RelationshipSet;
use super::types::Resolution;
use crate::context::Scotch;
use crate::error::{ScotchError, ScotchResult};
use crate::model::short_type_name;

/// A type that declares relationship fields
pub trait RelationshipOwner: Serialize + Send + Sync + Sized + 'static {
    /// Declared relationship fields, usually written with
    /// [`relationships!`](crate::relationships!)
    fn relationships() -> &'static RelationshipSet;

    /// Field holding the owner's id, matched by local rows
    fn primary_key_name() -> &'static str {
        "id"
    }

    /// Current value of a plain field. `None` for absent or null fields.
    fn field_value(&self, field: &str) -> ScotchResult<Option<Value>> {
        let value = serde_json::to_value(self).map_err(|e| {
            ScotchError::configuration(format!(
                "fields of '{}' cannot be read: {}",
                Self::owner_name(),
                e
            ))
        })?;

        match value {
            Value::Object(mut fields) => {
                Ok(fields.remove(field).filter(|value| !value.is_null()))
            }
            _ => Ok(None),
        }
    }

    fn owner_name() -> &'static str {
        short_type_name::<Self>()
    }
}

/// Observable state of one relationship slot
#[derive(Debug, Clone, Copy)]
pub enum ProxyState<'a> {
    Unresolved,
    Resolved(&'a Resolution),
}

/// One lazily resolved slot per declared relationship field.
///
/// Not part of the owner's identity: two caches always compare equal, and a
/// clone starts over with every slot unresolved.
pub struct ProxyCache<O> {
    slots: HashMap<String, OnceCell<Resolution>>,
    _owner: PhantomData<fn() -> O>,
}

impl<O: RelationshipOwner> ProxyCache<O> {
    /// Fresh cache with an unresolved slot for every field `O` declares
    pub fn install() -> Self {
        let slots = O::relationships()
            .names()
            .map(|name| (name.to_string(), OnceCell::new()))
            .collect();

        Self {
            slots,
            _owner: PhantomData,
        }
    }

    /// Whether `field` has been read on this instance yet
    pub fn state(&self, field: &str) -> ProxyState<'_> {
        match self.slots.get(field).and_then(OnceCell::get) {
            Some(resolution) => ProxyState::Resolved(resolution),
            None => ProxyState::Unresolved,
        }
    }

    pub fn is_resolved(&self, field: &str) -> bool {
        matches!(self.state(field), ProxyState::Resolved(_))
    }

    /// Read `field`, resolving it on first access.
    ///
    /// A failed resolution leaves the slot unresolved, so the next read tries again.
    pub async fn resolve(
        &self,
        owner: &O,
        field: &str,
        scotch: &Scotch,
    ) -> ScotchResult<&Resolution> {
        let (slot, descriptor) = self
            .slots
            .get(field)
            .zip(O::relationships().get(field))
            .ok_or_else(|| {
                ScotchError::configuration(format!(
                    "'{}' has no relationship field named '{}'",
                    O::owner_name(),
                    field
                ))
            })?;

        if let Some(resolution) = slot.get() {
            trace!(owner = O::owner_name(), field, "relationship cache hit");
            return Ok(resolution);
        }

        slot.get_or_try_init(|| async {
            debug!(
                owner = O::owner_name(),
                field,
                direction = ?descriptor.direction(),
                "resolving relationship"
            );
            descriptor.resolve(owner, scotch).await
        })
        .await
    }

    /// Read a single-valued `field` as `T`
    pub async fn one<T: Any + Send + Sync>(
        &self,
        owner: &O,
        field: &str,
        scotch: &Scotch,
    ) -> ScotchResult<Option<Arc<T>>> {
        match self.resolve(owner, field, scotch).await? {
            Resolution::One(value) => value.clone().map(downcast::<T, O>).transpose(),
            Resolution::Many(_) => Err(ScotchError::configuration(format!(
                "relationship '{}' on '{}' yields a collection",
                field,
                O::owner_name()
            ))),
        }
    }

    /// Read a collection-valued `field` as `T`
    pub async fn many<T: Any + Send + Sync>(
        &self,
        owner: &O,
        field: &str,
        scotch: &Scotch,
    ) -> ScotchResult<Vec<Arc<T>>> {
        match self.resolve(owner, field, scotch).await? {
            Resolution::Many(values) => values.iter().cloned().map(downcast::<T, O>).collect(),
            Resolution::One(_) => Err(ScotchError::configuration(format!(
                "relationship '{}' on '{}' yields a single value",
                field,
                O::owner_name()
            ))),
        }
    }
}

fn downcast<T: Any + Send + Sync, O: RelationshipOwner>(
    value: Arc<dyn Any + Send + Sync>,
) -> ScotchResult<Arc<T>> {
    value.downcast::<T>().map_err(|_| {
        ScotchError::configuration(format!(
            "relationship on '{}' does not hold a {}",
            O::owner_name(),
            short_type_name::<T>()
        ))
    })
}

impl<O: RelationshipOwner> Default for ProxyCache<O> {
    fn default() -> Self {
        Self::install()
    }
}

impl<O: RelationshipOwner> Clone for ProxyCache<O> {
    fn clone(&self) -> Self {
        Self::install()
    }
}

impl<O: RelationshipOwner> PartialEq for ProxyCache<O> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<O: RelationshipOwner> Eq for ProxyCache<O> {}

impl<O: RelationshipOwner> fmt::Debug for ProxyCache<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.slots.keys().collect();
        names.sort();

        let mut map = f.debug_map();
        for name in names {
            let state = if self.is_resolved(name) { "resolved" } else { "unresolved" };
            map.entry(name, &state);
        }
        map.finish()
    }
}
