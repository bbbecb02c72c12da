//! Relationship Descriptor - declaration of one relationship field
//!
//! A descriptor covers both directions (an owner looking up a remote entity
//! through a foreign key, or an owner looking up local rows that point at its
//! id) and both target forms (concrete type or declared name).

use serde_json::Value;
use tracing::debug;

use super::cache::RelationshipOwner;
use super::registry::TargetRegistry;
use super::types::{Cardinality, Direction, EntityKind, EntityType, Resolution, TargetRef};
use crate::context::Scotch;
use crate::error::{ScotchError, ScotchResult};

#[derive(Debug)]
pub struct RelationshipDescriptor {
    target: TargetRef,
    field: Option<String>,
    key_attribute: Option<String>,
    cardinality: Cardinality,
    direction: Direction,
}

impl RelationshipDescriptor {
    fn new(target: TargetRef, cardinality: Cardinality, direction: Direction) -> Self {
        Self {
            target,
            field: None,
            key_attribute: None,
            cardinality,
            direction,
        }
    }

    /// The owner holds a foreign key to a remote entity; yields at most one value
    pub fn remote(target: impl Into<TargetRef>) -> Self {
        Self::new(target.into(), Cardinality::One, Direction::LocalLooksUpRemote)
    }

    /// Local rows carry the owner's id; yields every matching row by default
    pub fn local(target: impl Into<TargetRef>) -> Self {
        Self::new(target.into(), Cardinality::Many, Direction::RemoteLooksUpLocal)
    }

    /// Key attribute: the owner's foreign key field for remote lookups, the
    /// rows' field holding the owner id for local lookups
    pub fn key(mut self, key_attribute: impl Into<String>) -> Self {
        self.key_attribute = Some(key_attribute.into());
        self
    }

    /// Yield the first match only
    pub fn single(mut self) -> Self {
        self.cardinality = Cardinality::One;
        self
    }

    /// Yield every match
    pub fn many(mut self) -> Self {
        self.cardinality = Cardinality::Many;
        self
    }

    /// Attach the descriptor to its owner field, defaulting the key
    /// attribute to `<field>_id`
    pub fn bind(mut self, field: &str) -> Self {
        if self.key_attribute.is_none() {
            self.key_attribute = Some(format!("{}_id", field));
        }
        self.field = Some(field.to_string());
        self
    }

    pub fn target(&self) -> &TargetRef {
        &self.target
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn key_attribute(&self) -> Option<&str> {
        self.key_attribute.as_deref()
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_bound(&self) -> bool {
        self.key_attribute.is_some()
    }

    /// Concrete target type as seen by `registry`.
    ///
    /// Descriptors are shared by every context, so a resolved name is kept by
    /// the registry that resolved it, never by the descriptor.
    pub fn target_type(&self, registry: &TargetRegistry) -> ScotchResult<EntityType> {
        registry.resolve(&self.target, self.direction.target_root())
    }

    /// Run the single query or request this relationship stands for
    pub async fn resolve<O: RelationshipOwner>(
        &self,
        owner: &O,
        scotch: &Scotch,
    ) -> ScotchResult<Resolution> {
        let key_attribute = self.key_attribute.as_deref().ok_or_else(|| {
            ScotchError::configuration(format!(
                "relationship to {} on '{}' has no key attribute; bind it to a field first",
                self.target,
                O::owner_name()
            ))
        })?;

        match self.direction {
            Direction::LocalLooksUpRemote => {
                self.resolve_remote(owner, key_attribute, scotch).await
            }
            Direction::RemoteLooksUpLocal => {
                self.resolve_local(owner, key_attribute, scotch).await
            }
        }
    }

    async fn resolve_remote<O: RelationshipOwner>(
        &self,
        owner: &O,
        key_attribute: &str,
        scotch: &Scotch,
    ) -> ScotchResult<Resolution> {
        if self.cardinality == Cardinality::Many {
            return Err(ScotchError::configuration(format!(
                "remote relationship '{}' on '{}' cannot yield a collection",
                self.field.as_deref().unwrap_or("?"),
                O::owner_name()
            )));
        }

        let target = self.target_type(scotch.registry())?;
        let EntityKind::Remote { fetch } = target.kind() else {
            return Err(ScotchError::configuration(format!(
                "'{}' is not a remote entity",
                target.type_name()
            )));
        };

        let Some(key) = owner.field_value(key_attribute)? else {
            debug!(
                owner = O::owner_name(),
                key_attribute,
                "foreign key absent, nothing to fetch"
            );
            return Ok(Resolution::One(None));
        };
        let id = key_to_id(key_attribute, &key)?;

        debug!(
            owner = O::owner_name(),
            target = target.name(),
            id = %id,
            "resolving remote relationship"
        );
        let entity = fetch(scotch, id).await?;
        Ok(Resolution::One(Some(entity)))
    }

    async fn resolve_local<O: RelationshipOwner>(
        &self,
        owner: &O,
        key_attribute: &str,
        scotch: &Scotch,
    ) -> ScotchResult<Resolution> {
        let target = self.target_type(scotch.registry())?;
        let EntityKind::Local { table, decode } = target.kind() else {
            return Err(ScotchError::configuration(format!(
                "'{}' is not a local model",
                target.type_name()
            )));
        };
        let repository = scotch.repository()?;

        let Some(owner_id) = owner.field_value(O::primary_key_name())? else {
            debug!(
                owner = O::owner_name(),
                "owner has no id yet, no rows can point at it"
            );
            return Ok(Resolution::empty(self.cardinality));
        };

        debug!(
            owner = O::owner_name(),
            target = target.name(),
            table,
            key_attribute,
            %owner_id,
            "resolving local relationship"
        );
        match self.cardinality {
            Cardinality::Many => {
                let rows = repository
                    .filter_by_equals(table, key_attribute, &owner_id)
                    .await?;
                let values = rows
                    .into_iter()
                    .map(decode)
                    .collect::<ScotchResult<Vec<_>>>()?;
                Ok(Resolution::Many(values))
            }
            Cardinality::One => {
                let row = repository
                    .first_by_equals(table, key_attribute, &owner_id)
                    .await?;
                Ok(Resolution::One(row.map(decode).transpose()?))
            }
        }
    }
}

fn key_to_id(key_attribute: &str, value: &Value) -> ScotchResult<String> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        other => Err(ScotchError::configuration(format!(
            "key attribute '{}' holds {}, which is not an id",
            key_attribute, other
        ))),
    }
}

/// Explicit registry of the relationship fields declared on one owner type
#[derive(Debug, Default)]
pub struct RelationshipSet {
    fields: Vec<(String, RelationshipDescriptor)>,
}

impl RelationshipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` as a relationship field, binding the descriptor to it.
    /// A second declaration of the same name replaces the first.
    pub fn field(mut self, name: &str, descriptor: RelationshipDescriptor) -> Self {
        let descriptor = descriptor.bind(name);
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some(slot) => slot.1 = descriptor,
            None => self.fields.push((name.to_string(), descriptor)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, descriptor)| descriptor)
    }

    /// Declared field names, in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(field, _)| field.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationshipDescriptor)> {
        self.fields
            .iter()
            .map(|(field, descriptor)| (field.as_str(), descriptor))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Declare the relationship fields of an owner type inside its
/// `RelationshipOwner` impl:
///
/// ```ignore
/// impl RelationshipOwner for Tire {
///     scotch::relationships! {
///         car => RelationshipDescriptor::remote(EntityType::remote::<Car>()),
///     }
/// }
/// ```
///
/// The set is built once, on first use. Not meant for generic owners: the
/// backing static is shared by every instantiation.
#[macro_export]
macro_rules! relationships {
    ($($field:ident => $descriptor:expr),* $(,)?) => {
        fn relationships() -> &'static $crate::relationships::RelationshipSet {
            static RELATIONSHIPS: ::std::sync::OnceLock<$crate::relationships::RelationshipSet> =
                ::std::sync::OnceLock::new();
            RELATIONSHIPS.get_or_init(|| {
                $crate::relationships::RelationshipSet::new()
                    $(.field(stringify!($field), $descriptor))*
            })
        }
    };
}
