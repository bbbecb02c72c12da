//! Relationship Types - type handles, target references and resolved values

use std::any::{Any, TypeId};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Scotch;
use crate::error::ScotchResult;
use crate::model::{LocalModel, RemoteEntity, Row};

/// A resolved related value with its concrete type erased
pub type Erased = Arc<dyn Any + Send + Sync>;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// GET one remote entity by id through the context's accessor for its type
pub(crate) type FetchFn = for<'a> fn(&'a Scotch, String) -> BoxFuture<'a, ScotchResult<Erased>>;

/// Decode a repository row into the local model
pub(crate) type DecodeFn = fn(Row) -> ScotchResult<Erased>;

/// The family of types a by-name target is searched in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryRoot {
    /// Types implementing `RemoteEntity`
    Remote,
    /// Types implementing `LocalModel`
    Local,
}

impl fmt::Display for RegistryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryRoot::Remote => f.write_str("remote entity"),
            RegistryRoot::Local => f.write_str("local model"),
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) enum EntityKind {
    Remote { fetch: FetchFn },
    Local { table: &'static str, decode: DecodeFn },
}

/// Runtime handle on a concrete remote entity or local model type
#[derive(Clone, Copy)]
pub struct EntityType {
    name: &'static str,
    type_name: &'static str,
    type_id: TypeId,
    kind: EntityKind,
}

impl EntityType {
    /// Handle on a remote entity type, named by `E::entity_name()`
    pub fn remote<E: RemoteEntity>() -> Self {
        Self {
            name: E::entity_name(),
            type_name: std::any::type_name::<E>(),
            type_id: TypeId::of::<E>(),
            kind: EntityKind::Remote {
                fetch: fetch_remote::<E>,
            },
        }
    }

    /// Handle on a local model type, named by `L::model_name()`
    pub fn local<L: LocalModel>() -> Self {
        Self {
            name: L::model_name(),
            type_name: std::any::type_name::<L>(),
            type_id: TypeId::of::<L>(),
            kind: EntityKind::Local {
                table: L::table_name(),
                decode: decode_local::<L>,
            },
        }
    }

    /// Declared name used for by-name lookups
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fully qualified Rust type name
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn root(&self) -> RegistryRoot {
        match self.kind {
            EntityKind::Remote { .. } => RegistryRoot::Remote,
            EntityKind::Local { .. } => RegistryRoot::Local,
        }
    }

    /// Check whether this handle stands for `T`
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub(crate) fn kind(&self) -> EntityKind {
        self.kind
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("root", &self.root())
            .finish()
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EntityType {}

fn fetch_remote<E: RemoteEntity>(
    scotch: &Scotch,
    id: String,
) -> BoxFuture<'_, ScotchResult<Erased>> {
    Box::pin(async move {
        let entity = scotch.api::<E>()?.get(id).await?;
        Ok(Arc::new(entity) as Erased)
    })
}

fn decode_local<L: LocalModel>(row: Row) -> ScotchResult<Erased> {
    Ok(Arc::new(L::from_row(row)?) as Erased)
}

/// How a relationship names its target
#[derive(Debug, Clone, PartialEq)]
pub enum TargetRef {
    /// A concrete type, used as is
    Type(EntityType),
    /// A declared name, looked up in the context's registry on first use
    Name(String),
}

impl From<EntityType> for TargetRef {
    fn from(entity_type: EntityType) -> Self {
        TargetRef::Type(entity_type)
    }
}

impl From<&str> for TargetRef {
    fn from(name: &str) -> Self {
        TargetRef::Name(name.to_string())
    }
}

impl From<String> for TargetRef {
    fn from(name: String) -> Self {
        TargetRef::Name(name)
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Type(entity_type) => f.write_str(entity_type.name()),
            TargetRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// Whether a relationship yields one value or a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    One,
    Many,
}

/// Which store a relationship reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The owner holds a foreign key; the target is fetched over HTTP
    LocalLooksUpRemote,
    /// The owner's id is matched against a field of local rows
    RemoteLooksUpLocal,
}

impl Direction {
    /// Family the target type must belong to
    pub fn target_root(self) -> RegistryRoot {
        match self {
            Direction::LocalLooksUpRemote => RegistryRoot::Remote,
            Direction::RemoteLooksUpLocal => RegistryRoot::Local,
        }
    }
}

/// Outcome of resolving a relationship once
#[derive(Clone)]
pub enum Resolution {
    One(Option<Erased>),
    Many(Vec<Erased>),
}

impl Resolution {
    pub fn empty(cardinality: Cardinality) -> Self {
        match cardinality {
            Cardinality::One => Resolution::One(None),
            Cardinality::Many => Resolution::Many(Vec::new()),
        }
    }

    /// Number of related values held
    pub fn len(&self) -> usize {
        match self {
            Resolution::One(value) => usize::from(value.is_some()),
            Resolution::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::One(Some(_)) => f.write_str("One(Some(..))"),
            Resolution::One(None) => f.write_str("One(None)"),
            Resolution::Many(values) => write!(f, "Many(len = {})", values.len()),
        }
    }
}
