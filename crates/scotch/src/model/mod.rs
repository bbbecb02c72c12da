//! Model System - the two kinds of entities a relationship can point at
//!
//! - `remote`: JSON resources reached through an [`ApiAccessor`](crate::api::ApiAccessor)
//! - `local`: rows of the embedding persistence layer

pub mod local;
pub mod remote;

pub use local::{LocalModel, Row};
pub use remote::{Extra, RemoteEntity, RemoteEntityExt};

/// Last path segment of a type name, without generic arguments
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
