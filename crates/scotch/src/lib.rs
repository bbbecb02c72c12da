//! # scotch: Lazy relationships between local rows and remote REST resources
//!
//! Models stored in a local relational database can declare fields that
//! point at entities served by a remote REST API, and remote entities can
//! declare fields that point back at local rows. Each such field is resolved
//! on first read through an explicit [`Scotch`] context and cached on the
//! owning instance.
//!
//! This crate provides the [`RemoteEntity`] and [`LocalModel`] traits, the
//! per-type [`ApiAccessor`], relationship descriptors with by-name target
//! resolution, and the local repository seam with in-memory and Postgres
//! implementations.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod relationships;
pub mod repository;

// Re-export core traits and types
pub use api::{ApiAccessor, HttpTransport, MemoryTransport, ReqwestTransport, WriteResponse};
pub use config::ScotchConfig;
pub use context::{Scotch, ScotchBuilder};
pub use error::{ScotchError, ScotchResult};
pub use model::{Extra, LocalModel, RemoteEntity, RemoteEntityExt, Row};
pub use relationships::{
    Cardinality, EntityType, ProxyCache, RelationshipDescriptor, RelationshipOwner,
    RelationshipSet, TargetRef,
};
pub use repository::{LocalRepository, MemoryRepository};
#[cfg(feature = "postgres")]
pub use repository::PostgresRepository;
