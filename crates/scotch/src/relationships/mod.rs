//! Lazy relationships between local models and remote entities
//!
//! - [`RelationshipDescriptor`] declares one relationship field
//! - [`TargetRegistry`] turns declared names into concrete types
//! - [`ProxyCache`] resolves each field at most once per owner instance

pub mod cache;
pub mod descriptor;
pub mod registry;
pub mod types;

pub use cache::{ProxyCache, ProxyState, RelationshipOwner};
pub use descriptor::{RelationshipDescriptor, RelationshipSet};
pub use registry::TargetRegistry;
pub use types::{Cardinality, Direction, EntityType, Erased, RegistryRoot, Resolution, TargetRef};
