//! RBAC repository core.
//!
//! Projects a relational, many-to-many, bidirectionally-queryable RBAC
//! domain (resources, scopes, roles, principals, and their assignments)
//! onto a single wide key-value table. See [`repository::Repository`] for
//! the public facade.

pub mod access;
pub mod cascade;
pub mod codec;
pub mod error;
pub mod kv;
pub mod mem;
pub mod models;
pub mod repository;
pub mod stores;
pub mod validation;

pub use error::RbacError;
pub use repository::Repository;

/// Re-exports of the commonly used surface.
pub mod prelude {
    pub use crate::error::RbacError;
    pub use crate::kv::{CancellationToken, KvStore};
    pub use crate::mem::InMemoryKvStore;
    pub use crate::models::{PrincipalAccess, Resource, Role, Scope};
    pub use crate::repository::Repository;
    pub use crate::validation::{DefaultNameValidator, NameValidator, DEFAULT_SCOPE_NAME};
}
