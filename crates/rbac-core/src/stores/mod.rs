//! Sub-repositories (C3–C5): CRUD for definition items and the
//! dual-indexed assignment relations, all built on the shared
//! [`crate::kv::KvStore`] and [`crate::codec`] primitives.

pub mod resource;
pub mod role;
pub mod role_assignment;
pub mod scope;
pub mod scope_assignment;

pub use resource::ResourceStore;
pub use role::RoleStore;
pub use role_assignment::RoleAssignmentStore;
pub use scope::ScopeStore;
pub use scope_assignment::ScopeAssignmentStore;
