//! Domain types for the RBAC repository core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A protected asset, unique by `resource_name`. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    pub resource_name: String,
    /// Sorted, unique scope names under this resource.
    pub scope_names: Vec<String>,
    /// Sorted, unique role names under this resource.
    pub role_names: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A named authorization boundary within a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scope {
    pub resource_name: String,
    pub scope_name: String,
    pub created_at: DateTime<Utc>,
}

/// A permission label within a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub resource_name: String,
    pub role_name: String,
    pub created_at: DateTime<Utc>,
}

/// "principal P is permitted within scope S of resource R".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScopeAssignment {
    pub principal_id: String,
    pub resource_name: String,
    pub scope_name: String,
    pub created_at: DateTime<Utc>,
}

/// "principal P holds role Ro of resource R".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleAssignment {
    pub principal_id: String,
    pub resource_name: String,
    pub role_name: String,
    pub created_at: DateTime<Utc>,
}

/// Computed, never stored: a principal's effective access on a resource,
/// with the gating rule already applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PrincipalAccess {
    pub principal_id: String,
    pub resource_name: String,
    pub scope_names: Vec<String>,
    pub role_names: Vec<String>,
}
