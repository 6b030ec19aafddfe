//! Key Codec: formats/parses the composite partition and sort keys for
//! every stored row, and materializes row attributes so that a row never
//! needs its sort key split to be parsed back into a domain value.

use std::collections::HashMap;

/// One row's attributes. All values are string-typed, matching the
/// key-value store's attribute contract.
pub type Row = HashMap<String, String>;

/// A `(partition_key, sort_key)` pair.
pub type Key = (String, String);

const MARK_RESOURCE: &str = "RESOURCE#";
const MARK_SCOPE: &str = "SCOPE#";
const MARK_ROLE: &str = "ROLE#";
const MARK_SCOPE_ASSIGNMENT: &str = "SCOPEASSIGNMENT#";
const MARK_ROLE_ASSIGNMENT: &str = "ROLEASSIGNMENT#";
const MARK_PRINCIPAL: &str = "PRINCIPAL#";

/// Sentinel sort key for a resource's own definition row.
const RESOURCE_SENTINEL: &str = "RESOURCE";

fn attr_kind(attrs: &mut Row, kind: &str) {
    attrs.insert("_kind".to_string(), kind.to_string());
}

/// `RESOURCE#{resource}` partition helper, used by every row that hangs
/// off a resource's namespace (scopes, roles, and the by-resource/by-scope/
/// by-role assignment indexes).
pub fn resource_partition(resource: &str) -> String {
    format!("{MARK_RESOURCE}{resource}")
}

/// `PRINCIPAL#{principal}` partition helper, used by the by-principal
/// assignment indexes.
pub fn principal_partition(principal: &str) -> String {
    format!("{MARK_PRINCIPAL}{principal}")
}

// ---- Resource definition --------------------------------------------------

pub fn resource_def_key(resource: &str) -> Key {
    (resource_partition(resource), RESOURCE_SENTINEL.to_string())
}

pub fn resource_def_row(resource: &str, created_at: &str) -> (Key, Row) {
    let mut attrs = Row::new();
    attrs.insert("_resourceName".to_string(), resource.to_string());
    attrs.insert("_createdAt".to_string(), created_at.to_string());
    attr_kind(&mut attrs, "resource");
    (resource_def_key(resource), attrs)
}

// ---- Scope definition ------------------------------------------------------

pub fn scope_def_key(resource: &str, scope: &str) -> Key {
    (resource_partition(resource), format!("{MARK_SCOPE}{scope}"))
}

pub fn scope_def_row(resource: &str, scope: &str, created_at: &str) -> (Key, Row) {
    let mut attrs = Row::new();
    attrs.insert("_resourceName".to_string(), resource.to_string());
    attrs.insert("_scopeName".to_string(), scope.to_string());
    attrs.insert("_createdAt".to_string(), created_at.to_string());
    attr_kind(&mut attrs, "scope");
    (scope_def_key(resource, scope), attrs)
}

pub fn scope_def_prefix() -> &'static str {
    MARK_SCOPE
}

// ---- Role definition --------------------------------------------------------

pub fn role_def_key(resource: &str, role: &str) -> Key {
    (resource_partition(resource), format!("{MARK_ROLE}{role}"))
}

pub fn role_def_row(resource: &str, role: &str, created_at: &str) -> (Key, Row) {
    let mut attrs = Row::new();
    attrs.insert("_resourceName".to_string(), resource.to_string());
    attrs.insert("_roleName".to_string(), role.to_string());
    attrs.insert("_createdAt".to_string(), created_at.to_string());
    attr_kind(&mut attrs, "role");
    (role_def_key(resource, role), attrs)
}

pub fn role_def_prefix() -> &'static str {
    MARK_ROLE
}

// ---- Scope assignment: dual index ------------------------------------------

/// By-principal index row: `PRINCIPAL#{principal}` / `SCOPEASSIGNMENT#{resource}#{scope}`.
pub fn scope_assignment_by_principal_key(principal: &str, resource: &str, scope: &str) -> Key {
    (
        principal_partition(principal),
        format!("{MARK_SCOPE_ASSIGNMENT}{resource}#{scope}"),
    )
}

/// By-scope index row: `RESOURCE#{resource}` / `SCOPEASSIGNMENT#{scope}#{principal}`.
pub fn scope_assignment_by_scope_key(resource: &str, scope: &str, principal: &str) -> Key {
    (
        resource_partition(resource),
        format!("{MARK_SCOPE_ASSIGNMENT}{scope}#{principal}"),
    )
}

fn scope_assignment_attrs(
    resource: &str,
    scope: &str,
    principal: &str,
    created_at: &str,
) -> Row {
    let mut attrs = Row::new();
    attrs.insert("_principalId".to_string(), principal.to_string());
    attrs.insert("_resourceName".to_string(), resource.to_string());
    attrs.insert("_scopeName".to_string(), scope.to_string());
    attrs.insert("_createdAt".to_string(), created_at.to_string());
    attr_kind(&mut attrs, "scope_assignment");
    attrs
}

/// Both index rows for one scope assignment, sharing an identical
/// payload and differing only in partition/sort key placement.
pub fn scope_assignment_rows(
    resource: &str,
    scope: &str,
    principal: &str,
    created_at: &str,
) -> [(Key, Row); 2] {
    let attrs = scope_assignment_attrs(resource, scope, principal, created_at);
    [
        (
            scope_assignment_by_principal_key(principal, resource, scope),
            attrs.clone(),
        ),
        (
            scope_assignment_by_scope_key(resource, scope, principal),
            attrs,
        ),
    ]
}

pub fn scope_assignment_prefix() -> &'static str {
    MARK_SCOPE_ASSIGNMENT
}

pub fn scope_assignment_by_scope_prefix(scope: &str) -> String {
    format!("{MARK_SCOPE_ASSIGNMENT}{scope}#")
}

pub fn scope_assignment_by_resource_prefix(resource: &str) -> String {
    format!("{MARK_SCOPE_ASSIGNMENT}{resource}#")
}

// ---- Role assignment: dual index -------------------------------------------

pub fn role_assignment_by_principal_key(principal: &str, resource: &str, role: &str) -> Key {
    (
        principal_partition(principal),
        format!("{MARK_ROLE_ASSIGNMENT}{resource}#{role}"),
    )
}

pub fn role_assignment_by_role_key(resource: &str, role: &str, principal: &str) -> Key {
    (
        resource_partition(resource),
        format!("{MARK_ROLE_ASSIGNMENT}{role}#{principal}"),
    )
}

fn role_assignment_attrs(resource: &str, role: &str, principal: &str, created_at: &str) -> Row {
    let mut attrs = Row::new();
    attrs.insert("_principalId".to_string(), principal.to_string());
    attrs.insert("_resourceName".to_string(), resource.to_string());
    attrs.insert("_roleName".to_string(), role.to_string());
    attrs.insert("_createdAt".to_string(), created_at.to_string());
    attr_kind(&mut attrs, "role_assignment");
    attrs
}

pub fn role_assignment_rows(
    resource: &str,
    role: &str,
    principal: &str,
    created_at: &str,
) -> [(Key, Row); 2] {
    let attrs = role_assignment_attrs(resource, role, principal, created_at);
    [
        (
            role_assignment_by_principal_key(principal, resource, role),
            attrs.clone(),
        ),
        (role_assignment_by_role_key(resource, role, principal), attrs),
    ]
}

pub fn role_assignment_prefix() -> &'static str {
    MARK_ROLE_ASSIGNMENT
}

pub fn role_assignment_by_role_prefix(role: &str) -> String {
    format!("{MARK_ROLE_ASSIGNMENT}{role}#")
}

pub fn role_assignment_by_resource_prefix(resource: &str) -> String {
    format!("{MARK_ROLE_ASSIGNMENT}{resource}#")
}

// ---- Decoding helpers -------------------------------------------------------

pub fn decode_resource_name(row: &Row) -> Option<String> {
    row.get("_resourceName").cloned()
}

pub fn decode_scope_name(row: &Row) -> Option<String> {
    row.get("_scopeName").cloned()
}

pub fn decode_role_name(row: &Row) -> Option<String> {
    row.get("_roleName").cloned()
}

pub fn decode_principal_id(row: &Row) -> Option<String> {
    row.get("_principalId").cloned()
}
