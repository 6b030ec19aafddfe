//! Scope-Assignment store: dual-indexed principal↔scope relation, with
//! bulk deletes by principal, by resource, and by scope.

use std::sync::Arc;

use chrono::Utc;

use crate::codec;
use crate::error::RbacError;
use crate::kv::{CancellationToken, KvStore};
use crate::stores::resource::ResourceStore;
use crate::stores::scope::ScopeStore;
use crate::validation::NameValidator;

pub struct ScopeAssignmentStore {
    kv: Arc<dyn KvStore>,
    resource_validator: Arc<dyn NameValidator>,
    scope_validator: Arc<dyn NameValidator>,
}

impl ScopeAssignmentStore {
    pub fn new(
        kv: Arc<dyn KvStore>,
        resource_validator: Arc<dyn NameValidator>,
        scope_validator: Arc<dyn NameValidator>,
    ) -> Self {
        Self {
            kv,
            resource_validator,
            scope_validator,
        }
    }

    fn normalize_resource(&self, raw: &str) -> Result<String, RbacError> {
        let outcome = self.resource_validator.validate(raw);
        outcome
            .is_valid
            .then_some(outcome.normalized)
            .ok_or_else(|| RbacError::invalid_input(format!("invalid resource name: {raw:?}")))
    }

    fn normalize_scope(&self, raw: &str) -> Result<String, RbacError> {
        let outcome = self.scope_validator.validate(raw);
        outcome
            .is_valid
            .then_some(outcome.normalized)
            .ok_or_else(|| RbacError::invalid_input(format!("invalid scope name: {raw:?}")))
    }

    fn normalize_principal(raw: &str) -> Result<String, RbacError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(RbacError::invalid_input("principal id must not be empty"))
        } else {
            Ok(trimmed.to_string())
        }
    }

    /// Pre-verifies the resource and scope exist, then writes both index
    /// rows in one batch.
    pub async fn create(
        &self,
        raw_resource: &str,
        raw_scope: &str,
        raw_principal: &str,
        resource_store: &ResourceStore,
        scope_store: &ScopeStore,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let resource = self.normalize_resource(raw_resource)?;
        let scope = self.normalize_scope(raw_scope)?;
        let principal = Self::normalize_principal(raw_principal)?;

        if !resource_store.exists(&resource, cancel).await? {
            return Err(RbacError::not_found(format!(
                "resource {resource} not found"
            )));
        }
        if !scope_store.exists(&resource, &scope, cancel).await? {
            return Err(RbacError::not_found(format!(
                "scope {scope} not found on resource {resource}"
            )));
        }

        let created_at = Utc::now().to_rfc3339();
        let rows = codec::scope_assignment_rows(&resource, &scope, &principal, &created_at);
        self.kv.put_batch(rows.into(), cancel).await
    }

    /// Deletes both index rows in one batch; absence is not an error.
    pub async fn delete(
        &self,
        raw_resource: &str,
        raw_scope: &str,
        raw_principal: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let resource = self.normalize_resource(raw_resource)?;
        let scope = self.normalize_scope(raw_scope)?;
        let principal = Self::normalize_principal(raw_principal)?;
        let keys = vec![
            codec::scope_assignment_by_principal_key(&principal, &resource, &scope),
            codec::scope_assignment_by_scope_key(&resource, &scope, &principal),
        ];
        self.kv.delete_batch(keys, cancel).await
    }

    /// Prefix-queries the by-scope index on the resource partition; sorted
    /// ascending.
    pub async fn principals_for_scope(
        &self,
        normalized_resource: &str,
        normalized_scope: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RbacError> {
        let partition = codec::resource_partition(normalized_resource);
        let prefix = codec::scope_assignment_by_scope_prefix(normalized_scope);
        let rows = self.kv.query(&partition, Some(&prefix), cancel).await?;
        let mut principals: Vec<String> =
            rows.iter().filter_map(codec::decode_principal_id).collect();
        principals.sort();
        principals.dedup();
        Ok(principals)
    }

    /// Prefix-queries the by-principal index on the principal partition;
    /// sorted ascending. Internal helper used by the Access Composer.
    pub async fn scopes_for_principal(
        &self,
        normalized_principal: &str,
        normalized_resource: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RbacError> {
        let partition = codec::principal_partition(normalized_principal);
        let prefix = codec::scope_assignment_by_resource_prefix(normalized_resource);
        let rows = self.kv.query(&partition, Some(&prefix), cancel).await?;
        let mut scopes: Vec<String> = rows.iter().filter_map(codec::decode_scope_name).collect();
        scopes.sort();
        scopes.dedup();
        Ok(scopes)
    }

    /// Discovers every assignment for `principal` (across all resources)
    /// via the by-principal index, synthesizes the matching mirror items,
    /// and deletes the union in one batch.
    pub async fn delete_by_principal(
        &self,
        normalized_principal: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let partition = codec::principal_partition(normalized_principal);
        let rows = self
            .kv
            .query(&partition, Some(codec::scope_assignment_prefix()), cancel)
            .await?;
        let mut keys = Vec::with_capacity(rows.len() * 2);
        for row in &rows {
            let (Some(resource), Some(scope)) = (
                codec::decode_resource_name(row),
                codec::decode_scope_name(row),
            ) else {
                tracing::warn!(principal = normalized_principal, "skipping malformed scope assignment row during principal cascade");
                continue;
            };
            keys.push(codec::scope_assignment_by_principal_key(
                normalized_principal,
                &resource,
                &scope,
            ));
            keys.push(codec::scope_assignment_by_scope_key(
                &resource,
                &scope,
                normalized_principal,
            ));
        }
        self.kv.delete_batch(keys, cancel).await
    }

    /// Discovers every assignment for `resource` via the by-scope index
    /// (partition-aligned on the resource) and deletes the union.
    pub async fn delete_by_resource(
        &self,
        normalized_resource: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let partition = codec::resource_partition(normalized_resource);
        let rows = self
            .kv
            .query(&partition, Some(codec::scope_assignment_prefix()), cancel)
            .await?;
        let mut keys = Vec::with_capacity(rows.len() * 2);
        for row in &rows {
            let (Some(scope), Some(principal)) = (
                codec::decode_scope_name(row),
                codec::decode_principal_id(row),
            ) else {
                tracing::warn!(resource = normalized_resource, "skipping malformed scope assignment row during resource cascade");
                continue;
            };
            keys.push(codec::scope_assignment_by_scope_key(
                normalized_resource,
                &scope,
                &principal,
            ));
            keys.push(codec::scope_assignment_by_principal_key(
                &principal,
                normalized_resource,
                &scope,
            ));
        }
        self.kv.delete_batch(keys, cancel).await
    }

    /// Discovers every assignment for `(resource, scope)` via the by-scope
    /// index, filtered to the deleted scope, and deletes the union.
    pub async fn delete_by_scope(
        &self,
        normalized_resource: &str,
        normalized_scope: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let partition = codec::resource_partition(normalized_resource);
        let prefix = codec::scope_assignment_by_scope_prefix(normalized_scope);
        let rows = self.kv.query(&partition, Some(&prefix), cancel).await?;
        let mut keys = Vec::with_capacity(rows.len() * 2);
        for row in &rows {
            let Some(principal) = codec::decode_principal_id(row) else {
                tracing::warn!(resource = normalized_resource, scope = normalized_scope, "skipping malformed scope assignment row during scope cascade");
                continue;
            };
            keys.push(codec::scope_assignment_by_scope_key(
                normalized_resource,
                normalized_scope,
                &principal,
            ));
            keys.push(codec::scope_assignment_by_principal_key(
                &principal,
                normalized_resource,
                normalized_scope,
            ));
        }
        self.kv.delete_batch(keys, cancel).await
    }
}
