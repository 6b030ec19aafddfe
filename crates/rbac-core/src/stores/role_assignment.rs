//! Role-Assignment store: structurally identical to the Scope-Assignment
//! store with `role` substituted for `scope`.

use std::sync::Arc;

use chrono::Utc;

use crate::codec;
use crate::error::RbacError;
use crate::kv::{CancellationToken, KvStore};
use crate::stores::resource::ResourceStore;
use crate::stores::role::RoleStore;
use crate::validation::NameValidator;

pub struct RoleAssignmentStore {
    kv: Arc<dyn KvStore>,
    resource_validator: Arc<dyn NameValidator>,
    role_validator: Arc<dyn NameValidator>,
}

impl RoleAssignmentStore {
    pub fn new(
        kv: Arc<dyn KvStore>,
        resource_validator: Arc<dyn NameValidator>,
        role_validator: Arc<dyn NameValidator>,
    ) -> Self {
        Self {
            kv,
            resource_validator,
            role_validator,
        }
    }

    fn normalize_resource(&self, raw: &str) -> Result<String, RbacError> {
        let outcome = self.resource_validator.validate(raw);
        outcome
            .is_valid
            .then_some(outcome.normalized)
            .ok_or_else(|| RbacError::invalid_input(format!("invalid resource name: {raw:?}")))
    }

    fn normalize_role(&self, raw: &str) -> Result<String, RbacError> {
        let outcome = self.role_validator.validate(raw);
        outcome
            .is_valid
            .then_some(outcome.normalized)
            .ok_or_else(|| RbacError::invalid_input(format!("invalid role name: {raw:?}")))
    }

    fn normalize_principal(raw: &str) -> Result<String, RbacError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(RbacError::invalid_input("principal id must not be empty"))
        } else {
            Ok(trimmed.to_string())
        }
    }

    pub async fn create(
        &self,
        raw_resource: &str,
        raw_role: &str,
        raw_principal: &str,
        resource_store: &ResourceStore,
        role_store: &RoleStore,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let resource = self.normalize_resource(raw_resource)?;
        let role = self.normalize_role(raw_role)?;
        let principal = Self::normalize_principal(raw_principal)?;

        if !resource_store.exists(&resource, cancel).await? {
            return Err(RbacError::not_found(format!(
                "resource {resource} not found"
            )));
        }
        if !role_store.exists(&resource, &role, cancel).await? {
            return Err(RbacError::not_found(format!(
                "role {role} not found on resource {resource}"
            )));
        }

        let created_at = Utc::now().to_rfc3339();
        let rows = codec::role_assignment_rows(&resource, &role, &principal, &created_at);
        self.kv.put_batch(rows.into(), cancel).await
    }

    pub async fn delete(
        &self,
        raw_resource: &str,
        raw_role: &str,
        raw_principal: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let resource = self.normalize_resource(raw_resource)?;
        let role = self.normalize_role(raw_role)?;
        let principal = Self::normalize_principal(raw_principal)?;
        let keys = vec![
            codec::role_assignment_by_principal_key(&principal, &resource, &role),
            codec::role_assignment_by_role_key(&resource, &role, &principal),
        ];
        self.kv.delete_batch(keys, cancel).await
    }

    pub async fn principals_for_role(
        &self,
        normalized_resource: &str,
        normalized_role: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RbacError> {
        let partition = codec::resource_partition(normalized_resource);
        let prefix = codec::role_assignment_by_role_prefix(normalized_role);
        let rows = self.kv.query(&partition, Some(&prefix), cancel).await?;
        let mut principals: Vec<String> =
            rows.iter().filter_map(codec::decode_principal_id).collect();
        principals.sort();
        principals.dedup();
        Ok(principals)
    }

    /// Internal helper used by the Access Composer.
    pub async fn roles_for_principal(
        &self,
        normalized_principal: &str,
        normalized_resource: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RbacError> {
        let partition = codec::principal_partition(normalized_principal);
        let prefix = codec::role_assignment_by_resource_prefix(normalized_resource);
        let rows = self.kv.query(&partition, Some(&prefix), cancel).await?;
        let mut roles: Vec<String> = rows.iter().filter_map(codec::decode_role_name).collect();
        roles.sort();
        roles.dedup();
        Ok(roles)
    }

    pub async fn delete_by_principal(
        &self,
        normalized_principal: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let partition = codec::principal_partition(normalized_principal);
        let rows = self
            .kv
            .query(&partition, Some(codec::role_assignment_prefix()), cancel)
            .await?;
        let mut keys = Vec::with_capacity(rows.len() * 2);
        for row in &rows {
            let (Some(resource), Some(role)) = (
                codec::decode_resource_name(row),
                codec::decode_role_name(row),
            ) else {
                tracing::warn!(principal = normalized_principal, "skipping malformed role assignment row during principal cascade");
                continue;
            };
            keys.push(codec::role_assignment_by_principal_key(
                normalized_principal,
                &resource,
                &role,
            ));
            keys.push(codec::role_assignment_by_role_key(
                &resource,
                &role,
                normalized_principal,
            ));
        }
        self.kv.delete_batch(keys, cancel).await
    }

    pub async fn delete_by_resource(
        &self,
        normalized_resource: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let partition = codec::resource_partition(normalized_resource);
        let rows = self
            .kv
            .query(&partition, Some(codec::role_assignment_prefix()), cancel)
            .await?;
        let mut keys = Vec::with_capacity(rows.len() * 2);
        for row in &rows {
            let (Some(role), Some(principal)) = (
                codec::decode_role_name(row),
                codec::decode_principal_id(row),
            ) else {
                tracing::warn!(resource = normalized_resource, "skipping malformed role assignment row during resource cascade");
                continue;
            };
            keys.push(codec::role_assignment_by_role_key(
                normalized_resource,
                &role,
                &principal,
            ));
            keys.push(codec::role_assignment_by_principal_key(
                &principal,
                normalized_resource,
                &role,
            ));
        }
        self.kv.delete_batch(keys, cancel).await
    }

    pub async fn delete_by_role(
        &self,
        normalized_resource: &str,
        normalized_role: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let partition = codec::resource_partition(normalized_resource);
        let prefix = codec::role_assignment_by_role_prefix(normalized_role);
        let rows = self.kv.query(&partition, Some(&prefix), cancel).await?;
        let mut keys = Vec::with_capacity(rows.len() * 2);
        for row in &rows {
            let Some(principal) = codec::decode_principal_id(row) else {
                tracing::warn!(resource = normalized_resource, role = normalized_role, "skipping malformed role assignment row during role cascade");
                continue;
            };
            keys.push(codec::role_assignment_by_role_key(
                normalized_resource,
                normalized_role,
                &principal,
            ));
            keys.push(codec::role_assignment_by_principal_key(
                &principal,
                normalized_resource,
                normalized_role,
            ));
        }
        self.kv.delete_batch(keys, cancel).await
    }
}
