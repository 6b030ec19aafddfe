//! Resource store (part of C3): CRUD of resource definition rows plus
//! the `listScopes`/`listRoles` helpers used to populate `GetResource`.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::codec;
use crate::error::RbacError;
use crate::kv::{CancellationToken, KvStore};
use crate::models::Resource;
use crate::validation::NameValidator;

pub struct ResourceStore {
    kv: Arc<dyn KvStore>,
    validator: Arc<dyn NameValidator>,
}

impl ResourceStore {
    pub fn new(kv: Arc<dyn KvStore>, validator: Arc<dyn NameValidator>) -> Self {
        Self { kv, validator }
    }

    pub fn validator(&self) -> Arc<dyn NameValidator> {
        self.validator.clone()
    }

    fn normalize(&self, raw: &str) -> Result<String, RbacError> {
        let outcome = self.validator.validate(raw);
        if outcome.is_valid {
            Ok(outcome.normalized)
        } else {
            Err(RbacError::invalid_input(format!(
                "invalid resource name: {raw:?}"
            )))
        }
    }

    #[instrument(skip(self, cancel))]
    pub async fn create(
        &self,
        raw_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Resource, RbacError> {
        let resource = self.normalize(raw_name)?;
        let created_at = Utc::now();
        let (key, row) = codec::resource_def_row(&resource, &created_at.to_rfc3339());
        let inserted = self.kv.put_if_absent(key, row, cancel).await?;
        if !inserted {
            return Err(RbacError::already_exists(format!(
                "resource {resource} already exists"
            )));
        }
        Ok(Resource {
            resource_name: resource,
            scope_names: Vec::new(),
            role_names: Vec::new(),
            created_at,
        })
    }

    /// Existence check used by dependent creates (a scope, role, or
    /// assignment may only be created while its resource still exists).
    pub async fn exists(
        &self,
        normalized_resource: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, RbacError> {
        let key = codec::resource_def_key(normalized_resource);
        Ok(self.kv.get_item(&key, cancel).await?.is_some())
    }

    pub async fn get(
        &self,
        raw_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Resource, RbacError> {
        let resource = self.normalize(raw_name)?;
        let key = codec::resource_def_key(&resource);
        let row = self
            .kv
            .get_item(&key, cancel)
            .await?
            .ok_or_else(|| RbacError::not_found(format!("resource {resource} not found")))?;
        let created_at = row
            .get("_createdAt")
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let scope_names = self.list_scopes(&resource, cancel).await?;
        let role_names = self.list_roles(&resource, cancel).await?;

        Ok(Resource {
            resource_name: resource,
            scope_names,
            role_names,
            created_at,
        })
    }

    /// Deletes only the resource's own definition row; cascading the
    /// scopes/roles/assignments is the Cascade Orchestrator's job.
    pub async fn delete_definition(
        &self,
        normalized_resource: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let key = codec::resource_def_key(normalized_resource);
        self.kv.delete_batch(vec![key], cancel).await
    }

    /// Sorted, unique scope names under `resource`.
    pub async fn list_scopes(
        &self,
        normalized_resource: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RbacError> {
        let partition = codec::resource_partition(normalized_resource);
        let rows = self
            .kv
            .query(&partition, Some(codec::scope_def_prefix()), cancel)
            .await?;
        let mut names: Vec<String> = rows.iter().filter_map(codec::decode_scope_name).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Sorted, unique role names under `resource`.
    pub async fn list_roles(
        &self,
        normalized_resource: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RbacError> {
        let partition = codec::resource_partition(normalized_resource);
        let rows = self
            .kv
            .query(&partition, Some(codec::role_def_prefix()), cancel)
            .await?;
        let mut names: Vec<String> = rows.iter().filter_map(codec::decode_role_name).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
