//! Role store: CRUD of role definition rows, gated on the parent resource
//! existing at creation time.

use std::sync::Arc;

use chrono::Utc;

use crate::codec;
use crate::error::RbacError;
use crate::kv::{CancellationToken, KvStore};
use crate::models::Role;
use crate::stores::resource::ResourceStore;
use crate::validation::NameValidator;

pub struct RoleStore {
    kv: Arc<dyn KvStore>,
    resource_validator: Arc<dyn NameValidator>,
    role_validator: Arc<dyn NameValidator>,
}

impl RoleStore {
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

    pub fn validator(&self) -> Arc<dyn NameValidator> {
        self.role_validator.clone()
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

    pub async fn create(
        &self,
        raw_resource: &str,
        raw_role: &str,
        resource_store: &ResourceStore,
        cancel: &CancellationToken,
    ) -> Result<Role, RbacError> {
        let resource = self.normalize_resource(raw_resource)?;
        let role = self.normalize_role(raw_role)?;

        if !resource_store.exists(&resource, cancel).await? {
            return Err(RbacError::not_found(format!(
                "resource {resource} not found"
            )));
        }

        let created_at = Utc::now();
        let (key, row) = codec::role_def_row(&resource, &role, &created_at.to_rfc3339());
        let inserted = self.kv.put_if_absent(key, row, cancel).await?;
        if !inserted {
            return Err(RbacError::already_exists(format!(
                "role {role} already exists on resource {resource}"
            )));
        }
        Ok(Role {
            resource_name: resource,
            role_name: role,
            created_at,
        })
    }

    pub async fn exists(
        &self,
        normalized_resource: &str,
        normalized_role: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, RbacError> {
        let key = codec::role_def_key(normalized_resource, normalized_role);
        Ok(self.kv.get_item(&key, cancel).await?.is_some())
    }

    pub async fn get(
        &self,
        raw_resource: &str,
        raw_role: &str,
        cancel: &CancellationToken,
    ) -> Result<Role, RbacError> {
        let resource = self.normalize_resource(raw_resource)?;
        let role = self.normalize_role(raw_role)?;
        let key = codec::role_def_key(&resource, &role);
        let row = self.kv.get_item(&key, cancel).await?.ok_or_else(|| {
            RbacError::not_found(format!("role {role} not found on resource {resource}"))
        })?;
        let created_at = row
            .get("_createdAt")
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        Ok(Role {
            resource_name: resource,
            role_name: role,
            created_at,
        })
    }

    pub async fn delete_definition(
        &self,
        normalized_resource: &str,
        normalized_role: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let key = codec::role_def_key(normalized_resource, normalized_role);
        self.kv.delete_batch(vec![key], cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::InMemoryKvStore;
    use crate::validation::DefaultNameValidator;

    fn stores() -> (ResourceStore, RoleStore) {
        let kv = Arc::new(InMemoryKvStore::new());
        let validator: Arc<dyn NameValidator> = Arc::new(DefaultNameValidator);
        (
            ResourceStore::new(kv.clone(), validator.clone()),
            RoleStore::new(kv, validator.clone(), validator),
        )
    }

    #[tokio::test]
    async fn create_against_missing_resource_is_not_found() {
        let (resource_store, role_store) = stores();
        let cancel = CancellationToken::new();
        let err = role_store
            .create("api://svc", "reader", &resource_store, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::NotFound { .. }));
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (resource_store, role_store) = stores();
        let cancel = CancellationToken::new();
        resource_store.create("api://svc", &cancel).await.unwrap();
        role_store
            .create("api://svc", "reader", &resource_store, &cancel)
            .await
            .unwrap();
        let got = role_store.get("api://svc", "reader", &cancel).await.unwrap();
        assert_eq!(got.role_name, "reader");
    }
}
