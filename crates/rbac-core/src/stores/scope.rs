//! Scope store: CRUD of scope definition rows, gated on the parent
//! resource existing at creation time.

use std::sync::Arc;

use chrono::Utc;

use crate::codec;
use crate::error::RbacError;
use crate::kv::{CancellationToken, KvStore};
use crate::models::Scope;
use crate::stores::resource::ResourceStore;
use crate::validation::NameValidator;

pub struct ScopeStore {
    kv: Arc<dyn KvStore>,
    resource_validator: Arc<dyn NameValidator>,
    scope_validator: Arc<dyn NameValidator>,
}

impl ScopeStore {
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

    pub fn validator(&self) -> Arc<dyn NameValidator> {
        self.scope_validator.clone()
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

    pub async fn create(
        &self,
        raw_resource: &str,
        raw_scope: &str,
        resource_store: &ResourceStore,
        cancel: &CancellationToken,
    ) -> Result<Scope, RbacError> {
        let resource = self.normalize_resource(raw_resource)?;
        let scope = self.normalize_scope(raw_scope)?;

        if !resource_store.exists(&resource, cancel).await? {
            return Err(RbacError::not_found(format!(
                "resource {resource} not found"
            )));
        }

        let created_at = Utc::now();
        let (key, row) = codec::scope_def_row(&resource, &scope, &created_at.to_rfc3339());
        let inserted = self.kv.put_if_absent(key, row, cancel).await?;
        if !inserted {
            return Err(RbacError::already_exists(format!(
                "scope {scope} already exists on resource {resource}"
            )));
        }
        Ok(Scope {
            resource_name: resource,
            scope_name: scope,
            created_at,
        })
    }

    pub async fn exists(
        &self,
        normalized_resource: &str,
        normalized_scope: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, RbacError> {
        let key = codec::scope_def_key(normalized_resource, normalized_scope);
        Ok(self.kv.get_item(&key, cancel).await?.is_some())
    }

    pub async fn get(
        &self,
        raw_resource: &str,
        raw_scope: &str,
        cancel: &CancellationToken,
    ) -> Result<Scope, RbacError> {
        let resource = self.normalize_resource(raw_resource)?;
        let scope = self.normalize_scope(raw_scope)?;
        let key = codec::scope_def_key(&resource, &scope);
        let row = self.kv.get_item(&key, cancel).await?.ok_or_else(|| {
            RbacError::not_found(format!("scope {scope} not found on resource {resource}"))
        })?;
        let created_at = row
            .get("_createdAt")
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        Ok(Scope {
            resource_name: resource,
            scope_name: scope,
            created_at,
        })
    }

    pub async fn delete_definition(
        &self,
        normalized_resource: &str,
        normalized_scope: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let key = codec::scope_def_key(normalized_resource, normalized_scope);
        self.kv.delete_batch(vec![key], cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::InMemoryKvStore;
    use crate::validation::DefaultNameValidator;

    fn stores() -> (ResourceStore, ScopeStore) {
        let kv = Arc::new(InMemoryKvStore::new());
        let validator: Arc<dyn NameValidator> = Arc::new(DefaultNameValidator);
        (
            ResourceStore::new(kv.clone(), validator.clone()),
            ScopeStore::new(kv, validator.clone(), validator),
        )
    }

    #[tokio::test]
    async fn create_against_missing_resource_is_not_found() {
        let (resource_store, scope_store) = stores();
        let cancel = CancellationToken::new();
        let err = scope_store
            .create("api://svc", "prod", &resource_store, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::NotFound { .. }));
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (resource_store, scope_store) = stores();
        let cancel = CancellationToken::new();
        resource_store.create("api://svc", &cancel).await.unwrap();
        scope_store
            .create("api://svc", "prod", &resource_store, &cancel)
            .await
            .unwrap();
        let got = scope_store.get("api://svc", "prod", &cancel).await.unwrap();
        assert_eq!(got.scope_name, "prod");
    }
}
