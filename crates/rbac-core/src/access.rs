//! Access Composer: computes `PrincipalAccess` by concurrently joining
//! scope and role assignments, applying the gating rule. Never writes.

use std::sync::Arc;

use crate::error::RbacError;
use crate::kv::CancellationToken;
use crate::models::PrincipalAccess;
use crate::stores::resource::ResourceStore;
use crate::stores::role_assignment::RoleAssignmentStore;
use crate::stores::scope::ScopeStore;
use crate::stores::scope_assignment::ScopeAssignmentStore;
use crate::validation::NameValidator;

pub struct AccessComposer {
    resource_store: Arc<ResourceStore>,
    scope_store: Arc<ScopeStore>,
    scope_assignment_store: Arc<ScopeAssignmentStore>,
    role_assignment_store: Arc<RoleAssignmentStore>,
    resource_validator: Arc<dyn NameValidator>,
    scope_validator: Arc<dyn NameValidator>,
}

impl AccessComposer {
    pub fn new(
        resource_store: Arc<ResourceStore>,
        scope_store: Arc<ScopeStore>,
        scope_assignment_store: Arc<ScopeAssignmentStore>,
        role_assignment_store: Arc<RoleAssignmentStore>,
        resource_validator: Arc<dyn NameValidator>,
        scope_validator: Arc<dyn NameValidator>,
    ) -> Self {
        Self {
            resource_store,
            scope_store,
            scope_assignment_store,
            role_assignment_store,
            resource_validator,
            scope_validator,
        }
    }

    /// Two-argument variant: no scope filter applied.
    pub async fn get_principal_access(
        &self,
        raw_principal: &str,
        raw_resource: &str,
        cancel: &CancellationToken,
    ) -> Result<PrincipalAccess, RbacError> {
        self.compose(raw_principal, raw_resource, None, cancel).await
    }

    /// Three-argument variant: filters the scope list to `raw_scope`
    /// unless it is the reserved default, in which case it behaves like
    /// the two-argument form.
    pub async fn get_principal_access_scoped(
        &self,
        raw_principal: &str,
        raw_resource: &str,
        raw_scope: &str,
        cancel: &CancellationToken,
    ) -> Result<PrincipalAccess, RbacError> {
        self.compose(raw_principal, raw_resource, Some(raw_scope), cancel)
            .await
    }

    async fn compose(
        &self,
        raw_principal: &str,
        raw_resource: &str,
        raw_scope: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PrincipalAccess, RbacError> {
        let principal = {
            let trimmed = raw_principal.trim();
            if trimmed.is_empty() {
                return Err(RbacError::invalid_input("principal id must not be empty"));
            }
            trimmed.to_string()
        };

        let resource_outcome = self.resource_validator.validate(raw_resource);
        if !resource_outcome.is_valid {
            return Err(RbacError::invalid_input(format!(
                "invalid resource name: {raw_resource:?}"
            )));
        }
        let resource = resource_outcome.normalized;

        if !self.resource_store.exists(&resource, cancel).await? {
            return Err(RbacError::not_found(format!(
                "resource {resource} not found"
            )));
        }

        let scope_filter = match raw_scope {
            None => None,
            Some(raw) => {
                let outcome = self.scope_validator.validate(raw);
                if !outcome.is_valid {
                    return Err(RbacError::invalid_input(format!(
                        "invalid scope name: {raw:?}"
                    )));
                }
                let normalized = outcome.normalized;
                if !self.scope_validator.is_default(&normalized)
                    && !self.scope_store.exists(&resource, &normalized, cancel).await?
                {
                    return Err(RbacError::not_found(format!(
                        "scope {normalized} not found on resource {resource}"
                    )));
                }
                Some(normalized)
            }
        };

        // Concurrently join scope and role assignments.
        let (scopes, roles) = tokio::try_join!(
            self.scope_assignment_store
                .scopes_for_principal(&principal, &resource, cancel),
            self.role_assignment_store
                .roles_for_principal(&principal, &resource, cancel)
        )?;

        let scope_names = match scope_filter {
            Some(scope) if !self.scope_validator.is_default(&scope) => {
                scopes.into_iter().filter(|s| *s == scope).collect()
            }
            _ => scopes,
        };

        // Gating rule: empty scopes force empty roles.
        let role_names = if scope_names.is_empty() { Vec::new() } else { roles };

        Ok(PrincipalAccess {
            principal_id: principal,
            resource_name: resource,
            scope_names,
            role_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::InMemoryKvStore;
    use crate::stores::role::RoleStore;
    use crate::validation::DefaultNameValidator;

    struct Harness {
        resource_store: Arc<ResourceStore>,
        scope_store: Arc<ScopeStore>,
        role_store: Arc<RoleStore>,
        scope_assignment_store: Arc<ScopeAssignmentStore>,
        role_assignment_store: Arc<RoleAssignmentStore>,
        composer: AccessComposer,
    }

    fn harness() -> Harness {
        let kv = Arc::new(InMemoryKvStore::new());
        let validator: Arc<dyn NameValidator> = Arc::new(DefaultNameValidator);
        let resource_store = Arc::new(ResourceStore::new(kv.clone(), validator.clone()));
        let scope_store = Arc::new(ScopeStore::new(kv.clone(), validator.clone(), validator.clone()));
        let role_store = Arc::new(RoleStore::new(kv.clone(), validator.clone(), validator.clone()));
        let scope_assignment_store = Arc::new(ScopeAssignmentStore::new(
            kv.clone(),
            validator.clone(),
            validator.clone(),
        ));
        let role_assignment_store = Arc::new(RoleAssignmentStore::new(
            kv,
            validator.clone(),
            validator.clone(),
        ));
        let composer = AccessComposer::new(
            resource_store.clone(),
            scope_store.clone(),
            scope_assignment_store.clone(),
            role_assignment_store.clone(),
            validator.clone(),
            validator,
        );
        Harness {
            resource_store,
            scope_store,
            role_store,
            scope_assignment_store,
            role_assignment_store,
            composer,
        }
    }

    #[tokio::test]
    async fn gating_rule_empties_roles_without_scope_assignment() {
        let h = harness();
        let cancel = CancellationToken::new();
        h.resource_store.create("api://svc", &cancel).await.unwrap();
        h.role_store
            .create("api://svc", "reader", &h.resource_store, &cancel)
            .await
            .unwrap();
        h.role_assignment_store
            .create(
                "api://svc",
                "reader",
                "arn:aws:iam::1:user/u",
                &h.resource_store,
                &h.role_store,
                &cancel,
            )
            .await
            .unwrap();

        let access = h
            .composer
            .get_principal_access("arn:aws:iam::1:user/u", "api://svc", &cancel)
            .await
            .unwrap();
        assert!(access.scope_names.is_empty());
        assert!(access.role_names.is_empty());
    }

    #[tokio::test]
    async fn scoped_access_includes_roles_once_scope_assigned() {
        let h = harness();
        let cancel = CancellationToken::new();
        h.resource_store.create("api://svc", &cancel).await.unwrap();
        h.scope_store
            .create("api://svc", "prod", &h.resource_store, &cancel)
            .await
            .unwrap();
        h.role_store
            .create("api://svc", "reader", &h.resource_store, &cancel)
            .await
            .unwrap();
        h.scope_assignment_store
            .create(
                "api://svc",
                "prod",
                "arn:aws:iam::1:user/u",
                &h.resource_store,
                &h.scope_store,
                &cancel,
            )
            .await
            .unwrap();
        h.role_assignment_store
            .create(
                "api://svc",
                "reader",
                "arn:aws:iam::1:user/u",
                &h.resource_store,
                &h.role_store,
                &cancel,
            )
            .await
            .unwrap();

        let access = h
            .composer
            .get_principal_access("arn:aws:iam::1:user/u", "api://svc", &cancel)
            .await
            .unwrap();
        assert_eq!(access.scope_names, vec!["prod".to_string()]);
        assert_eq!(access.role_names, vec!["reader".to_string()]);

        // Scope filter to a non-matching scope clears both lists.
        let filtered = h
            .composer
            .get_principal_access_scoped("arn:aws:iam::1:user/u", "api://svc", "dev", &cancel)
            .await
            .unwrap();
        assert!(filtered.scope_names.is_empty());
        assert!(filtered.role_names.is_empty());

        // Default-scope equivalence.
        let defaulted = h
            .composer
            .get_principal_access_scoped(
                "arn:aws:iam::1:user/u",
                "api://svc",
                crate::validation::DEFAULT_SCOPE_NAME,
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(defaulted, access);
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let h = harness();
        let cancel = CancellationToken::new();
        let err = h
            .composer
            .get_principal_access("arn:p", "api://svc", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::NotFound { .. }));
    }
}
