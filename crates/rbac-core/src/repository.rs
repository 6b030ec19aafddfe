//! The public `Repository` facade: the core's only surface. A thin wiring
//! layer over the sub-repositories — every method here does
//! validation-then-prerequisite-check-then-gateway-call, nothing more.

use std::sync::Arc;

use crate::access::AccessComposer;
use crate::cascade::CascadeOrchestrator;
use crate::error::RbacError;
use crate::kv::{CancellationToken, KvStore};
use crate::models::{PrincipalAccess, Resource, Role, Scope};
use crate::stores::resource::ResourceStore;
use crate::stores::role::RoleStore;
use crate::stores::role_assignment::RoleAssignmentStore;
use crate::stores::scope::ScopeStore;
use crate::stores::scope_assignment::ScopeAssignmentStore;
use crate::validation::NameValidator;

/// One `NameValidator` instance per name kind; a single implementation may
/// serve all three.
pub struct Validators {
    pub resource: Arc<dyn NameValidator>,
    pub scope: Arc<dyn NameValidator>,
    pub role: Arc<dyn NameValidator>,
}

impl Validators {
    pub fn uniform(validator: Arc<dyn NameValidator>) -> Self {
        Self {
            resource: validator.clone(),
            scope: validator.clone(),
            role: validator,
        }
    }
}

pub struct Repository {
    resource_store: Arc<ResourceStore>,
    scope_store: Arc<ScopeStore>,
    role_store: Arc<RoleStore>,
    scope_assignment_store: Arc<ScopeAssignmentStore>,
    role_assignment_store: Arc<RoleAssignmentStore>,
    access_composer: AccessComposer,
    cascade: CascadeOrchestrator,
}

impl Repository {
    pub fn new(kv: Arc<dyn KvStore>, validators: Validators) -> Self {
        let resource_store = Arc::new(ResourceStore::new(kv.clone(), validators.resource.clone()));
        let scope_store = Arc::new(ScopeStore::new(
            kv.clone(),
            validators.resource.clone(),
            validators.scope.clone(),
        ));
        let role_store = Arc::new(RoleStore::new(
            kv.clone(),
            validators.resource.clone(),
            validators.role.clone(),
        ));
        let scope_assignment_store = Arc::new(ScopeAssignmentStore::new(
            kv.clone(),
            validators.resource.clone(),
            validators.scope.clone(),
        ));
        let role_assignment_store = Arc::new(RoleAssignmentStore::new(
            kv,
            validators.resource.clone(),
            validators.role.clone(),
        ));
        let access_composer = AccessComposer::new(
            resource_store.clone(),
            scope_store.clone(),
            scope_assignment_store.clone(),
            role_assignment_store.clone(),
            validators.resource.clone(),
            validators.scope.clone(),
        );
        let cascade = CascadeOrchestrator::new(
            resource_store.clone(),
            scope_store.clone(),
            role_store.clone(),
            scope_assignment_store.clone(),
            role_assignment_store.clone(),
        );

        Self {
            resource_store,
            scope_store,
            role_store,
            scope_assignment_store,
            role_assignment_store,
            access_composer,
            cascade,
        }
    }

    /// Convenience constructor wiring a single validator to all three name
    /// kinds, as most deployments do.
    pub fn with_validator(kv: Arc<dyn KvStore>, validator: Arc<dyn NameValidator>) -> Self {
        Self::new(kv, Validators::uniform(validator))
    }

    // ---- Resource -----------------------------------------------------

    pub async fn create_resource(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Resource, RbacError> {
        self.resource_store.create(name, cancel).await
    }

    pub async fn get_resource(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Resource, RbacError> {
        self.resource_store.get(name, cancel).await
    }

    pub async fn delete_resource(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let normalized = self.normalize_resource(name)?;
        self.cascade.delete_resource(&normalized, cancel).await
    }

    // ---- Scope ----------------------------------------------------------

    pub async fn create_scope(
        &self,
        resource: &str,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<Scope, RbacError> {
        self.scope_store
            .create(resource, scope, &self.resource_store, cancel)
            .await
    }

    pub async fn get_scope(
        &self,
        resource: &str,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<Scope, RbacError> {
        self.scope_store.get(resource, scope, cancel).await
    }

    pub async fn delete_scope(
        &self,
        resource: &str,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let resource = self.normalize_resource(resource)?;
        let scope = self.normalize_scope(scope)?;
        self.cascade.delete_scope(&resource, &scope, cancel).await
    }

    // ---- Role -------------------------------------------------------------

    pub async fn create_role(
        &self,
        resource: &str,
        role: &str,
        cancel: &CancellationToken,
    ) -> Result<Role, RbacError> {
        self.role_store
            .create(resource, role, &self.resource_store, cancel)
            .await
    }

    pub async fn get_role(
        &self,
        resource: &str,
        role: &str,
        cancel: &CancellationToken,
    ) -> Result<Role, RbacError> {
        self.role_store.get(resource, role, cancel).await
    }

    pub async fn delete_role(
        &self,
        resource: &str,
        role: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let resource = self.normalize_resource(resource)?;
        let role = self.normalize_role(role)?;
        self.cascade.delete_role(&resource, &role, cancel).await
    }

    // ---- Scope assignment ------------------------------------------------

    pub async fn create_scope_assignment(
        &self,
        resource: &str,
        scope: &str,
        principal: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        self.scope_assignment_store
            .create(
                resource,
                scope,
                principal,
                &self.resource_store,
                &self.scope_store,
                cancel,
            )
            .await
    }

    pub async fn delete_scope_assignment(
        &self,
        resource: &str,
        scope: &str,
        principal: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        self.scope_assignment_store
            .delete(resource, scope, principal, cancel)
            .await
    }

    pub async fn get_principals_for_scope(
        &self,
        resource: &str,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RbacError> {
        let resource = self.normalize_resource(resource)?;
        let scope = self.normalize_scope(scope)?;
        self.scope_assignment_store
            .principals_for_scope(&resource, &scope, cancel)
            .await
    }

    // ---- Role assignment ---------------------------------------------------

    pub async fn create_role_assignment(
        &self,
        resource: &str,
        role: &str,
        principal: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        self.role_assignment_store
            .create(
                resource,
                role,
                principal,
                &self.resource_store,
                &self.role_store,
                cancel,
            )
            .await
    }

    pub async fn delete_role_assignment(
        &self,
        resource: &str,
        role: &str,
        principal: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        self.role_assignment_store
            .delete(resource, role, principal, cancel)
            .await
    }

    pub async fn get_principals_for_role(
        &self,
        resource: &str,
        role: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, RbacError> {
        let resource = self.normalize_resource(resource)?;
        let role = self.normalize_role(role)?;
        self.role_assignment_store
            .principals_for_role(&resource, &role, cancel)
            .await
    }

    // ---- Principal ----------------------------------------------------------

    pub async fn delete_principal(
        &self,
        principal: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let trimmed = principal.trim();
        if trimmed.is_empty() {
            return Err(RbacError::invalid_input("principal id must not be empty"));
        }
        self.cascade.delete_principal(trimmed, cancel).await
    }

    pub async fn get_principal_access(
        &self,
        principal: &str,
        resource: &str,
        cancel: &CancellationToken,
    ) -> Result<PrincipalAccess, RbacError> {
        self.access_composer
            .get_principal_access(principal, resource, cancel)
            .await
    }

    pub async fn get_principal_access_scoped(
        &self,
        principal: &str,
        resource: &str,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<PrincipalAccess, RbacError> {
        self.access_composer
            .get_principal_access_scoped(principal, resource, scope, cancel)
            .await
    }

    // ---- Helpers ---------------------------------------------------------

    fn normalize_resource(&self, raw: &str) -> Result<String, RbacError> {
        let outcome = self.resource_store.validator().validate(raw);
        outcome
            .is_valid
            .then_some(outcome.normalized)
            .ok_or_else(|| RbacError::invalid_input(format!("invalid resource name: {raw:?}")))
    }

    fn normalize_scope(&self, raw: &str) -> Result<String, RbacError> {
        let outcome = self.scope_store.validator().validate(raw);
        outcome
            .is_valid
            .then_some(outcome.normalized)
            .ok_or_else(|| RbacError::invalid_input(format!("invalid scope name: {raw:?}")))
    }

    fn normalize_role(&self, raw: &str) -> Result<String, RbacError> {
        let outcome = self.role_store.validator().validate(raw);
        outcome
            .is_valid
            .then_some(outcome.normalized)
            .ok_or_else(|| RbacError::invalid_input(format!("invalid role name: {raw:?}")))
    }

}
