//! Cascading Delete Orchestrator: `DeleteResource`, `DeleteScope`,
//! `DeleteRole`, and `DeletePrincipal` fan-outs. Every operation here is
//! idempotent and safely re-runnable; failures are reported but never
//! unwind earlier steps.

use std::sync::Arc;

use futures::future::join_all;

use crate::error::RbacError;
use crate::kv::CancellationToken;
use crate::stores::resource::ResourceStore;
use crate::stores::role::RoleStore;
use crate::stores::role_assignment::RoleAssignmentStore;
use crate::stores::scope::ScopeStore;
use crate::stores::scope_assignment::ScopeAssignmentStore;

pub struct CascadeOrchestrator {
    resource_store: Arc<ResourceStore>,
    scope_store: Arc<ScopeStore>,
    role_store: Arc<RoleStore>,
    scope_assignment_store: Arc<ScopeAssignmentStore>,
    role_assignment_store: Arc<RoleAssignmentStore>,
}

impl CascadeOrchestrator {
    pub fn new(
        resource_store: Arc<ResourceStore>,
        scope_store: Arc<ScopeStore>,
        role_store: Arc<RoleStore>,
        scope_assignment_store: Arc<ScopeAssignmentStore>,
        role_assignment_store: Arc<RoleAssignmentStore>,
    ) -> Self {
        Self {
            resource_store,
            scope_store,
            role_store,
            scope_assignment_store,
            role_assignment_store,
        }
    }

    /// Deletes the resource definition first (so no new scopes, roles, or
    /// assignments can be created against it), then fans out the four
    /// independent sweeps in parallel.
    pub async fn delete_resource(
        &self,
        normalized_resource: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        self.resource_store
            .delete_definition(normalized_resource, cancel)
            .await?;

        let scope_names = self
            .resource_store
            .list_scopes(normalized_resource, cancel)
            .await
            .unwrap_or_default();
        let role_names = self
            .resource_store
            .list_roles(normalized_resource, cancel)
            .await
            .unwrap_or_default();

        let scope_deletes = scope_names.iter().map(|scope| {
            let store = self.scope_store.clone();
            let resource = normalized_resource.to_string();
            let scope = scope.clone();
            let cancel = cancel.clone();
            async move { store.delete_definition(&resource, &scope, &cancel).await }
        });
        let role_deletes = role_names.iter().map(|role| {
            let store = self.role_store.clone();
            let resource = normalized_resource.to_string();
            let role = role.clone();
            let cancel = cancel.clone();
            async move { store.delete_definition(&resource, &role, &cancel).await }
        });

        let (scope_results, role_results, scope_assignment_result, role_assignment_result) = tokio::join!(
            join_all(scope_deletes),
            join_all(role_deletes),
            self.scope_assignment_store
                .delete_by_resource(normalized_resource, cancel),
            self.role_assignment_store
                .delete_by_resource(normalized_resource, cancel),
        );

        report_first_failure(
            scope_results
                .into_iter()
                .chain(role_results)
                .chain([scope_assignment_result, role_assignment_result]),
        )
    }

    /// Deletes the scope definition, then sweeps assignments that
    /// reference it.
    pub async fn delete_scope(
        &self,
        normalized_resource: &str,
        normalized_scope: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        self.scope_store
            .delete_definition(normalized_resource, normalized_scope, cancel)
            .await?;
        self.scope_assignment_store
            .delete_by_scope(normalized_resource, normalized_scope, cancel)
            .await
    }

    /// Deletes the role definition, then sweeps assignments that
    /// reference it.
    pub async fn delete_role(
        &self,
        normalized_resource: &str,
        normalized_role: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        self.role_store
            .delete_definition(normalized_resource, normalized_role, cancel)
            .await?;
        self.role_assignment_store
            .delete_by_role(normalized_resource, normalized_role, cancel)
            .await
    }

    /// Runs both principal-scoped sweeps concurrently.
    pub async fn delete_principal(
        &self,
        normalized_principal: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        let (scope_result, role_result) = tokio::join!(
            self.scope_assignment_store
                .delete_by_principal(normalized_principal, cancel),
            self.role_assignment_store
                .delete_by_principal(normalized_principal, cancel),
        );
        report_first_failure([scope_result, role_result].into_iter())
    }
}

/// Surfaces the first failure among a set of independently-issued
/// deletes without undoing whatever already succeeded; cascades are
/// idempotent, so the caller can simply re-issue the operation.
fn report_first_failure(
    results: impl Iterator<Item = Result<(), RbacError>>,
) -> Result<(), RbacError> {
    let mut first_err = None;
    for result in results {
        if let Err(e) = result {
            tracing::warn!(error = %e, "cascade sub-operation failed; operation is idempotent and may be re-issued");
            if first_err.is_none() {
                first_err = Some(e);
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::InMemoryKvStore;
    use crate::validation::DefaultNameValidator;
    use crate::validation::NameValidator;
    use std::sync::Arc;

    struct Harness {
        resource_store: Arc<ResourceStore>,
        scope_store: Arc<ScopeStore>,
        role_store: Arc<RoleStore>,
        scope_assignment_store: Arc<ScopeAssignmentStore>,
        role_assignment_store: Arc<RoleAssignmentStore>,
        orchestrator: CascadeOrchestrator,
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
            validator,
        ));
        let orchestrator = CascadeOrchestrator::new(
            resource_store.clone(),
            scope_store.clone(),
            role_store.clone(),
            scope_assignment_store.clone(),
            role_assignment_store.clone(),
        );
        Harness {
            resource_store,
            scope_store,
            role_store,
            scope_assignment_store,
            role_assignment_store,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn delete_resource_cascades_completely() {
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
            .create("api://svc", "prod", "arn:p", &h.resource_store, &h.scope_store, &cancel)
            .await
            .unwrap();
        h.role_assignment_store
            .create("api://svc", "reader", "arn:p", &h.resource_store, &h.role_store, &cancel)
            .await
            .unwrap();

        h.orchestrator.delete_resource("api://svc", &cancel).await.unwrap();

        assert!(h.resource_store.get("api://svc", &cancel).await.is_err());
        assert!(h
            .scope_assignment_store
            .principals_for_scope("api://svc", "prod", &cancel)
            .await
            .unwrap()
            .is_empty());
        assert!(h
            .role_assignment_store
            .principals_for_role("api://svc", "reader", &cancel)
            .await
            .unwrap()
            .is_empty());
        assert!(h
            .scope_assignment_store
            .scopes_for_principal("arn:p", "api://svc", &cancel)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn delete_resource_is_idempotent() {
        let h = harness();
        let cancel = CancellationToken::new();
        h.resource_store.create("api://svc", &cancel).await.unwrap();
        h.orchestrator.delete_resource("api://svc", &cancel).await.unwrap();
        h.orchestrator.delete_resource("api://svc", &cancel).await.unwrap();
    }

    #[tokio::test]
    async fn delete_principal_clears_both_relations() {
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
            .create("api://svc", "prod", "arn:p", &h.resource_store, &h.scope_store, &cancel)
            .await
            .unwrap();
        h.role_assignment_store
            .create("api://svc", "reader", "arn:p", &h.resource_store, &h.role_store, &cancel)
            .await
            .unwrap();

        h.orchestrator.delete_principal("arn:p", &cancel).await.unwrap();

        assert!(h
            .scope_assignment_store
            .scopes_for_principal("arn:p", "api://svc", &cancel)
            .await
            .unwrap()
            .is_empty());
        assert!(h
            .role_assignment_store
            .roles_for_principal("arn:p", "api://svc", &cancel)
            .await
            .unwrap()
            .is_empty());
    }
}
