//! Property-based tests for the `Repository` facade.

use std::sync::Arc;

use proptest::prelude::*;
use rbac_core::kv::CancellationToken;
use rbac_core::mem::InMemoryKvStore;
use rbac_core::repository::Repository;
use rbac_core::validation::DefaultNameValidator;

fn repo() -> Repository {
    Repository::with_validator(Arc::new(InMemoryKvStore::new()), Arc::new(DefaultNameValidator))
}

/// Names drawn from the validator's accepted charset, pre-normalized
/// (lowercase already) so the round-trip assertions don't need to
/// re-derive normalization.
fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9._:/-]{0,20}").unwrap()
}

fn distinct_names_strategy(count: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(name_strategy(), count).prop_map(|mut names| {
        names.sort();
        names.dedup();
        names
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// `CreateResource` then `GetResource` returns an empty-lists record
    /// under the normalized name.
    #[test]
    fn round_trip_create_then_get_resource(resource in name_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let repo = repo();
            let cancel = CancellationToken::new();
            repo.create_resource(&resource, &cancel).await.unwrap();
            let got = repo.get_resource(&resource, &cancel).await.unwrap();
            prop_assert_eq!(got.resource_name, resource.to_ascii_lowercase());
            prop_assert!(got.scope_names.is_empty());
            prop_assert!(got.role_names.is_empty());
            Ok(())
        }).unwrap();
    }

    /// However many scopes are created, in whatever order, `GetResource`
    /// returns them sorted and deduplicated.
    #[test]
    fn scope_names_are_sorted_and_unique(scopes in distinct_names_strategy(6)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let repo = repo();
            let cancel = CancellationToken::new();
            repo.create_resource("api://svc", &cancel).await.unwrap();
            for scope in &scopes {
                repo.create_scope("api://svc", scope, &cancel).await.unwrap();
            }
            let got = repo.get_resource("api://svc", &cancel).await.unwrap();
            let mut expected = scopes.clone();
            expected.sort();
            prop_assert_eq!(got.scope_names, expected);
            Ok(())
        }).unwrap();
    }

    /// Without a scope assignment, role assignments never surface in
    /// `GetPrincipalAccess`.
    #[test]
    fn gating_rule_holds_without_scope_assignment(role in name_strategy(), principal in name_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let repo = repo();
            let cancel = CancellationToken::new();
            repo.create_resource("api://svc", &cancel).await.unwrap();
            repo.create_role("api://svc", &role, &cancel).await.unwrap();
            repo.create_role_assignment("api://svc", &role, &principal, &cancel)
                .await
                .unwrap();

            let access = repo
                .get_principal_access(&principal, "api://svc", &cancel)
                .await
                .unwrap();
            prop_assert!(access.role_names.is_empty());
            prop_assert!(access.scope_names.is_empty());
            Ok(())
        }).unwrap();
    }

    /// Filtering by the literal default-scope name returns the same
    /// result as the unfiltered call.
    #[test]
    fn default_scope_filter_matches_unfiltered(principal in name_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let repo = repo();
            let cancel = CancellationToken::new();
            repo.create_resource("api://svc", &cancel).await.unwrap();
            repo.create_scope("api://svc", "default", &cancel).await.unwrap();
            repo.create_role("api://svc", "reader", &cancel).await.unwrap();
            repo.create_scope_assignment("api://svc", "default", &principal, &cancel)
                .await
                .unwrap();
            repo.create_role_assignment("api://svc", "reader", &principal, &cancel)
                .await
                .unwrap();

            let unfiltered = repo
                .get_principal_access(&principal, "api://svc", &cancel)
                .await
                .unwrap();
            let filtered = repo
                .get_principal_access_scoped(&principal, "api://svc", "default", &cancel)
                .await
                .unwrap();
            prop_assert_eq!(unfiltered, filtered);
            Ok(())
        }).unwrap();
    }

    /// Creating the same resource twice yields `AlreadyExists` and
    /// leaves exactly one row.
    #[test]
    fn duplicate_resource_create_is_rejected(resource in name_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let repo = repo();
            let cancel = CancellationToken::new();
            repo.create_resource(&resource, &cancel).await.unwrap();
            let second = repo.create_resource(&resource, &cancel).await;
            prop_assert!(second.is_err());
            let got = repo.get_resource(&resource, &cancel).await.unwrap();
            prop_assert!(got.scope_names.is_empty());
            prop_assert!(got.role_names.is_empty());
            Ok(())
        }).unwrap();
    }

    /// Two spellings of the same name (differing only in case/whitespace)
    /// address the same resource.
    #[test]
    fn differently_cased_names_address_the_same_resource(resource in name_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let repo = repo();
            let cancel = CancellationToken::new();
            let shouting = format!("  {} ", resource.to_ascii_uppercase());
            repo.create_resource(&shouting, &cancel).await.unwrap();
            let got = repo.get_resource(&resource, &cancel).await.unwrap();
            prop_assert_eq!(got.resource_name, resource.to_ascii_lowercase());
            Ok(())
        }).unwrap();
    }
}

/// Deleting a resource twice is as safe as deleting it once — not a
/// proptest since it needs no generated input beyond a fixed setup.
#[tokio::test]
async fn delete_resource_twice_is_idempotent() {
    let repo = repo();
    let cancel = CancellationToken::new();
    repo.create_resource("api://svc", &cancel).await.unwrap();
    repo.create_scope("api://svc", "prod", &cancel).await.unwrap();
    repo.create_role("api://svc", "reader", &cancel).await.unwrap();
    repo.create_scope_assignment("api://svc", "prod", "principal-a", &cancel)
        .await
        .unwrap();
    repo.create_role_assignment("api://svc", "reader", "principal-a", &cancel)
        .await
        .unwrap();

    repo.delete_resource("api://svc", &cancel).await.unwrap();
    repo.delete_resource("api://svc", &cancel).await.unwrap();

    assert!(repo.get_resource("api://svc", &cancel).await.is_err());
    let access = repo
        .get_principal_access("principal-a", "api://svc", &cancel)
        .await
        .unwrap();
    assert!(access.scope_names.is_empty());
    assert!(access.role_names.is_empty());
}
