//! Walks the `Repository` facade through a resource/scope/role lifecycle
//! against the in-memory store.

use std::sync::Arc;

use rbac_core::kv::CancellationToken;
use rbac_core::mem::InMemoryKvStore;
use rbac_core::repository::Repository;
use rbac_core::validation::DefaultNameValidator;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    match run_demo().await {
        Ok(_) => println!("RBAC demo completed successfully"),
        Err(e) => println!("RBAC demo failed: {e}"),
    }
}

async fn run_demo() -> Result<(), rbac_core::error::RbacError> {
    let repo = Repository::with_validator(
        Arc::new(InMemoryKvStore::new()),
        Arc::new(DefaultNameValidator),
    );
    let cancel = CancellationToken::new();

    println!("1. Creating resource 'api://billing'...");
    repo.create_resource("api://billing", &cancel).await?;

    println!("2. Creating scopes 'prod' and 'staging'...");
    repo.create_scope("api://billing", "prod", &cancel).await?;
    repo.create_scope("api://billing", "staging", &cancel).await?;

    println!("3. Creating role 'invoice-reader'...");
    repo.create_role("api://billing", "invoice-reader", &cancel).await?;

    let principal = "arn:aws:iam::111122223333:user/alice";

    println!("4. Assigning role without a scope assignment (expect gated access)...");
    repo.create_role_assignment("api://billing", "invoice-reader", principal, &cancel)
        .await?;
    let access = repo
        .get_principal_access(principal, "api://billing", &cancel)
        .await?;
    println!(
        "   scopes={:?} roles={:?} (expected both empty)",
        access.scope_names, access.role_names
    );

    println!("5. Assigning scope 'prod'; access should now include the role...");
    repo.create_scope_assignment("api://billing", "prod", principal, &cancel)
        .await?;
    let access = repo
        .get_principal_access(principal, "api://billing", &cancel)
        .await?;
    println!(
        "   scopes={:?} roles={:?} (expected both populated)",
        access.scope_names, access.role_names
    );

    println!("6. Deleting resource; cascades scopes, roles, and assignments...");
    repo.delete_resource("api://billing", &cancel).await?;
    match repo.get_resource("api://billing", &cancel).await {
        Ok(_) => println!("   unexpected: resource still present"),
        Err(e) => println!("   resource gone as expected: {e}"),
    }

    Ok(())
}
