mod common;

use auth_engine::models::{RoleScope, SUPER_ADMIN_LEVEL};
use auth_engine::store::{IdentityStore, RbacStore};
use common::build_engine;

#[tokio::test]
async fn test_bootstrap_seeds_roles_tenant_and_super_admin() {
    let harness = build_engine();
    harness.engine.bootstrap().await.unwrap();

    let platform = harness
        .store
        .find_platform_tenant()
        .await
        .unwrap()
        .expect("platform tenant seeded");

    let super_admin = harness
        .store
        .find_role_by_name("SUPER_ADMIN")
        .await
        .unwrap()
        .expect("SUPER_ADMIN seeded");
    assert_eq!(super_admin.level, SUPER_ADMIN_LEVEL);
    assert_eq!(super_admin.scope, RoleScope::Platform);

    for (name, level) in [
        ("PLATFORM_ADMIN", 90),
        ("TENANT_OWNER", 80),
        ("TENANT_ADMIN", 60),
        ("TENANT_MANAGER", 40),
        ("TENANT_USER", 20),
    ] {
        let role = harness
            .store
            .find_role_by_name(name)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("{} seeded", name));
        assert_eq!(role.level, level);
    }

    let root = harness
        .store
        .find_by_email("root@example.com")
        .await
        .unwrap()
        .expect("super admin identity seeded");
    assert!(root.is_active());

    let bindings = harness.store.bindings_for(root.id).await.unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].role_id, super_admin.id);
    assert_eq!(bindings[0].tenant_id, platform.id);

    // The seeded super admin holds every permission everywhere.
    let permissions = harness
        .engine
        .permissions
        .effective_permissions(root.id, None)
        .await
        .unwrap();
    assert!(permissions.contains("platform.tenants.manage"));
    assert!(permissions.contains("tenant.roles.assign"));
}

#[tokio::test]
async fn test_bootstrap_is_idempotent() {
    let harness = build_engine();
    harness.engine.bootstrap().await.unwrap();

    let role_before = harness
        .store
        .find_role_by_name("TENANT_OWNER")
        .await
        .unwrap()
        .unwrap();
    let root_before = harness
        .store
        .find_by_email("root@example.com")
        .await
        .unwrap()
        .unwrap();

    harness.engine.bootstrap().await.unwrap();

    let role_after = harness
        .store
        .find_role_by_name("TENANT_OWNER")
        .await
        .unwrap()
        .unwrap();
    let root_after = harness
        .store
        .find_by_email("root@example.com")
        .await
        .unwrap()
        .unwrap();

    // Same rows, no duplicates.
    assert_eq!(role_before.id, role_after.id);
    assert_eq!(root_before.id, root_after.id);
    assert_eq!(
        harness.store.bindings_for(root_after.id).await.unwrap().len(),
        1
    );
}
