mod common;

use auth_engine::error::AuthError;
use auth_engine::models::{
    IdentityStatus, Role, RoleBinding, RoleScope, ServiceKey, Tenant, TenantKind,
};
use auth_engine::services::{Introspection, LoginOutcome};
use auth_engine::store::{IdentityStore, RbacStore, ServiceKeyStore};
use auth_engine::utils::password::Password;
use common::{build_engine, seed_active_identity, TestHarness};

async fn login(harness: &TestHarness, email: &str, password: &str) -> auth_engine::services::TokenPair {
    match harness
        .engine
        .auth
        .login(email, &Password::new(password.to_string()), "10.0.0.1", "agent")
        .await
        .unwrap()
    {
        LoginOutcome::Tokens(pair) => pair,
        LoginOutcome::MfaRequired { .. } => panic!("unexpected MFA challenge"),
    }
}

#[tokio::test]
async fn test_live_token_is_active_with_permissions() {
    let harness = build_engine();
    let identity = seed_active_identity(&harness.store, "alice@example.com", "pw-pw-pw").await;

    let tenant = Tenant::new("acme".to_string(), TenantKind::Customer);
    harness.store.insert_tenant(&tenant).await.unwrap();
    let role = Role::new("TENANT_USER".to_string(), None, RoleScope::Tenant, 20);
    harness.store.insert_role(&role).await.unwrap();
    harness
        .store
        .set_role_permissions(role.id, vec!["tenant.view".to_string()])
        .await
        .unwrap();
    harness
        .store
        .insert_binding(&RoleBinding {
            identity_id: identity.id,
            role_id: role.id,
            tenant_id: tenant.id,
        })
        .await
        .unwrap();

    let pair = login(&harness, "alice@example.com", "pw-pw-pw").await;
    let result = harness
        .engine
        .introspection
        .introspect(&pair.access_token, Some(tenant.id))
        .await;

    let Introspection::Active(payload) = result else {
        panic!("expected an active introspection");
    };
    assert_eq!(payload.identity_id, identity.id);
    assert_eq!(payload.email, "alice@example.com");
    assert_eq!(payload.auth_method.as_deref(), Some("password"));
    assert!(payload.permissions.contains("tenant.view"));
    assert_eq!(payload.tenant_ids, vec![tenant.id]);
}

#[tokio::test]
async fn test_garbage_and_wrong_kind_tokens_are_inactive() {
    let harness = build_engine();
    seed_active_identity(&harness.store, "alice@example.com", "pw-pw-pw").await;
    let pair = login(&harness, "alice@example.com", "pw-pw-pw").await;

    assert!(!harness
        .engine
        .introspection
        .introspect("garbage", None)
        .await
        .is_active());
    // A refresh token is not an access token.
    assert!(!harness
        .engine
        .introspection
        .introspect(&pair.refresh_token, None)
        .await
        .is_active());
}

#[tokio::test]
async fn test_session_revocation_is_visible_immediately() {
    let harness = build_engine();
    let identity = seed_active_identity(&harness.store, "alice@example.com", "pw-pw-pw").await;
    let pair = login(&harness, "alice@example.com", "pw-pw-pw").await;

    assert!(harness
        .engine
        .introspection
        .introspect(&pair.access_token, None)
        .await
        .is_active());

    harness.engine.sessions.revoke_all(identity.id).await.unwrap();

    assert!(!harness
        .engine
        .introspection
        .introspect(&pair.access_token, None)
        .await
        .is_active());
}

#[tokio::test]
async fn test_suspended_identity_is_inactive() {
    let harness = build_engine();
    let identity = seed_active_identity(&harness.store, "alice@example.com", "pw-pw-pw").await;
    let pair = login(&harness, "alice@example.com", "pw-pw-pw").await;

    harness
        .store
        .set_status(identity.id, IdentityStatus::Suspended)
        .await
        .unwrap();

    assert!(!harness
        .engine
        .introspection
        .introspect(&pair.access_token, None)
        .await
        .is_active());
}

#[tokio::test]
async fn test_service_key_clamps_to_its_tenant() {
    let harness = build_engine();
    let tenant_x = Tenant::new("x-corp".to_string(), TenantKind::Customer);
    let tenant_y = Tenant::new("y-corp".to_string(), TenantKind::Customer);
    harness.store.insert_tenant(&tenant_x).await.unwrap();
    harness.store.insert_tenant(&tenant_y).await.unwrap();

    let scoped = ServiceKey::new("billing".to_string(), "svc_raw_key", Some(tenant_x.id));
    ServiceKeyStore::insert(harness.store.as_ref(), &scoped)
        .await
        .unwrap();

    // Asking for tenant Y with a key bound to X silently yields X.
    let (key, effective) = harness
        .engine
        .introspection
        .verify_service_key("svc_raw_key", Some(tenant_y.id))
        .await
        .unwrap();
    assert_eq!(effective, Some(tenant_x.id));
    assert_eq!(key.id, scoped.id);

    // An unscoped key keeps whatever was requested.
    let unscoped = ServiceKey::new("reporting".to_string(), "svc_other_key", None);
    ServiceKeyStore::insert(harness.store.as_ref(), &unscoped)
        .await
        .unwrap();
    let (_, effective) = harness
        .engine
        .introspection
        .verify_service_key("svc_other_key", Some(tenant_y.id))
        .await
        .unwrap();
    assert_eq!(effective, Some(tenant_y.id));
}

#[tokio::test]
async fn test_unknown_or_inactive_service_key_is_rejected() {
    let harness = build_engine();

    let result = harness
        .engine
        .introspection
        .verify_service_key("svc_never_issued", None)
        .await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));

    let mut disabled = ServiceKey::new("old".to_string(), "svc_disabled", None);
    disabled.active = false;
    ServiceKeyStore::insert(harness.store.as_ref(), &disabled)
        .await
        .unwrap();
    let result = harness
        .engine
        .introspection
        .verify_service_key("svc_disabled", None)
        .await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
}
