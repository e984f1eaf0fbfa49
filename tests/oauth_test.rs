mod common;

use auth_engine::error::AuthError;
use auth_engine::models::{IdentityStatus, ProviderProfile, ProviderTokens};
use auth_engine::store::{IdentityStore, OAuthLinkStore};
use common::{build_engine, seed_active_identity};
use uuid::Uuid;

fn google_profile(email: &str, provider_user_id: &str) -> ProviderProfile {
    ProviderProfile {
        provider: "google".to_string(),
        provider_user_id: provider_user_id.to_string(),
        email: email.to_string(),
        first_name: Some("Alice".to_string()),
        last_name: None,
        avatar_url: Some("https://lh3.example.com/a".to_string()),
        tokens: ProviderTokens {
            access_token: Some("ya29.first".to_string()),
            refresh_token: None,
            expires_at: None,
        },
    }
}

#[tokio::test]
async fn test_state_is_single_use() {
    let harness = build_engine();
    let tenant_id = Uuid::new_v4();

    let state = harness
        .engine
        .oauth_state
        .begin(Some(tenant_id))
        .await
        .unwrap();

    let consumed = harness.engine.oauth_state.consume(&state).await.unwrap();
    assert_eq!(consumed, Some(tenant_id));

    let replay = harness.engine.oauth_state.consume(&state).await;
    assert!(matches!(replay, Err(AuthError::InvalidOAuthState)));
}

#[tokio::test]
async fn test_state_without_tenant_yields_none() {
    let harness = build_engine();
    let state = harness.engine.oauth_state.begin(None).await.unwrap();
    assert_eq!(harness.engine.oauth_state.consume(&state).await.unwrap(), None);
}

#[tokio::test]
async fn test_forged_state_is_rejected() {
    let harness = build_engine();
    let result = harness.engine.oauth_state.consume("made-up-state").await;
    assert!(matches!(result, Err(AuthError::InvalidOAuthState)));
}

#[tokio::test]
async fn test_new_profile_creates_active_identity() {
    let harness = build_engine();

    let (identity, is_new) = harness
        .engine
        .oauth
        .resolve(&google_profile("alice@example.com", "g-123"))
        .await
        .unwrap();

    assert!(is_new);
    assert_eq!(identity.status, IdentityStatus::Active);
    assert!(identity.password_hash.is_none());
    assert_eq!(identity.auth_methods, vec!["google".to_string()]);
    assert_eq!(
        harness.store.count_for_identity(identity.id).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_known_link_logs_in_and_refreshes_tokens() {
    let harness = build_engine();
    let (created, _) = harness
        .engine
        .oauth
        .resolve(&google_profile("alice@example.com", "g-123"))
        .await
        .unwrap();

    let mut second = google_profile("alice@example.com", "g-123");
    second.tokens.access_token = Some("ya29.rotated".to_string());
    let (identity, is_new) = harness.engine.oauth.resolve(&second).await.unwrap();

    assert!(!is_new);
    assert_eq!(identity.id, created.id);

    let link = harness
        .store
        .find_by_provider("google", "g-123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.tokens.access_token.as_deref(), Some("ya29.rotated"));
}

#[tokio::test]
async fn test_email_match_links_provider_to_existing_identity() {
    let harness = build_engine();
    let existing = seed_active_identity(&harness.store, "alice@example.com", "pw").await;

    let (identity, is_new) = harness
        .engine
        .oauth
        .resolve(&google_profile("alice@example.com", "g-123"))
        .await
        .unwrap();

    assert!(!is_new);
    assert_eq!(identity.id, existing.id);

    let reloaded = harness
        .store
        .find_by_id(existing.id)
        .await
        .unwrap()
        .unwrap();
    assert!(reloaded.auth_methods.iter().any(|m| m == "google"));
    // The original method list survives the merge.
    assert!(reloaded.auth_methods.iter().any(|m| m == "password"));
}

#[tokio::test]
async fn test_merge_is_idempotent() {
    let harness = build_engine();
    let existing = seed_active_identity(&harness.store, "alice@example.com", "pw").await;

    for _ in 0..3 {
        harness
            .engine
            .oauth
            .resolve(&google_profile("alice@example.com", "g-123"))
            .await
            .unwrap();
    }

    assert_eq!(
        harness.store.count_for_identity(existing.id).await.unwrap(),
        1
    );
    let reloaded = harness
        .store
        .find_by_id(existing.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        reloaded.auth_methods.iter().filter(|m| *m == "google").count(),
        1
    );
}

#[tokio::test]
async fn test_oauth_login_establishes_session() {
    let harness = build_engine();

    let (pair, identity, is_new) = harness
        .engine
        .oauth
        .login(&google_profile("alice@example.com", "g-123"), "10.0.0.1", "agent")
        .await
        .unwrap();

    assert!(is_new);
    assert_eq!(
        harness
            .engine
            .sessions
            .list_active(identity.id)
            .await
            .unwrap()
            .len(),
        1
    );
    let result = harness
        .engine
        .introspection
        .introspect(&pair.access_token, None)
        .await;
    assert!(result.is_active());
}
