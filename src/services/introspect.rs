//! Token introspection for calling services.
//!
//! `introspect` is a total function. Every failure (bad signature, expiry,
//! revocation, a dead session, a suspended account, even a store outage)
//! collapses into `Inactive`. Callers get a clean active/inactive answer and
//! never learn why a token failed.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::ServiceKey;
use crate::services::permission::PermissionEngine;
use crate::services::revocation::RevocationRegistry;
use crate::services::token::{TokenCodec, TokenKind};
use crate::store::{IdentityStore, ServiceKeyStore};

#[derive(Debug, Serialize)]
pub struct IntrospectionPayload {
    pub identity_id: Uuid,
    pub email: String,
    pub auth_method: Option<String>,
    pub permissions: BTreeSet<String>,
    pub tenant_ids: Vec<Uuid>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub enum Introspection {
    Active(Box<IntrospectionPayload>),
    Inactive,
}

impl Introspection {
    pub fn is_active(&self) -> bool {
        matches!(self, Introspection::Active(_))
    }
}

pub struct IntrospectionService {
    codec: Arc<TokenCodec>,
    revocations: Arc<RevocationRegistry>,
    identities: Arc<dyn IdentityStore>,
    permissions: Arc<PermissionEngine>,
    service_keys: Arc<dyn ServiceKeyStore>,
}

impl IntrospectionService {
    pub fn new(
        codec: Arc<TokenCodec>,
        revocations: Arc<RevocationRegistry>,
        identities: Arc<dyn IdentityStore>,
        permissions: Arc<PermissionEngine>,
        service_keys: Arc<dyn ServiceKeyStore>,
    ) -> Self {
        Self {
            codec,
            revocations,
            identities,
            permissions,
            service_keys,
        }
    }

    /// Introspect an access token within an optional tenant context.
    pub async fn introspect(&self, token: &str, tenant_id: Option<Uuid>) -> Introspection {
        match self.introspect_inner(token, tenant_id).await {
            Ok(result) => result,
            Err(e) => {
                // A broken backing store must read as an invalid token, not
                // as a server error the caller might retry around.
                tracing::warn!(error = %e, "Introspection failed closed");
                Introspection::Inactive
            }
        }
    }

    async fn introspect_inner(
        &self,
        token: &str,
        tenant_id: Option<Uuid>,
    ) -> Result<Introspection, AuthError> {
        // Stage 1: signature, expiry, token type.
        let claims = match self.codec.verify_kind(token, TokenKind::Access) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Introspection: token rejected");
                return Ok(Introspection::Inactive);
            }
        };
        let Ok(identity_id) = claims.identity_id() else {
            return Ok(Introspection::Inactive);
        };

        // Stage 2: logout blacklist.
        if self.revocations.is_blacklisted(&claims.jti).await? {
            tracing::debug!(jti = %claims.jti, "Introspection: token blacklisted");
            return Ok(Introspection::Inactive);
        }

        // Stage 3: the backing session must still exist.
        if let Some(session_id) = &claims.sid {
            if !self
                .revocations
                .has_live_session(identity_id, session_id)
                .await?
            {
                tracing::debug!(session_id = %session_id, "Introspection: session gone");
                return Ok(Introspection::Inactive);
            }
        }

        // Stage 4: the identity must exist and be active.
        let Some(identity) = self.identities.find_by_id(identity_id).await? else {
            return Ok(Introspection::Inactive);
        };
        if !identity.is_active() {
            tracing::debug!(identity_id = %identity_id, "Introspection: identity not active");
            return Ok(Introspection::Inactive);
        }

        // Stage 5: effective permissions and tenant memberships.
        let permissions = self
            .permissions
            .effective_permissions(identity_id, tenant_id)
            .await?;
        let tenant_ids = self.permissions.tenant_ids(identity_id).await?;

        // Stage 6: assemble.
        Ok(Introspection::Active(Box::new(IntrospectionPayload {
            identity_id,
            email: identity.email,
            auth_method: claims.method.clone(),
            permissions,
            tenant_ids,
            issued_at: Utc.timestamp_opt(claims.iat, 0).single(),
            expires_at: Utc.timestamp_opt(claims.exp, 0).single(),
        })))
    }

    /// Authenticate a calling service by its raw API key and resolve the
    /// tenant context it may introspect in. A key bound to a tenant has any
    /// requested tenant silently clamped to its own; an unscoped key may ask
    /// for any tenant.
    pub async fn verify_service_key(
        &self,
        raw_key: &str,
        requested_tenant: Option<Uuid>,
    ) -> Result<(ServiceKey, Option<Uuid>), AuthError> {
        let key = self
            .service_keys
            .find_by_hash(&ServiceKey::hash_key(raw_key))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !key.is_usable(Utc::now()) {
            return Err(AuthError::InvalidCredentials);
        }

        let effective_tenant = match key.tenant_id {
            Some(bound) => {
                if requested_tenant.is_some_and(|t| t != bound) {
                    tracing::debug!(
                        key_id = %key.id,
                        "Service key tenant clamped to its binding"
                    );
                }
                Some(bound)
            }
            None => requested_tenant,
        };

        self.service_keys.touch_last_used(key.id).await?;
        Ok((key, effective_tenant))
    }
}
