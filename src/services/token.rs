//! Token codec - signing and verification of all bearer tokens.
//!
//! Stateless: a pure function of the process-wide symmetric key and the
//! claim set. Every other component goes through this codec; none of them
//! touch the signing key directly.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    MagicLink,
    MfaPending,
}

/// Wire claim set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id.
    pub sub: String,
    /// Unique per issuance; blacklist key on revocation.
    pub jti: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Backing session id; access and refresh tokens only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Auth method that produced the token; surfaced by introspection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn identity_id(&self) -> Result<Uuid, AuthError> {
        self.sub.parse().map_err(|_| AuthError::TokenMalformed)
    }

    pub fn remaining_seconds(&self) -> i64 {
        self.exp - Utc::now().timestamp()
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_expiry_minutes: i64,
    refresh_expiry_days: i64,
}

impl TokenCodec {
    pub fn new(config: &EngineConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.token_issuer]);
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(config.token_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.token_secret.as_bytes()),
            validation,
            issuer: config.token_issuer.clone(),
            access_expiry_minutes: config.access_token_expiry_minutes,
            refresh_expiry_days: config.refresh_token_expiry_days,
        }
    }

    fn issue(
        &self,
        kind: TokenKind,
        subject: Uuid,
        sid: Option<&str>,
        method: Option<&str>,
        lifetime: Duration,
    ) -> Result<(String, Claims), AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            kind,
            sid: sid.map(str::to_string),
            method: method.map(str::to_string),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("token encoding failed: {}", e)))?;

        Ok((token, claims))
    }

    pub fn issue_access(
        &self,
        identity_id: Uuid,
        session_id: &str,
        method: &str,
    ) -> Result<(String, Claims), AuthError> {
        self.issue(
            TokenKind::Access,
            identity_id,
            Some(session_id),
            Some(method),
            Duration::minutes(self.access_expiry_minutes),
        )
    }

    pub fn issue_refresh(
        &self,
        identity_id: Uuid,
        session_id: &str,
        method: &str,
    ) -> Result<(String, Claims), AuthError> {
        // The method rides along so a refreshed access token still reports
        // how the session was originally established.
        self.issue(
            TokenKind::Refresh,
            identity_id,
            Some(session_id),
            Some(method),
            Duration::days(self.refresh_expiry_days),
        )
    }

    pub fn issue_magic_link(
        &self,
        identity_id: Uuid,
        ttl_seconds: u64,
    ) -> Result<(String, Claims), AuthError> {
        self.issue(
            TokenKind::MagicLink,
            identity_id,
            None,
            Some("magic_link"),
            Duration::seconds(ttl_seconds as i64),
        )
    }

    pub fn issue_mfa_pending(
        &self,
        identity_id: Uuid,
        ttl_seconds: u64,
    ) -> Result<(String, Claims), AuthError> {
        self.issue(
            TokenKind::MfaPending,
            identity_id,
            None,
            None,
            Duration::seconds(ttl_seconds as i64),
        )
    }

    /// Verify signature and expiry, returning the claim set.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::BadSignature,
                _ => AuthError::TokenMalformed,
            })
    }

    /// Verify and additionally require a specific token type.
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            return Err(AuthError::TokenMalformed);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        let config = EngineConfig {
            token_secret: "unit-test-secret-key-0123456789abcdef".to_string(),
            token_issuer: "auth-engine".to_string(),
            access_token_expiry_minutes: 30,
            refresh_token_expiry_days: 7,
            magic_link_ttl_seconds: 900,
            mfa_pending_ttl_seconds: 300,
            oauth_state_ttl_seconds: 600,
            max_concurrent_sessions: 5,
            redis_url: String::new(),
            superadmin_email: String::new(),
            superadmin_password: String::new(),
        };
        TokenCodec::new(&config)
    }

    #[test]
    fn access_token_round_trip() {
        let codec = codec();
        let identity_id = Uuid::new_v4();

        let (token, issued) = codec.issue_access(identity_id, "sid-1", "password").unwrap();
        let claims = codec.verify_kind(&token, TokenKind::Access).unwrap();

        assert_eq!(claims.identity_id().unwrap(), identity_id);
        assert_eq!(claims.sid.as_deref(), Some("sid-1"));
        assert_eq!(claims.method.as_deref(), Some("password"));
        assert_eq!(claims.jti, issued.jti);
        assert!(claims.remaining_seconds() > 0);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let codec = codec();
        let (token, _) = codec.issue_magic_link(Uuid::new_v4(), 900).unwrap();

        assert!(matches!(
            codec.verify_kind(&token, TokenKind::Access),
            Err(AuthError::TokenMalformed)
        ));
        // Still valid when asked for the right kind.
        assert!(codec.verify_kind(&token, TokenKind::MagicLink).is_ok());
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let codec = codec();
        let (token, _) = codec.issue_refresh(Uuid::new_v4(), "sid-2", "password").unwrap();
        let mut forged = token[..token.len() - 2].to_string();
        forged.push_str("xx");

        assert!(matches!(
            codec.verify(&forged),
            Err(AuthError::BadSignature) | Err(AuthError::TokenMalformed)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec();
        assert!(matches!(
            codec.verify("not-a-token"),
            Err(AuthError::TokenMalformed)
        ));
    }

    #[test]
    fn each_issuance_gets_unique_jti() {
        let codec = codec();
        let identity_id = Uuid::new_v4();
        let (_, a) = codec.issue_access(identity_id, "sid", "password").unwrap();
        let (_, b) = codec.issue_access(identity_id, "sid", "password").unwrap();
        assert_ne!(a.jti, b.jti);
    }
}
