use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is not active")]
    AccountNotActive,

    #[error("Token malformed")]
    TokenMalformed,

    #[error("Token signature invalid")]
    BadSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Challenge expired or already used")]
    ChallengeExpiredOrConsumed,

    #[error("Unknown or already-used OAuth state")]
    InvalidOAuthState,

    #[error("Actor level {actor_level} cannot manage role level {target_level}")]
    LevelViolation { actor_level: i32, target_level: i32 },

    #[error("Role scope does not match the tenant: {0}")]
    TenantScopeViolation(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("MFA already enabled")]
    MfaAlreadyEnabled,

    #[error("MFA not enrolled")]
    MfaNotEnrolled,

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Identity not found")]
    IdentityNotFound,

    #[error("Tenant not found")]
    TenantNotFound,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Ticket store error: {0}")]
    TicketStore(#[from] redis::RedisError),

    #[error("Store error: {0}")]
    Store(anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// True for the failures a login response must not distinguish between,
    /// so callers can collapse them into one client-facing message.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::AccountNotActive
                | AuthError::ChallengeExpiredOrConsumed
                | AuthError::TokenExpired
                | AuthError::BadSignature
                | AuthError::TokenMalformed
        )
    }
}
