use std::env;

use crate::error::AuthError;

/// Engine-wide configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Symmetric signing key for all issued tokens. Also the root of the
    /// key used to encrypt MFA secrets at rest.
    pub token_secret: String,
    pub token_issuer: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
    pub magic_link_ttl_seconds: u64,
    pub mfa_pending_ttl_seconds: u64,
    pub oauth_state_ttl_seconds: u64,
    pub max_concurrent_sessions: usize,
    pub redis_url: String,
    pub superadmin_email: String,
    pub superadmin_password: String,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        let config = EngineConfig {
            token_secret: get_env("TOKEN_SECRET", None)?,
            token_issuer: get_env("TOKEN_ISSUER", Some("auth-engine"))?,
            access_token_expiry_minutes: parse_env("ACCESS_TOKEN_EXPIRY_MINUTES", "30")?,
            refresh_token_expiry_days: parse_env("REFRESH_TOKEN_EXPIRY_DAYS", "7")?,
            magic_link_ttl_seconds: parse_env("MAGIC_LINK_TTL_SECONDS", "900")?,
            mfa_pending_ttl_seconds: parse_env("MFA_PENDING_TTL_SECONDS", "300")?,
            oauth_state_ttl_seconds: parse_env("OAUTH_STATE_TTL_SECONDS", "600")?,
            max_concurrent_sessions: parse_env("MAX_CONCURRENT_SESSIONS", "5")?,
            redis_url: get_env("REDIS_URL", Some("redis://127.0.0.1:6379"))?,
            superadmin_email: get_env("SUPERADMIN_EMAIL", Some("admin@example.com"))?,
            superadmin_password: get_env("SUPERADMIN_PASSWORD", Some("change-me-on-first-login"))?,
        };

        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<(), AuthError> {
        if self.token_secret.len() < 32 {
            return Err(AuthError::Config(
                "TOKEN_SECRET must be at least 32 bytes".to_string(),
            ));
        }
        if self.access_token_expiry_minutes <= 0 {
            return Err(AuthError::Config(
                "ACCESS_TOKEN_EXPIRY_MINUTES must be positive".to_string(),
            ));
        }
        if self.refresh_token_expiry_days <= 0 {
            return Err(AuthError::Config(
                "REFRESH_TOKEN_EXPIRY_DAYS must be positive".to_string(),
            ));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(AuthError::Config(
                "MAX_CONCURRENT_SESSIONS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn refresh_token_expiry_seconds(&self) -> i64 {
        self.refresh_token_expiry_days * 24 * 60 * 60
    }
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, AuthError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => default
            .map(str::to_string)
            .ok_or_else(|| AuthError::Config(format!("{} is required but not set", key))),
    }
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, AuthError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default))?
        .parse()
        .map_err(|e: T::Err| AuthError::Config(format!("{}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> EngineConfig {
        EngineConfig {
            token_secret: "0123456789abcdef0123456789abcdef".to_string(),
            token_issuer: "auth-engine".to_string(),
            access_token_expiry_minutes: 30,
            refresh_token_expiry_days: 7,
            magic_link_ttl_seconds: 900,
            mfa_pending_ttl_seconds: 300,
            oauth_state_ttl_seconds: 600,
            max_concurrent_sessions: 5,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            superadmin_email: "admin@example.com".to_string(),
            superadmin_password: "change-me".to_string(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn short_secret_is_rejected() {
        let mut config = base_config();
        config.token_secret = "too-short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_session_cap_is_rejected() {
        let mut config = base_config();
        config.max_concurrent_sessions = 0;
        assert!(config.validate().is_err());
    }
}
