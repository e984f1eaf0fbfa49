//! Registry of the authentication methods this engine understands.
//!
//! The set is fixed at startup; there is no runtime plugin discovery. Each
//! method declares the shape of credential it consumes so callers can route
//! a login request without method-specific branching.

use std::collections::BTreeMap;

/// What a method expects at the credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialShape {
    /// Email plus a user-supplied password.
    Password,
    /// A bearer token minted earlier in the flow (magic link, MFA pending,
    /// OAuth callback artifacts).
    Bearer,
}

#[derive(Debug, Clone)]
pub struct AuthMethod {
    pub name: &'static str,
    pub shape: CredentialShape,
    /// Whether resolving this method can create a new identity.
    pub can_register: bool,
}

#[derive(Debug)]
pub struct MethodRegistry {
    methods: BTreeMap<&'static str, AuthMethod>,
}

impl MethodRegistry {
    pub fn with_defaults() -> Self {
        let defaults = [
            AuthMethod { name: "password", shape: CredentialShape::Password, can_register: true },
            AuthMethod { name: "magic_link", shape: CredentialShape::Bearer, can_register: false },
            AuthMethod { name: "totp", shape: CredentialShape::Bearer, can_register: false },
            AuthMethod { name: "google", shape: CredentialShape::Bearer, can_register: true },
            AuthMethod { name: "github", shape: CredentialShape::Bearer, can_register: true },
            AuthMethod { name: "microsoft", shape: CredentialShape::Bearer, can_register: true },
        ];
        Self {
            methods: defaults.into_iter().map(|m| (m.name, m)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AuthMethod> {
        self.methods.get(name)
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.keys().copied()
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
