//! Credential store adapters.

use arielle_core::CredentialStorePort;

/// Environment variable holding the Hugging Face access token.
pub const HF_TOKEN_VAR: &str = "HF_TOKEN";

/// Reads the token from an environment variable on every call.
///
/// Re-reading lets a token configured while a task is running be picked up by
/// that task's retry.
#[derive(Debug, Clone)]
pub struct EnvCredentialStore {
    var: String,
}

impl Default for EnvCredentialStore {
    fn default() -> Self {
        Self::new(HF_TOKEN_VAR)
    }
}

impl EnvCredentialStore {
    /// Read from `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// Name of the variable being read.
    pub fn var(&self) -> &str {
        &self.var
    }
}

impl CredentialStorePort for EnvCredentialStore {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }
}

/// A fixed token (or none).
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    token: Option<String>,
}

impl StaticCredentialStore {
    /// Store holding `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Store holding nothing.
    pub const fn empty() -> Self {
        Self { token: None }
    }
}

impl CredentialStorePort for StaticCredentialStore {
    fn token(&self) -> Option<String> {
        self.token.clone().filter(|value| !value.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_store() {
        assert_eq!(StaticCredentialStore::new("hf_x").token().as_deref(), Some("hf_x"));
        assert_eq!(StaticCredentialStore::new("   ").token(), None);
        assert_eq!(StaticCredentialStore::empty().token(), None);
    }

    #[test]
    fn test_env_store_missing_var() {
        let store = EnvCredentialStore::new("ARIELLE_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert_eq!(store.token(), None);
        assert_eq!(EnvCredentialStore::default().var(), HF_TOKEN_VAR);
    }
}
