//! Credential store port.

/// Source of the stored access token.
///
/// Reads never fail; an unavailable store behaves like an empty one.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStorePort: Send + Sync {
    /// The stored token, if any.
    fn token(&self) -> Option<String>;
}
