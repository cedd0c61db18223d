//! Credential store port (driven/secondary port)
//!
//! Token storage mechanics are out of scope for this core; the API adapter
//! only needs a simple get/set contract.

/// Port trait for access-token storage
#[async_trait::async_trait]
pub trait ICredentialStore: Send + Sync {
    /// Returns the stored access token, if the user is authenticated
    async fn get_token(&self) -> anyhow::Result<Option<String>>;

    /// Replaces the stored access token
    async fn set_token(&self, token: &str) -> anyhow::Result<()>;
}
