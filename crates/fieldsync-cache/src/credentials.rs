//! Key-value backed credential storage
//!
//! Token lifecycle (login, refresh) is out of scope for this client; the
//! token is written by whatever provisions the device and read by the HTTP
//! adapter. It lives under its own key, outside the reference cache
//! families, so cache clearing never logs the interviewer out.

use std::sync::Arc;

use fieldsync_core::ports::{ICredentialStore, IKeyValueStore};

const TOKEN_KEY: &str = "auth:token";

/// Access-token store over the key-value port
pub struct KvCredentialStore {
    store: Arc<dyn IKeyValueStore>,
}

impl KvCredentialStore {
    /// Creates a credential store over the given backend
    pub fn new(store: Arc<dyn IKeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ICredentialStore for KvCredentialStore {
    async fn get_token(&self) -> anyhow::Result<Option<String>> {
        self.store.get(TOKEN_KEY).await
    }

    async fn set_token(&self, token: &str) -> anyhow::Result<()> {
        self.store.set(TOKEN_KEY, token).await
    }
}
