//! Key-value store port (driven/secondary port)
//!
//! The persistence contract every storage adapter implements. Values are
//! always serialized structured data (JSON); the store itself is agnostic.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, filesystem, etc.) and don't need domain-level classification.
//!   Callers in the cache layer convert failures to "entry absent".
//! - Keys are flat strings; namespacing (one blob per resource family) is
//!   the cache layer's concern, not the store's.

/// Port trait for persistent key-value storage
#[async_trait::async_trait]
pub trait IKeyValueStore: Send + Sync {
    /// Retrieves the value stored under `key`, if any
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Stores `value` under `key`, replacing any existing value
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Removes the value stored under `key`; removing an absent key is not
    /// an error
    async fn remove(&self, key: &str) -> anyhow::Result<()>;

    /// Removes every key in `keys` in one operation
    async fn remove_many(&self, keys: &[&str]) -> anyhow::Result<()>;
}
