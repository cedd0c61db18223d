//! FieldSync Cache - Local offline persistence
//!
//! SQLite-backed storage for:
//! - Namespaced reference data (AC metadata, polling groups/stations, GPS,
//!   gender quotas, CATI rotation counters, user profile)
//! - The offline interview list and its companion sync queue
//! - Last-sync / last-download scalar markers
//!
//! ## Architecture
//!
//! This crate implements the `IKeyValueStore` port from `fieldsync-core`
//! using SQLite as the storage backend, and layers the reference cache and
//! interview store on top of that port. It is a driven (secondary) adapter
//! in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`SqliteKeyValueStore`] - `IKeyValueStore` over one `kv_entries` table;
//!   owns the connection pool and schema setup
//! - [`ReferenceDataCache`] - One serialized blob per resource family
//! - [`OfflineInterviewStore`] - Durable interview records + sync queue
//! - [`KvCredentialStore`] - Access-token storage over the same table
//!
//! ## Durability split
//!
//! Reference data is a pure cache: always safe to discard and rebuild from
//! the server. The interview store is the sole durable record of field work
//! until server acknowledgment and is never touched by cache clearing.

pub mod credentials;
pub mod interview_store;
pub mod kv;
pub mod reference;

pub use credentials::KvCredentialStore;
pub use interview_store::OfflineInterviewStore;
pub use kv::SqliteKeyValueStore;
pub use reference::ReferenceDataCache;

/// Errors that can occur during store setup
///
/// Steady-state query failures stay on the `anyhow` path of the key-value
/// port; this covers the open/schema phase only.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to open or create the database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Applying the schema failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}
