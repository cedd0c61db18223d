//! Port definitions (trait interfaces)
//!
//! Ports define the seams between the domain core and the adapter crates.
//! Driven (secondary) ports: storage, remote API, connectivity, credentials.

pub mod connectivity;
pub mod credential_store;
pub mod key_value_store;
pub mod remote_data_source;

pub use connectivity::IConnectivityProbe;
pub use credential_store::ICredentialStore;
pub use key_value_store::IKeyValueStore;
pub use remote_data_source::{AckReceipt, IRemoteDataSource};
