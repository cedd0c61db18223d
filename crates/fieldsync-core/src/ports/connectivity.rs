//! Connectivity probe port (driven/secondary port)
//!
//! A lightweight reachability check used system-wide to decide between the
//! read-through and offline-only branches.

/// Port trait for the reachability probe
///
/// Implementations must be conservative: a timeout or any transport error
/// means offline, never an indeterminate state requiring a retry.
#[async_trait::async_trait]
pub trait IConnectivityProbe: Send + Sync {
    /// Returns true only when the server answered the probe within its
    /// timeout
    async fn is_online(&self) -> bool;
}
