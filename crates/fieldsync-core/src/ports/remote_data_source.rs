//! Remote data source port (driven/secondary port)
//!
//! This module defines the interface to the survey server's HTTP API. The
//! primary implementation lives in `fieldsync-remote`, but the trait is
//! adapter-agnostic so orchestration code can be tested against mocks.
//!
//! ## Design Notes
//!
//! - Every method returns `Result<T, RemoteError>` so callers can
//!   distinguish not-found from network failure; the distinction drives
//!   defaulting behavior (rotation counters) and cache-fallback decisions.
//! - Station records inline-include GPS when available; there is no
//!   separate coordinates endpoint.
//! - `AckReceipt` is a port-level DTO, not a domain entity.

use serde::{Deserialize, Serialize};

use crate::domain::errors::RemoteError;
use crate::domain::reference::{
    AcRecord, GenderQuota, PollingGroup, PollingStation, RotationCounter, UserProfile,
};

/// Server acknowledgment for a submitted interview or abandon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckReceipt {
    /// Server-assigned identifier for the accepted submission
    pub server_id: String,
    /// When the server accepted it (RFC 3339)
    pub accepted_at: String,
}

/// Port trait for the survey server API
///
/// Implementations handle endpoint construction, authentication headers,
/// timeouts, and mapping HTTP status classes onto [`RemoteError`].
#[async_trait::async_trait]
pub trait IRemoteDataSource: Send + Sync {
    /// Fetches the master-data record for an administrative constituency
    ///
    /// The returned record carries the server's canonical spelling, which
    /// callers must use as the cache key for all of that area's data.
    async fn fetch_ac_record(&self, area_name: &str) -> Result<AcRecord, RemoteError>;

    /// Fetches the polling-group list for an area
    async fn fetch_polling_groups(
        &self,
        state: &str,
        area: &str,
    ) -> Result<Vec<PollingGroup>, RemoteError>;

    /// Fetches the polling-station list for a group, GPS inline
    async fn fetch_polling_stations(
        &self,
        state: &str,
        area: &str,
        group: &str,
    ) -> Result<Vec<PollingStation>, RemoteError>;

    /// Fetches the gender-quota snapshot for a survey
    async fn fetch_gender_quota(&self, survey_id: &str) -> Result<GenderQuota, RemoteError>;

    /// Fetches the CATI rotation counter for a survey
    ///
    /// `RemoteError::NotFound` means "no prior interviews"; callers default
    /// to set 1 rather than treating it as a failure.
    async fn fetch_rotation_counter(&self, survey_id: &str)
        -> Result<RotationCounter, RemoteError>;

    /// Fetches the current authenticated user's profile
    async fn fetch_user_profile(&self) -> Result<UserProfile, RemoteError>;

    /// Submits a completed interview payload
    async fn submit_interview(&self, payload: &serde_json::Value)
        -> Result<AckReceipt, RemoteError>;

    /// Submits an abandon notification
    async fn submit_abandon(&self, payload: &serde_json::Value) -> Result<AckReceipt, RemoteError>;
}
