//! Domain entities and business logic
//!
//! This module contains the core domain types for FieldSync:
//! - Newtypes for type-safe identifiers and composite cache keys
//! - The offline interview entity and its sync state machine
//! - Reference data payload types for the cached resource families
//! - Domain-specific error types and the fetch failure taxonomy

pub mod errors;
pub mod interview;
pub mod newtypes;
pub mod reference;

// Re-export commonly used types
pub use errors::{DomainError, FetchError, RemoteError};
pub use interview::{
    LocationSnapshot, OfflineInterview, SubmissionType, SyncQueueItem, SyncStatus,
};
pub use newtypes::{CompositeKey, InterviewId, SurveyId, KEY_SEPARATOR};
pub use reference::{
    AcRecord, AssignmentRoles, CacheEntry, GenderQuota, GpsPoint, GroupEntry, InterviewMode,
    PollingGroup, PollingStation, RotationCounter, Survey, UserProfile,
};
