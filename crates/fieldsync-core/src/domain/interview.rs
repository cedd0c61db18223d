//! OfflineInterview domain entity
//!
//! This module defines the OfflineInterview entity which represents one
//! interview attempt held on the device until the server acknowledges it.
//!
//! ## State Machine
//!
//! ```text
//!     ┌─────────┐   push starts   ┌─────────┐    server ack    ┌────────┐
//!     │ Pending │ ──────────────► │ Syncing │ ───────────────► │ Synced │──► delete
//!     └─────────┘                 └─────────┘                  └────────┘
//!          ▲                           │
//!          │ manual retry              │ any failure
//!          │                           ▼
//!          │                      ┌────────┐
//!          └───────────────────── │ Failed │ ──► Syncing (automatic retry)
//!                                 └────────┘
//! ```
//!
//! An interview is created `Pending` the instant a respondent interaction
//! completes locally, before any network call. Failed records remain until a
//! successful retry or explicit operator deletion; there is no automatic
//! expiry.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{InterviewId, SurveyId};
use super::reference::InterviewMode;

// ============================================================================
// SyncStatus
// ============================================================================

/// Synchronization state of an offline interview record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Persisted locally, not yet pushed
    #[default]
    Pending,
    /// A push attempt is in flight
    Syncing,
    /// Acknowledged by the server; the record is deleted right after
    Synced,
    /// The last push attempt failed; eligible for retry
    Failed,
}

impl SyncStatus {
    /// Returns true if this record belongs on the retry worklist
    pub fn is_pending_work(&self) -> bool {
        matches!(self, SyncStatus::Pending | SyncStatus::Failed)
    }

    /// Returns the status name as a string
    pub fn name(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "Pending",
            SyncStatus::Syncing => "Syncing",
            SyncStatus::Synced => "Synced",
            SyncStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Pending => write!(f, "pending"),
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Synced => write!(f, "synced"),
            SyncStatus::Failed => write!(f, "failed"),
        }
    }
}

// ============================================================================
// LocationSnapshot
// ============================================================================

/// Device location captured at interview time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Free-text location description, when available
    pub description: Option<String>,
}

// ============================================================================
// OfflineInterview
// ============================================================================

/// One interview attempt held locally until acknowledged by the server
///
/// The offline store is the sole durable record of field work until server
/// acknowledgment; the full survey definition is denormalized into the
/// record since the survey may change remotely while the device is offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineInterview {
    /// Locally generated unique identifier, never reused
    id: InterviewId,
    /// Survey this interview belongs to
    survey_id: SurveyId,
    /// Full survey definition at interview time
    survey_snapshot: serde_json::Value,
    /// Server-side session identifier, when one was issued
    session_id: Option<String>,
    /// CATI call identifier, telephone interviews only
    call_id: Option<String>,
    /// CATI queue identifier, telephone interviews only
    queue_id: Option<String>,
    /// Interviewing mode for this attempt
    mode: InterviewMode,
    /// Question id to answer value
    responses: HashMap<String, serde_json::Value>,
    /// Device location at interview time
    location: Option<LocationSnapshot>,
    /// Selected administrative area, when applicable
    selected_area: Option<String>,
    /// Selected polling station, when applicable
    selected_station: Option<String>,
    /// CATI rotation set used, when applicable
    rotation_set: Option<u32>,
    /// When the respondent interaction started
    started_at: DateTime<Utc>,
    /// When the respondent interaction ended
    ended_at: DateTime<Utc>,
    /// Interview duration in seconds
    duration_secs: u64,
    /// Local path to a recorded audio file, when one exists
    audio_file: Option<String>,
    /// Free-form metadata bag
    metadata: HashMap<String, serde_json::Value>,
    /// Current synchronization status
    status: SyncStatus,
    /// Number of push attempts made so far
    sync_attempts: u32,
    /// When the last push attempt was made
    last_attempt_at: Option<DateTime<Utc>>,
    /// Error message from the last failed attempt
    last_error: Option<String>,
}

impl OfflineInterview {
    /// Creates a new interview record in `Pending` state
    ///
    /// Called the instant a respondent interaction completes, before any
    /// network activity.
    pub fn new(
        survey_id: SurveyId,
        survey_snapshot: serde_json::Value,
        mode: InterviewMode,
        responses: HashMap<String, serde_json::Value>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        let duration_secs = (ended_at - started_at).num_seconds().max(0) as u64;
        Self {
            id: InterviewId::generate(),
            survey_id,
            survey_snapshot,
            session_id: None,
            call_id: None,
            queue_id: None,
            mode,
            responses,
            location: None,
            selected_area: None,
            selected_station: None,
            rotation_set: None,
            started_at,
            ended_at,
            duration_secs,
            audio_file: None,
            metadata: HashMap::new(),
            status: SyncStatus::Pending,
            sync_attempts: 0,
            last_attempt_at: None,
            last_error: None,
        }
    }

    // --- Getters ---

    /// Returns the interview's unique identifier
    pub fn id(&self) -> &InterviewId {
        &self.id
    }

    /// Returns the survey identifier
    pub fn survey_id(&self) -> &SurveyId {
        &self.survey_id
    }

    /// Returns the denormalized survey definition
    pub fn survey_snapshot(&self) -> &serde_json::Value {
        &self.survey_snapshot
    }

    /// Returns the interviewing mode
    pub fn mode(&self) -> InterviewMode {
        self.mode
    }

    /// Returns the response map
    pub fn responses(&self) -> &HashMap<String, serde_json::Value> {
        &self.responses
    }

    /// Returns the current sync status
    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Returns the number of push attempts made
    pub fn sync_attempts(&self) -> u32 {
        self.sync_attempts
    }

    /// Returns when the last push attempt was made
    pub fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
        self.last_attempt_at
    }

    /// Returns the error message from the last failed attempt
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the device location snapshot
    pub fn location(&self) -> Option<&LocationSnapshot> {
        self.location.as_ref()
    }

    /// Returns the selected administrative area
    pub fn selected_area(&self) -> Option<&str> {
        self.selected_area.as_deref()
    }

    /// Returns the selected polling station
    pub fn selected_station(&self) -> Option<&str> {
        self.selected_station.as_deref()
    }

    /// Returns the CATI rotation set used
    pub fn rotation_set(&self) -> Option<u32> {
        self.rotation_set
    }

    /// Returns the interview duration in seconds
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Returns the local audio file path
    pub fn audio_file(&self) -> Option<&str> {
        self.audio_file.as_deref()
    }

    /// Returns the free-form metadata bag
    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Returns when the interview started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns when the interview ended
    pub fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    /// Returns the server session identifier
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    // --- Setters ---

    /// Sets the server session identifier
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
    }

    /// Sets the CATI call and queue identifiers
    pub fn set_cati_ids(&mut self, call_id: impl Into<String>, queue_id: impl Into<String>) {
        self.call_id = Some(call_id.into());
        self.queue_id = Some(queue_id.into());
    }

    /// Sets the device location
    pub fn set_location(&mut self, location: LocationSnapshot) {
        self.location = Some(location);
    }

    /// Records the area/station selections made during the interview
    pub fn set_selection(&mut self, area: Option<String>, station: Option<String>) {
        self.selected_area = area;
        self.selected_station = station;
    }

    /// Records the CATI rotation set used
    pub fn set_rotation_set(&mut self, set_number: u32) {
        self.rotation_set = Some(set_number);
    }

    /// Attaches a recorded audio file reference
    pub fn set_audio_file(&mut self, path: impl Into<String>) {
        self.audio_file = Some(path.into());
    }

    /// Inserts a metadata entry
    pub fn insert_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    // --- State transitions ---

    /// Checks if a status transition is valid
    ///
    /// Valid transitions:
    /// - Pending -> Syncing
    /// - Syncing -> Synced, Failed
    /// - Failed -> Pending (manual retry), Syncing (automatic retry)
    /// - Synced -> (terminal; the record is deleted)
    pub fn can_transition_to(&self, target: SyncStatus) -> bool {
        match (self.status, target) {
            (SyncStatus::Pending, SyncStatus::Syncing) => true,
            (SyncStatus::Syncing, SyncStatus::Synced) => true,
            (SyncStatus::Syncing, SyncStatus::Failed) => true,
            (SyncStatus::Failed, SyncStatus::Pending) => true,
            (SyncStatus::Failed, SyncStatus::Syncing) => true,
            _ => false,
        }
    }

    /// Attempts to transition to a new status
    ///
    /// Every transition stamps `last_attempt_at`; a `Synced` transition also
    /// clears the last error.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` if the transition is not allowed.
    pub fn transition_to(&mut self, target: SyncStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(target) {
            return Err(DomainError::InvalidState {
                from: self.status.name().to_string(),
                to: target.name().to_string(),
            });
        }
        self.last_attempt_at = Some(Utc::now());
        if matches!(target, SyncStatus::Synced) {
            self.last_error = None;
        }
        self.status = target;
        Ok(())
    }

    /// Transitions to `Failed`, incrementing the attempt counter and
    /// recording the error message
    pub fn record_failure(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        self.transition_to(SyncStatus::Failed)?;
        self.sync_attempts += 1;
        self.last_error = Some(error.into());
        Ok(())
    }

    /// Convenience method to start a push attempt
    pub fn start_sync(&mut self) -> Result<(), DomainError> {
        self.transition_to(SyncStatus::Syncing)
    }

    /// Convenience method to mark server acknowledgment
    pub fn mark_synced(&mut self) -> Result<(), DomainError> {
        self.transition_to(SyncStatus::Synced)
    }

    /// Convenience method for a manual retry reset
    pub fn reset_for_retry(&mut self) -> Result<(), DomainError> {
        self.transition_to(SyncStatus::Pending)
    }
}

// ============================================================================
// SyncQueueItem
// ============================================================================

/// What kind of submission a queue item represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionType {
    /// A completed interview payload
    Complete,
    /// An abandon notification; carries no full interview record
    Abandon,
}

/// A secondary, app-level retry ledger entry
///
/// Exists alongside the interview status field because abandon submissions
/// do not map onto the full interview lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    /// Interview this submission belongs to
    pub interview_id: InterviewId,
    /// Whether this is a completion or an abandon
    pub submission_type: SubmissionType,
    /// The payload to (re)submit
    pub payload: serde_json::Value,
    /// When the item was enqueued
    pub enqueued_at: DateTime<Utc>,
    /// Number of delivery attempts made
    pub attempts: u32,
}

impl SyncQueueItem {
    /// Creates a fresh queue item with zero attempts
    pub fn new(
        interview_id: InterviewId,
        submission_type: SubmissionType,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            interview_id,
            submission_type,
            payload,
            enqueued_at: Utc::now(),
            attempts: 0,
        }
    }
}
