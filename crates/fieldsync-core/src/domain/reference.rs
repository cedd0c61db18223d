//! Reference data payloads
//!
//! Payload types for the seven cached resource families, plus the survey
//! assignment metadata the bulk downloader crawls from. These are the
//! canonical internal shapes; defensive parsing of server variants happens
//! at the ingestion boundary ([`GroupEntry`]) and nowhere else.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::CompositeKey;

// ============================================================================
// CacheEntry
// ============================================================================

/// One cached record with its key and write timestamp
///
/// Every read that is served from cache carries `cached_at` so callers can
/// decide whether the data is too stale to act on. Cache population never
/// rewrites `cached_at` on a no-op; a `put` always stamps the current time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Composite key identifying this entry within its family
    pub key: CompositeKey,
    /// The cached payload
    pub payload: T,
    /// When this entry was last written
    pub cached_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Creates an entry stamped with the current time
    pub fn new(key: CompositeKey, payload: T) -> Self {
        Self {
            key,
            payload,
            cached_at: Utc::now(),
        }
    }
}

// ============================================================================
// InterviewMode
// ============================================================================

/// How interviews for a survey are conducted
///
/// Affects pre-caching: rotation counters are only fetched for surveys that
/// can run telephone interviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewMode {
    /// Computer-assisted personal (in-person) interviewing
    Capi,
    /// Computer-assisted telephone interviewing
    Cati,
    /// Survey supports both modes
    Mixed,
}

impl InterviewMode {
    /// Returns true if the survey can run telephone interviews
    pub fn is_telephone(&self) -> bool {
        matches!(self, InterviewMode::Cati | InterviewMode::Mixed)
    }
}

impl fmt::Display for InterviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterviewMode::Capi => write!(f, "capi"),
            InterviewMode::Cati => write!(f, "cati"),
            InterviewMode::Mixed => write!(f, "mixed"),
        }
    }
}

// ============================================================================
// AC metadata
// ============================================================================

/// Master-data record for one administrative constituency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcRecord {
    /// Canonical spelling as stored in server master data
    pub name: String,
    /// State the constituency belongs to
    pub state: String,
    /// Elected representative names, most recent first
    pub representatives: Vec<String>,
    /// Whether an election is currently scheduled here
    pub election_scheduled: bool,
    /// Whether the constituency is reserved (SC/ST)
    pub reserved: bool,
}

// ============================================================================
// Polling groups and stations
// ============================================================================

/// A polling group in canonical internal shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingGroup {
    /// Group name, unique within its area
    pub name: String,
}

/// Raw group entry as the server returns it
///
/// The groups endpoint is inconsistent: entries arrive either as plain
/// strings or as objects whose name field varies. Normalization into
/// [`PollingGroup`] happens here, at the ingestion boundary, so the rest of
/// the pipeline only ever sees the canonical shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GroupEntry {
    /// `"Group A"`
    Plain(String),
    /// `{"name": ...}` / `{"groupName": ...}` / `{"group_name": ...}`
    Object {
        #[serde(default)]
        name: Option<String>,
        #[serde(default, rename = "groupName")]
        group_name_camel: Option<String>,
        #[serde(default)]
        group_name: Option<String>,
    },
}

impl GroupEntry {
    /// Extracts a usable group name, if the entry carries one
    ///
    /// Entries yielding no name are skipped (and logged) by the caller
    /// rather than failing the whole list.
    pub fn into_group(self) -> Option<PollingGroup> {
        let name = match self {
            GroupEntry::Plain(s) => Some(s),
            GroupEntry::Object {
                name,
                group_name_camel,
                group_name,
            } => name.or(group_name_camel).or(group_name),
        }?;
        let name = name.trim().to_string();
        if name.is_empty() {
            return None;
        }
        Some(PollingGroup { name })
    }
}

/// GPS coordinates with an optional descriptive location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Free-text description of the spot, when available
    pub description: Option<String>,
}

/// One polling station record
///
/// GPS arrives inline with the stations list; there is no separate
/// coordinates endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingStation {
    /// Station name, unique within its group
    pub name: String,
    /// Station number as printed on voter rolls, when known
    pub number: Option<String>,
    /// Inline GPS coordinates, when the server has them
    pub gps: Option<GpsPoint>,
}

// ============================================================================
// Quotas and rotation counters
// ============================================================================

/// Per-gender interview counts against a target quota
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenderQuota {
    /// Completed interview count per gender label
    pub counts: HashMap<String, u32>,
    /// Target count per gender label
    pub targets: HashMap<String, u32>,
}

impl GenderQuota {
    /// Returns true if every gender has reached its target
    pub fn is_filled(&self) -> bool {
        self.targets
            .iter()
            .all(|(gender, target)| self.counts.get(gender).copied().unwrap_or(0) >= *target)
    }
}

/// Last-used CATI rotation set for a survey
///
/// `last_set_number` is `None` when the survey has no prior telephone
/// interviews; callers default to set 1 in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationCounter {
    /// The alternating set number used by the most recent interview
    pub last_set_number: Option<u32>,
}

impl RotationCounter {
    /// The set number the next interview should use
    pub fn next_set_number(&self) -> u32 {
        match self.last_set_number {
            Some(n) => n + 1,
            None => 1,
        }
    }
}

// ============================================================================
// User profile
// ============================================================================

/// Snapshot of the authenticated interviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Server-side user identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact phone number, when known
    pub phone: Option<String>,
    /// Role label (e.g. "interviewer", "supervisor")
    pub role: String,
}

// ============================================================================
// Survey assignment metadata
// ============================================================================

/// Area names assigned to the current user, split by interviewing role
///
/// The same area may appear in more than one list; the downloader collapses
/// duplicates before crawling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRoles {
    /// Areas assigned for single-mode work
    #[serde(default)]
    pub single_mode: Vec<String>,
    /// Areas assigned for telephone work
    #[serde(default)]
    pub phone_mode: Vec<String>,
    /// Areas assigned for in-person work
    #[serde(default)]
    pub in_person_mode: Vec<String>,
}

impl AssignmentRoles {
    /// Iterates over every assigned area name across all role lists
    pub fn all_areas(&self) -> impl Iterator<Item = &str> {
        self.single_mode
            .iter()
            .chain(self.phone_mode.iter())
            .chain(self.in_person_mode.iter())
            .map(|s| s.as_str())
    }
}

/// A survey as assigned to the current user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    /// Server-issued survey identifier
    pub id: super::newtypes::SurveyId,
    /// Human-readable survey name
    pub name: String,
    /// Interviewing mode
    pub mode: InterviewMode,
    /// Administrative areas assigned to the user
    #[serde(default)]
    pub assignments: AssignmentRoles,
    /// State the survey runs in; `None` falls back to the configured default
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::newtypes::SurveyId;
    use serde_json::json;

    #[test]
    fn test_group_entry_plain() {
        let entry: GroupEntry = serde_json::from_value(json!("Group A")).unwrap();
        assert_eq!(entry.into_group().unwrap().name, "Group A");
    }

    #[test]
    fn test_group_entry_object_variants() {
        for body in [
            json!({"name": "Group B"}),
            json!({"groupName": "Group B"}),
            json!({"group_name": "Group B"}),
        ] {
            let entry: GroupEntry = serde_json::from_value(body).unwrap();
            assert_eq!(entry.into_group().unwrap().name, "Group B");
        }
    }

    #[test]
    fn test_group_entry_unusable() {
        let entry: GroupEntry = serde_json::from_value(json!({"id": 7})).unwrap();
        assert!(entry.into_group().is_none());

        let entry: GroupEntry = serde_json::from_value(json!("   ")).unwrap();
        assert!(entry.into_group().is_none());
    }

    #[test]
    fn test_group_entry_trims() {
        let entry: GroupEntry = serde_json::from_value(json!("  Group C ")).unwrap();
        assert_eq!(entry.into_group().unwrap().name, "Group C");
    }

    #[test]
    fn test_rotation_counter_defaults_to_one() {
        let fresh = RotationCounter {
            last_set_number: None,
        };
        assert_eq!(fresh.next_set_number(), 1);

        let used = RotationCounter {
            last_set_number: Some(3),
        };
        assert_eq!(used.next_set_number(), 4);
    }

    #[test]
    fn test_gender_quota_filled() {
        let quota = GenderQuota {
            counts: HashMap::from([("male".to_string(), 50), ("female".to_string(), 49)]),
            targets: HashMap::from([("male".to_string(), 50), ("female".to_string(), 50)]),
        };
        assert!(!quota.is_filled());

        let mut filled = quota.clone();
        filled.counts.insert("female".to_string(), 50);
        assert!(filled.is_filled());
    }

    #[test]
    fn test_interview_mode_telephone() {
        assert!(InterviewMode::Cati.is_telephone());
        assert!(InterviewMode::Mixed.is_telephone());
        assert!(!InterviewMode::Capi.is_telephone());
    }

    #[test]
    fn test_assignment_roles_union() {
        let roles = AssignmentRoles {
            single_mode: vec!["A".to_string()],
            phone_mode: vec!["B".to_string(), "A".to_string()],
            in_person_mode: vec!["C".to_string()],
        };
        let all: Vec<&str> = roles.all_areas().collect();
        assert_eq!(all, vec!["A", "B", "A", "C"]);
    }

    #[test]
    fn test_survey_deserializes_without_assignments() {
        let survey: Survey = serde_json::from_value(json!({
            "id": "svy-1",
            "name": "Test",
            "mode": "cati",
            "state": null
        }))
        .unwrap();
        assert_eq!(survey.id, SurveyId::new("svy-1").unwrap());
        assert!(survey.assignments.all_areas().next().is_none());
    }

    #[test]
    fn test_cache_entry_roundtrip() {
        let entry = CacheEntry::new(
            CompositeKey::single("COOCHBEHAR UTTAR (SC)").unwrap(),
            AcRecord {
                name: "COOCHBEHAR UTTAR (SC)".to_string(),
                state: "WB".to_string(),
                representatives: vec!["N. Roy".to_string()],
                election_scheduled: true,
                reserved: true,
            },
        );
        let json = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry<AcRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
