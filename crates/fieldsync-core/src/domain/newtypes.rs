//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and
//! cache keys. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Reserved separator joining composite key components.
///
/// Component values must not contain this sequence or lookups silently
/// collide.
pub const KEY_SEPARATOR: &str = "::";

// ============================================================================
// CompositeKey
// ============================================================================

/// An ordered tuple of string components identifying one cache entry
///
/// Keys are joined with [`KEY_SEPARATOR`] for storage. Within a resource
/// family a composite key uniquely identifies one entry; writes are
/// idempotent last-write-wins overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeKey(String);

impl CompositeKey {
    /// Builds a key from ordered components
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidKeyComponent` if any component contains
    /// the separator sequence or the component list is empty.
    pub fn new<S: AsRef<str>>(components: &[S]) -> Result<Self, DomainError> {
        if components.is_empty() {
            return Err(DomainError::ValidationFailed(
                "Composite key needs at least one component".to_string(),
            ));
        }
        for c in components {
            if c.as_ref().contains(KEY_SEPARATOR) {
                return Err(DomainError::InvalidKeyComponent(c.as_ref().to_string()));
            }
        }
        let joined = components
            .iter()
            .map(|c| c.as_ref())
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR);
        Ok(Self(joined))
    }

    /// Convenience constructor for a single-component key
    pub fn single(component: &str) -> Result<Self, DomainError> {
        Self::new(&[component])
    }

    /// Returns the joined key string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the key back into its ordered components
    pub fn components(&self) -> Vec<&str> {
        self.0.split(KEY_SEPARATOR).collect()
    }

    /// Returns a copy of this key with the component at `index` replaced
    ///
    /// Used by the fallback lookup to substitute the area component with
    /// its normalized or raw spelling.
    pub fn with_component(&self, index: usize, value: &str) -> Result<Self, DomainError> {
        let mut parts = self.components();
        if index >= parts.len() {
            return Err(DomainError::ValidationFailed(format!(
                "Component index {} out of range for key {}",
                index, self.0
            )));
        }
        parts[index] = value;
        Self::new(&parts)
    }
}

impl Display for CompositeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// InterviewId
// ============================================================================

/// Locally generated identifier for an offline interview attempt
///
/// Format: `<unix-millis>-<8 hex chars>`. Identifiers are generated on the
/// device the instant an interview completes and are never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterviewId(String);

impl InterviewId {
    /// Generates a new identifier from the current time and a random suffix
    #[must_use]
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", millis, &suffix[..8]))
    }

    /// Returns the identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for InterviewId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InterviewId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (millis, suffix) = s
            .split_once('-')
            .ok_or_else(|| DomainError::InvalidInterviewId(s.to_string()))?;
        if millis.is_empty() || millis.parse::<i64>().is_err() || suffix.is_empty() {
            return Err(DomainError::InvalidInterviewId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

// ============================================================================
// SurveyId
// ============================================================================

/// Identifier for a survey as assigned by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurveyId(String);

impl SurveyId {
    /// Wraps a server-issued survey identifier
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidSurveyId` if the value is empty or
    /// contains the key separator.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() || id.contains(KEY_SEPARATOR) {
            return Err(DomainError::InvalidSurveyId(id));
        }
        Ok(Self(id))
    }

    /// Returns the identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SurveyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SurveyId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
