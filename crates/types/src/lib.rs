//! Validated primitives shared across the triage gateway crates.
//!
//! Contains:
//! - [`EsiScore`], an Emergency Severity Index level guaranteed to lie in 1–5
//! - [`TriageResult`], the score/explanation pair returned by every scoring
//!   strategy and API response

use serde::{Deserialize, Serialize};

/// Errors that can occur when creating validated triage types.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    /// The value was outside the valid ESI range.
    #[error("ESI score must be between 1 and 5, got {0}")]
    OutOfRange(i64),
}

/// An Emergency Severity Index level.
///
/// This type wraps an integer and guarantees it lies within the five-level
/// ESI scale. Construction via [`EsiScore::new`] rejects anything outside
/// 1–5, so downstream code never has to re-validate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct EsiScore(u8);

impl EsiScore {
    /// Level 1: life-threatening, immediate intervention.
    pub const IMMEDIATE: EsiScore = EsiScore(1);
    /// Level 2: high risk of deterioration.
    pub const EMERGENT: EsiScore = EsiScore(2);
    /// Level 3: stable, multiple resource types anticipated.
    pub const URGENT: EsiScore = EsiScore(3);
    /// Level 4: stable, a single resource type anticipated.
    pub const LESS_URGENT: EsiScore = EsiScore(4);
    /// Level 5: stable, no resources anticipated.
    pub const NON_URGENT: EsiScore = EsiScore(5);

    /// The neutral fallback level used when a scoring backend produces
    /// output that cannot be interpreted.
    pub const NEUTRAL: EsiScore = EsiScore(3);

    /// Creates a new `EsiScore` from the given value.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreError::OutOfRange`] if `value` is not within 1–5.
    pub fn new(value: i64) -> Result<Self, ScoreError> {
        if (1..=5).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ScoreError::OutOfRange(value))
        }
    }

    /// Returns the numeric level.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for EsiScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for EsiScore {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for EsiScore {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        EsiScore::new(value).map_err(serde::de::Error::custom)
    }
}

impl<'s> utoipa::ToSchema<'s> for EsiScore {
    fn schema() -> (
        &'s str,
        utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>,
    ) {
        (
            "EsiScore",
            utoipa::openapi::ObjectBuilder::new()
                .schema_type(utoipa::openapi::SchemaType::Integer)
                .description(Some("Emergency Severity Index level (1-5)"))
                .minimum(Some(1.0))
                .maximum(Some(5.0))
                .into(),
        )
    }
}

/// Outcome of a triage scoring run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TriageResult {
    /// Assigned ESI level.
    pub esi_score: EsiScore,
    /// Human-readable reasoning behind the assignment.
    pub explanation: String,
}
