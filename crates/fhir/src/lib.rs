//! FHIR normalization for the triage gateway.
//!
//! This crate turns raw FHIR R4 JSON (single resources or search `Bundle`s)
//! into the flat records the gateway serves and scores. It deliberately does
//! NOT model the full FHIR resource space: only the fields the triage flow
//! consumes are extracted.
//!
//! This crate focuses on:
//! - flattening deeply nested resources into simple serialisable records
//! - resolving `Observation.value[x]` unions and `medicationReference` joins
//! - degrading gracefully: extraction is **total**, missing or malformed
//!   fields become empty strings / empty lists / `None`, never an error
//!
//! The total-extraction contract is load-bearing. Prompt building and API
//! responses downstream assume default-filled shapes, so nothing in this
//! crate returns `Result`.

pub mod allergy;
pub mod bundle;
pub mod coding;
pub mod condition;
pub mod demographics;
pub mod encounter;
pub mod medication;
pub mod note;
pub mod observation;

// Re-export the flat records and their bundle-level collections
pub use allergy::{AllergyList, AllergyRecord};
pub use coding::CodedText;
pub use condition::{ConditionList, ConditionRecord};
pub use demographics::Demographics;
pub use encounter::{EncounterList, EncounterRecord, Period};
pub use medication::{MedicationList, MedicationRecord};
pub use note::{ClinicalNote, NoteList};
pub use observation::{Observation, ObservationComponent, ObservationList, ObservationValue};

use serde_json::Value;

/// Extracts a string field from a JSON object, empty when absent or not a
/// string.
pub(crate) fn str_of(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Renders a JSON number as human-readable text, dropping a superfluous
/// `.0` on whole values.
pub(crate) fn number_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn str_of_degrades_to_empty() {
        let value = json!({"a": "x", "b": 7});
        assert_eq!(str_of(&value, "a"), "x");
        assert_eq!(str_of(&value, "b"), "");
        assert_eq!(str_of(&value, "missing"), "");
    }

    #[test]
    fn number_text_drops_trailing_zero() {
        assert_eq!(number_text(88.0), "88");
        assert_eq!(number_text(36.6), "36.6");
    }
}
