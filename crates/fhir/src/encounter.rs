//! `Encounter` flattening.

use crate::bundle;
use crate::coding::coded_text;
use crate::str_of;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Start/end of an encounter, raw timestamp strings, empty when absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Period {
    pub start: String,
    pub end: String,
}

/// Flat record for one `Encounter` resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EncounterRecord {
    pub id: String,
    /// Encounter type labels (an encounter can carry several).
    pub types: Vec<String>,
    /// Encounter class (ambulatory, emergency, inpatient, ...).
    pub class: String,
    /// Reason for the visit.
    pub reason: String,
    pub status: String,
    pub period: Period,
}

/// Encounters extracted from one search bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EncounterList {
    pub encounters: Vec<EncounterRecord>,
    pub total: usize,
}

/// Flattens a single `Encounter` resource.
pub fn normalize(resource: &Value) -> EncounterRecord {
    let types = resource
        .get("type")
        .and_then(Value::as_array)
        .map(|types| {
            types
                .iter()
                .map(|t| coded_text(t).label().to_string())
                .filter(|label| !label.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let period = resource
        .get("period")
        .map(|period| Period {
            start: str_of(period, "start"),
            end: str_of(period, "end"),
        })
        .unwrap_or_default();

    EncounterRecord {
        id: str_of(resource, "id"),
        types,
        class: class_of(resource),
        reason: reason_of(resource),
        status: str_of(resource, "status"),
        period,
    }
}

/// Flattens every `Encounter` in a search bundle.
pub fn from_bundle(bundle: &Value) -> EncounterList {
    let encounters: Vec<EncounterRecord> = bundle::resources_of_type(bundle, "Encounter")
        .into_iter()
        .map(normalize)
        .collect();
    let total = encounters.len();

    EncounterList { encounters, total }
}

/// `Encounter.class` is a bare `Coding` in R4; prefer its display.
fn class_of(resource: &Value) -> String {
    let Some(class) = resource.get("class") else {
        return String::new();
    };

    let display = str_of(class, "display");
    if display.is_empty() {
        str_of(class, "code")
    } else {
        display
    }
}

fn reason_of(resource: &Value) -> String {
    let from_code = resource
        .get("reasonCode")
        .and_then(Value::as_array)
        .and_then(|reasons| reasons.first())
        .map(|reason| coded_text(reason).label().to_string())
        .unwrap_or_default();
    if !from_code.is_empty() {
        return from_code;
    }

    resource
        .get("reasonReference")
        .and_then(Value::as_array)
        .and_then(|references| references.first())
        .map(|reference| str_of(reference, "display"))
        .unwrap_or_default()
}
