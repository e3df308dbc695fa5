//! `Condition` flattening.

use crate::bundle;
use crate::coding::{coded_text_of, status_label, CodedText};
use crate::str_of;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flat record for one `Condition` resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConditionRecord {
    pub id: String,
    pub name: CodedText,
    pub clinical_status: String,
    pub verification_status: String,
    pub onset_date_time: String,
    pub recorded_date: String,
}

/// Conditions extracted from one search bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConditionList {
    pub conditions: Vec<ConditionRecord>,
    pub total: usize,
}

/// Flattens a single `Condition` resource.
pub fn normalize(resource: &Value) -> ConditionRecord {
    ConditionRecord {
        id: str_of(resource, "id"),
        name: coded_text_of(resource, "code"),
        clinical_status: status_label(resource, "clinicalStatus"),
        verification_status: status_label(resource, "verificationStatus"),
        onset_date_time: str_of(resource, "onsetDateTime"),
        recorded_date: str_of(resource, "recordedDate"),
    }
}

/// Flattens every `Condition` in a search bundle.
pub fn from_bundle(bundle: &Value) -> ConditionList {
    let conditions: Vec<ConditionRecord> = bundle::resources_of_type(bundle, "Condition")
        .into_iter()
        .map(normalize)
        .collect();
    let total = conditions.len();

    ConditionList { conditions, total }
}
