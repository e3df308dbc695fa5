//! `AllergyIntolerance` flattening.

use crate::bundle;
use crate::coding::{coded_text, coded_text_of, status_label};
use crate::str_of;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flat record for one `AllergyIntolerance` resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AllergyRecord {
    pub id: String,
    pub name: String,
    pub clinical_status: String,
    pub criticality: String,
    /// Reaction manifestations, flattened to their labels.
    pub reactions: Vec<String>,
}

/// Allergies extracted from one search bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AllergyList {
    pub allergies: Vec<AllergyRecord>,
    pub total: usize,
}

/// Flattens a single `AllergyIntolerance` resource.
pub fn normalize(resource: &Value) -> AllergyRecord {
    AllergyRecord {
        id: str_of(resource, "id"),
        name: coded_text_of(resource, "code").label().to_string(),
        clinical_status: status_label(resource, "clinicalStatus"),
        criticality: str_of(resource, "criticality"),
        reactions: reactions_of(resource),
    }
}

/// Flattens every `AllergyIntolerance` in a search bundle.
pub fn from_bundle(bundle: &Value) -> AllergyList {
    let allergies: Vec<AllergyRecord> = bundle::resources_of_type(bundle, "AllergyIntolerance")
        .into_iter()
        .map(normalize)
        .collect();
    let total = allergies.len();

    AllergyList { allergies, total }
}

fn reactions_of(resource: &Value) -> Vec<String> {
    resource
        .get("reaction")
        .and_then(Value::as_array)
        .map(|reactions| {
            reactions
                .iter()
                .flat_map(|reaction| {
                    reaction
                        .get("manifestation")
                        .and_then(Value::as_array)
                        .map(|manifestations| {
                            manifestations
                                .iter()
                                .map(|m| coded_text(m).label().to_string())
                                .filter(|label| !label.is_empty())
                                .collect::<Vec<_>>()
                        })
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}
