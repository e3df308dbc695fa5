//! `DocumentReference` (clinical note) flattening.

use crate::bundle;
use crate::coding::{coded_text_of, CodedText};
use crate::str_of;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flat record for one `DocumentReference` resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ClinicalNote {
    pub id: String,
    pub note_type: CodedText,
    pub date: String,
    pub status: String,
    pub description: String,
}

/// Clinical notes extracted from one search bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteList {
    pub notes: Vec<ClinicalNote>,
    pub total: usize,
}

/// Flattens a single `DocumentReference` resource.
pub fn normalize(resource: &Value) -> ClinicalNote {
    ClinicalNote {
        id: str_of(resource, "id"),
        note_type: coded_text_of(resource, "type"),
        date: str_of(resource, "date"),
        status: str_of(resource, "status"),
        description: str_of(resource, "description"),
    }
}

/// Flattens every `DocumentReference` in a search bundle.
pub fn from_bundle(bundle: &Value) -> NoteList {
    let notes: Vec<ClinicalNote> = bundle::resources_of_type(bundle, "DocumentReference")
        .into_iter()
        .map(normalize)
        .collect();
    let total = notes.len();

    NoteList { notes, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_document_reference() {
        let note = json!({
            "resourceType": "DocumentReference",
            "id": "n1",
            "type": {"text": "Discharge summary", "coding": [{"code": "18842-5"}]},
            "date": "2024-02-10T08:00:00Z",
            "status": "current",
            "description": "ED discharge note"
        });

        let record = normalize(&note);
        assert_eq!(record.note_type.text, "Discharge summary");
        assert_eq!(record.note_type.code, "18842-5");
        assert_eq!(record.date, "2024-02-10T08:00:00Z");
        assert_eq!(record.status, "current");
        assert_eq!(record.description, "ED discharge note");
    }

    #[test]
    fn missing_entry_key_yields_zero_total() {
        let list = from_bundle(&json!({"resourceType": "Bundle"}));
        assert!(list.notes.is_empty());
        assert_eq!(list.total, 0);
    }
}
