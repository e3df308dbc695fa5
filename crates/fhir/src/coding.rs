//! `CodeableConcept` flattening.

use crate::str_of;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flattened form of a FHIR `CodeableConcept`.
///
/// `code`, `display` and `system` come from the first `coding` entry when
/// one exists; `text` comes from the concept itself. All fields degrade to
/// empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CodedText {
    pub text: String,
    pub code: String,
    pub display: String,
    pub system: String,
}

impl CodedText {
    /// Best human-readable label: `text` when present, else `display`.
    pub fn label(&self) -> &str {
        if self.text.is_empty() {
            &self.display
        } else {
            &self.text
        }
    }
}

/// Flattens a `CodeableConcept` JSON value into a [`CodedText`].
///
/// When the concept has a `coding` array, the first entry supplies the coding
/// triple. Otherwise only `text` is carried.
pub fn coded_text(concept: &Value) -> CodedText {
    let text = str_of(concept, "text");

    match concept
        .get("coding")
        .and_then(Value::as_array)
        .and_then(|codings| codings.first())
    {
        Some(coding) => CodedText {
            text,
            code: str_of(coding, "code"),
            display: str_of(coding, "display"),
            system: str_of(coding, "system"),
        },
        None => CodedText {
            text,
            ..CodedText::default()
        },
    }
}

/// Flattens an optional field holding a `CodeableConcept`.
pub fn coded_text_of(resource: &Value, key: &str) -> CodedText {
    resource.get(key).map(coded_text).unwrap_or_default()
}

/// Short machine label for status-style concepts (`clinicalStatus`,
/// `verificationStatus`): the coding `code` when present, else `text`.
pub fn status_label(resource: &Value, key: &str) -> String {
    let coded = coded_text_of(resource, key);
    if coded.code.is_empty() {
        coded.text
    } else {
        coded.code
    }
}
