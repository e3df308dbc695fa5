//! Patient demographics flattening and age derivation.

use crate::str_of;
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flat demographic record extracted from a FHIR `Patient` resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Demographics {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    /// Raw `birthDate` string (YYYY-MM-DD) as sent by the server.
    pub birth_date: String,
    /// Age in whole years, `None` when the birth date is absent or
    /// unparseable.
    pub age: Option<u32>,
    pub phone: String,
    pub address: String,
}

/// Flattens a `Patient` resource into a [`Demographics`] record.
///
/// The first `name` entry supplies given/family names; the first phone-type
/// `telecom` entry supplies the phone number; the first `address` entry is
/// rendered as a single comma-joined line.
pub fn normalize(resource: &Value) -> Demographics {
    let name = resource
        .get("name")
        .and_then(Value::as_array)
        .and_then(|names| names.first());

    let first_name = name
        .and_then(|n| n.get("given"))
        .and_then(Value::as_array)
        .and_then(|given| given.first())
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let last_name = name.map(|n| str_of(n, "family")).unwrap_or_default();

    let birth_date = str_of(resource, "birthDate");
    let age = age_on(&birth_date, Utc::now().date_naive());

    Demographics {
        id: str_of(resource, "id"),
        first_name,
        last_name,
        gender: str_of(resource, "gender"),
        birth_date,
        age,
        phone: phone_of(resource),
        address: address_of(resource),
    }
}

/// Computes age in whole years on `today` for a `YYYY-MM-DD` birth date.
///
/// Birthday-boundary inclusive: on the birthday itself the new age applies.
/// Unparseable or future dates yield `None`: absence of an age must never
/// abort normalization.
pub fn age_on(birth_date: &str, today: NaiveDate) -> Option<u32> {
    let born = NaiveDate::parse_from_str(birth_date, "%Y-%m-%d").ok()?;

    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    u32::try_from(age).ok()
}

fn phone_of(resource: &Value) -> String {
    resource
        .get("telecom")
        .and_then(Value::as_array)
        .and_then(|telecoms| {
            telecoms
                .iter()
                .find(|t| t.get("system").and_then(Value::as_str) == Some("phone"))
        })
        .map(|t| str_of(t, "value"))
        .unwrap_or_default()
}

fn address_of(resource: &Value) -> String {
    let Some(address) = resource
        .get("address")
        .and_then(Value::as_array)
        .and_then(|addresses| addresses.first())
    else {
        return String::new();
    };

    let mut parts: Vec<String> = address
        .get("line")
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    for key in ["city", "state", "postalCode"] {
        let part = str_of(address, key);
        if !part.is_empty() {
            parts.push(part);
        }
    }

    parts.join(", ")
}
