//! Search `Bundle` traversal.

use serde_json::Value;

/// Returns the resources carried in a bundle's `entry[].resource` slots.
///
/// A payload without an `entry` array (empty search result, or a single
/// resource passed where a bundle was expected) yields an empty list.
pub fn entries(bundle: &Value) -> Vec<&Value> {
    bundle
        .get("entry")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("resource"))
                .collect()
        })
        .unwrap_or_default()
}

/// Returns the bundle's resources of one `resourceType`.
///
/// Search results routinely mix types (`_include`d resources,
/// `OperationOutcome` warnings), so extraction always filters.
pub fn resources_of_type<'a>(bundle: &'a Value, resource_type: &str) -> Vec<&'a Value> {
    entries(bundle)
        .into_iter()
        .filter(|resource| {
            resource.get("resourceType").and_then(Value::as_str) == Some(resource_type)
        })
        .collect()
}
