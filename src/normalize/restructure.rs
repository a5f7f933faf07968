//! Type-specific property reshaping.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};
use serde_json::{Map, Value as JsonValue, json};

use super::decode::is_truthy;

/// Group `type`, `automatic` and `material` of an opening into `door`.
pub(crate) fn door(properties: &mut Map<String, JsonValue>) {
    let members = ["type", "automatic", "material"].map(|key| (key, properties.shift_remove(key)));

    let door: Map<String, JsonValue> = members
        .into_iter()
        .filter_map(|(key, value)| Some((key.to_string(), value.filter(is_truthy)?)))
        .collect();

    let door = if door.is_empty() {
        JsonValue::Null
    } else {
        JsonValue::Object(door)
    };
    properties.insert("door".to_string(), door);
}

/// Group the `start`, `end` and `modified` timestamps of an occupant into
/// `validity`, rendered as ISO 8601.
pub(crate) fn validity(properties: &mut Map<String, JsonValue>) {
    let members = ["start", "end", "modified"].map(|key| (key, properties.shift_remove(key)));

    let validity: Map<String, JsonValue> = members
        .into_iter()
        .filter_map(|(key, value)| {
            let timestamp = iso_timestamp(&value?)?;
            Some((key.to_string(), JsonValue::String(timestamp)))
        })
        .collect();

    let validity = if validity.is_empty() {
        JsonValue::Null
    } else {
        JsonValue::Object(validity)
    };
    properties.insert("validity".to_string(), validity);
}

/// Replace the properties of a relationship with its IMDF shape.
///
/// Endpoints prefer the unit reference over the opening reference, and the
/// intermediary prefers `unit_ids` over `opening_ids`.
pub(crate) fn relationship(properties: &mut Map<String, JsonValue>) {
    let mut take = |key: &str| properties.shift_remove(key).unwrap_or(JsonValue::Null);

    let category = take("category");
    let direction = take("direction");
    let hours = take("hours");
    let origin = endpoint(take("origin_unit_id"), take("origin_opening_id"));
    let destination = endpoint(take("destination_unit_id"), take("destination_opening_id"));
    let intermediary = intermediary(take("unit_ids"), take("opening_ids"));

    properties.clear();
    properties.insert("category".to_string(), category);
    properties.insert("direction".to_string(), direction);
    properties.insert("origin".to_string(), origin);
    properties.insert("intermediary".to_string(), intermediary);
    properties.insert("destination".to_string(), destination);
    properties.insert("hours".to_string(), hours);
}

fn reference(id: JsonValue, feature_type: &str) -> JsonValue {
    json!({"id": id, "feature_type": feature_type})
}

fn endpoint(unit_id: JsonValue, opening_id: JsonValue) -> JsonValue {
    if is_truthy(&unit_id) {
        reference(unit_id, "unit")
    } else if is_truthy(&opening_id) {
        reference(opening_id, "opening")
    } else {
        JsonValue::Null
    }
}

fn intermediary(unit_ids: JsonValue, opening_ids: JsonValue) -> JsonValue {
    let (ids, feature_type) = if is_truthy(&unit_ids) {
        (unit_ids, "unit")
    } else if is_truthy(&opening_ids) {
        (opening_ids, "opening")
    } else {
        return JsonValue::Null;
    };

    let ids = match ids {
        JsonValue::Array(ids) => ids,
        single => vec![single],
    };
    JsonValue::Array(
        ids.into_iter()
            .map(|id| reference(id, feature_type))
            .collect(),
    )
}

/// Render a stored timestamp as ISO 8601.
///
/// Offset-aware values keep their offset (`+00:00` for UTC), naive values are
/// written without one and dates stay dates. Null and empty values yield
/// `None`, as do text that does not parse and non-text values (with a
/// warning).
pub(crate) fn iso_timestamp(value: &JsonValue) -> Option<String> {
    let text = match value {
        JsonValue::Null => return None,
        JsonValue::String(text) => text.trim(),
        other => {
            tracing::warn!(value = %other, "timestamp is not text, dropping it");
            return None;
        }
    };
    if text.is_empty() {
        return None;
    }

    if let Ok(aware) = DateTime::parse_from_rfc3339(text) {
        return Some(aware.to_rfc3339_opts(SecondsFormat::AutoSi, false));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    tracing::warn!(value = text, "unrecognized timestamp, dropping it");
    None
}
