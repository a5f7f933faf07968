//! Field-level decoding applied to every feature before restructuring.

use serde_json::{Map, Value as JsonValue, json};

/// Address fields that must be exported as strings.
pub(crate) const ADDRESS_FIELDS: [&str; 4] =
    ["unit", "postal_code", "postal_code_ext", "postal_code_vanity"];

/// Fields holding JSON-encoded language maps.
pub(crate) const NAME_FIELDS: [&str; 3] = ["name", "alt_name", "short_name"];

const DISPLAY_POINT: &str = "display_point";

/// Force address fields to their string form. Absent fields become `null`.
pub(crate) fn coerce_address_fields(properties: &mut Map<String, JsonValue>) {
    for key in ADDRESS_FIELDS {
        let value = match properties.get(key) {
            None | Some(JsonValue::Null) => JsonValue::Null,
            Some(JsonValue::String(s)) => JsonValue::String(s.clone()),
            Some(other) => JsonValue::String(other.to_string()),
        };
        properties.insert(key.to_string(), value);
    }
}

/// Decode JSON-encoded names in place. Values that fail to decode are kept.
pub(crate) fn decode_name_fields(properties: &mut Map<String, JsonValue>) {
    for key in NAME_FIELDS {
        if let Some(JsonValue::String(raw)) = properties.get(key)
            && let Ok(decoded) = serde_json::from_str::<JsonValue>(raw)
        {
            properties.insert(key.to_string(), collapse_empty(decoded));
        }
    }
}

/// Decode every field except the address and name fields.
pub(crate) fn decode_other_fields(properties: &mut Map<String, JsonValue>) {
    for (key, value) in properties.iter_mut() {
        if ADDRESS_FIELDS.contains(&key.as_str()) || NAME_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let raw = std::mem::take(value);
        *value = decode_value(raw);
    }
}

/// Decode a single value.
///
/// `{a,b}` array literals become lists, other strings are tried as JSON, and
/// empty lists or objects from any source collapse to `null`.
pub(crate) fn decode_value(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::String(raw) => {
            if let Some(items) = parse_array_literal(&raw) {
                return collapse_empty(JsonValue::Array(items));
            }
            match serde_json::from_str::<JsonValue>(&raw) {
                Ok(decoded) => collapse_empty(decoded),
                Err(_) => JsonValue::String(raw),
            }
        }
        other => collapse_empty(other),
    }
}

/// Parse a brace-delimited array literal such as `{"a", 'b',c}`.
///
/// Items are trimmed and stripped of surrounding quotes; blank items are
/// skipped. Returns `None` when the value is not brace-delimited.
pub(crate) fn parse_array_literal(raw: &str) -> Option<Vec<JsonValue>> {
    let inner = raw.strip_prefix('{')?.strip_suffix('}')?;
    let items = inner
        .split(',')
        .filter(|item| !item.trim().is_empty())
        .map(|item| {
            let item = item.trim().trim_matches('"').trim_matches('\'');
            JsonValue::String(item.to_string())
        })
        .collect();
    Some(items)
}

/// Replace a `"lat, lon"` display point with a GeoJSON point.
pub(crate) fn derive_display_point(properties: &mut Map<String, JsonValue>) {
    let Some(JsonValue::String(raw)) = properties.get(DISPLAY_POINT) else {
        return;
    };
    match parse_lat_lon(raw) {
        Some((lat, lon)) => {
            let point = json!({"type": "Point", "coordinates": [lon, lat]});
            properties.insert(DISPLAY_POINT.to_string(), point);
        }
        None => tracing::warn!(display_point = raw.as_str(), "could not parse display_point"),
    }
}

fn parse_lat_lon(raw: &str) -> Option<(f64, f64)> {
    let (lat, lon) = raw.split_once(',')?;
    if lon.contains(',') {
        return None;
    }
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
}

pub(crate) fn collapse_empty(value: JsonValue) -> JsonValue {
    if is_empty_container(&value) {
        JsonValue::Null
    } else {
        value
    }
}

pub(crate) fn is_empty_container(value: &JsonValue) -> bool {
    match value {
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Whether a value counts as present: not null, false, zero, or empty.
pub(crate) fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn collapses_every_empty_encoding_to_null() {
        assert_eq!(decode_value(json!("{}")), JsonValue::Null);
        assert_eq!(decode_value(json!("[]")), JsonValue::Null);
        assert_eq!(decode_value(json!("{ , }")), JsonValue::Null);
        assert_eq!(decode_value(json!([])), JsonValue::Null);
        assert_eq!(decode_value(json!({})), JsonValue::Null);
        assert_eq!(decode_value(JsonValue::Null), JsonValue::Null);
    }

    #[test]
    fn decodes_array_literals_before_json() {
        assert_eq!(
            decode_value(json!("{U1, \"U2\", 'U3'}")),
            json!(["U1", "U2", "U3"])
        );
        assert_eq!(decode_value(json!("[\"a\", 1]")), json!(["a", 1]));
        assert_eq!(decode_value(json!("{a,,b}")), json!(["a", "b"]));
    }

    #[test]
    fn keeps_strings_that_are_not_json() {
        assert_eq!(decode_value(json!("restroom")), json!("restroom"));
        assert_eq!(decode_value(json!("{broken")), json!("{broken"));
        assert_eq!(decode_value(json!(3)), json!(3));
        assert_eq!(decode_value(json!(true)), json!(true));
    }

    #[test]
    fn coerces_address_fields_to_strings() {
        let mut properties = props(json!({
            "address": "Saulėtekio al. 9",
            "unit": 12,
            "postal_code": 10222.0,
            "postal_code_ext": null,
        }));
        coerce_address_fields(&mut properties);
        assert_eq!(
            JsonValue::Object(properties),
            json!({
                "address": "Saulėtekio al. 9",
                "unit": "12",
                "postal_code": "10222.0",
                "postal_code_ext": null,
                "postal_code_vanity": null,
            })
        );
    }

    #[test]
    fn decodes_name_fields_and_tolerates_plain_strings() {
        let mut properties = props(json!({
            "name": "{\"lt\": \"Kavinė\", \"en\": \"Cafe\"}",
            "alt_name": "{}",
            "short_name": "Cafe",
        }));
        decode_name_fields(&mut properties);
        assert_eq!(properties["name"], json!({"lt": "Kavinė", "en": "Cafe"}));
        assert_eq!(properties["alt_name"], JsonValue::Null);
        assert_eq!(properties["short_name"], json!("Cafe"));
    }

    #[test]
    fn other_fields_skip_names_and_addresses() {
        let mut properties = props(json!({
            "name": "{a,b}",
            "unit": "{1}",
            "restriction": "{employeesonly}",
            "accessibility": "{}",
        }));
        decode_other_fields(&mut properties);
        assert_eq!(properties["name"], json!("{a,b}"));
        assert_eq!(properties["unit"], json!("{1}"));
        assert_eq!(properties["restriction"], json!(["employeesonly"]));
        assert_eq!(properties["accessibility"], JsonValue::Null);
    }

    #[test]
    fn display_point_is_lon_lat() {
        let mut properties = props(json!({"display_point": "54.6872, 25.2797"}));
        derive_display_point(&mut properties);
        assert_eq!(
            properties["display_point"],
            json!({"type": "Point", "coordinates": [25.2797, 54.6872]})
        );
    }

    #[test]
    fn unparseable_display_point_is_kept() {
        for raw in ["54.6872", "north, east", "1, 2, 3"] {
            let mut properties = props(json!({ "display_point": raw }));
            derive_display_point(&mut properties);
            assert_eq!(properties["display_point"], json!(raw));
        }
    }

    #[test]
    fn truthiness() {
        for value in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&value), "{value} should be falsy");
        }
        for value in [json!(true), json!(1), json!("x"), json!(["x"]), json!({"a": 1})] {
            assert!(is_truthy(&value), "{value} should be truthy");
        }
    }
}
