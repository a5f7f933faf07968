//! Junction-table resolution.
//!
//! Many-to-many references are stored in junction tables that pair an
//! "own id" column with a back-reference to the owning feature. For export
//! every configured junction field of a feature is turned into the list of
//! own ids whose back-reference equals the feature id, or `null` when no row
//! matches.

use crate::error::{ImdfError, Result};
use crate::reader::TableReader;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};

/// Where a derived field's values come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JunctionField {
    pub table: String,
    /// Column holding the ids that end up in the output list.
    #[serde(rename = "id")]
    pub id_column: String,
    /// Column holding the id of the feature being resolved.
    #[serde(rename = "ref")]
    pub ref_column: String,
}

impl JunctionField {
    pub fn new(table: &str, id_column: &str, ref_column: &str) -> Self {
        Self {
            table: table.to_string(),
            id_column: id_column.to_string(),
            ref_column: ref_column.to_string(),
        }
    }
}

/// Feature type -> derived field name -> junction field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JunctionRegistry(BTreeMap<String, BTreeMap<String, JunctionField>>);

impl JunctionRegistry {
    /// The junction layout of an IMDF GeoPackage.
    pub fn imdf() -> Self {
        let mut registry = Self::default();
        registry.insert(
            "level",
            "building_ids",
            JunctionField::new("level_building", "building_id", "level_id"),
        );
        registry.insert(
            "footprint",
            "building_ids",
            JunctionField::new("footprint_building", "building_id", "footprint_id"),
        );
        registry.insert(
            "geofence",
            "building_ids",
            JunctionField::new("geofence_building", "building_id", "geofence_id"),
        );
        registry.insert(
            "geofence",
            "level_ids",
            JunctionField::new("geofence_level", "level_id", "geofence_id"),
        );
        registry.insert(
            "geofence",
            "parents",
            JunctionField::new("geofence_parent", "parent_id", "child_id"),
        );
        registry.insert(
            "section",
            "parents",
            JunctionField::new("section_parent", "parent_id", "child_id"),
        );
        registry.insert(
            "amenity",
            "unit_ids",
            JunctionField::new("amenity_unit", "unit_id", "amenity_id"),
        );
        registry.insert(
            "relationship",
            "opening_ids",
            JunctionField::new("relationship_opening", "opening_id", "relationship_id"),
        );
        registry.insert(
            "relationship",
            "unit_ids",
            JunctionField::new("relationship_unit", "unit_id", "relationship_id"),
        );
        registry
    }

    /// Register a derived field, replacing any previous one of the same name.
    pub fn insert(&mut self, feature_type: &str, field: &str, junction: JunctionField) {
        self.0
            .entry(feature_type.to_string())
            .or_default()
            .insert(field.to_string(), junction);
    }

    /// Derived fields of a feature type, in field name order.
    pub fn fields(&self, feature_type: &str) -> Option<&BTreeMap<String, JunctionField>> {
        self.0.get(feature_type)
    }

    /// Names of every junction table the registry reads.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.0
            .values()
            .flat_map(|fields| fields.values())
            .map(|junction| junction.table.as_str())
    }
}

// back-reference -> own ids, in table order
type JunctionIndex = HashMap<String, Vec<String>>;

/// Resolves derived junction fields, reading each junction table at most
/// once per resolver.
pub struct JunctionResolver<'a, R: TableReader + ?Sized> {
    registry: &'a JunctionRegistry,
    reader: &'a R,
    // `None` marks a junction that failed to load; its fields stay null.
    indexes: HashMap<JunctionField, Option<JunctionIndex>>,
}

impl<'a, R: TableReader + ?Sized> JunctionResolver<'a, R> {
    pub fn new(registry: &'a JunctionRegistry, reader: &'a R) -> Self {
        Self {
            registry,
            reader,
            indexes: HashMap::new(),
        }
    }

    /// Every derived field of `feature_type` for the feature `feature_id`.
    ///
    /// The result holds one entry per configured field: a list of ids as
    /// strings, or `null` when nothing matched or the junction table could
    /// not be read. Unconfigured feature types get an empty map.
    pub fn resolve(&mut self, feature_type: &str, feature_id: &JsonValue) -> Map<String, JsonValue> {
        let mut resolved = Map::new();
        let registry = self.registry;
        let Some(fields) = registry.fields(feature_type) else {
            return resolved;
        };

        let key = canonical_id(feature_id);
        for (field, junction) in fields {
            let ids = match (&key, self.index(junction)) {
                (Some(key), Some(index)) => index.get(key),
                _ => None,
            };
            let value = match ids {
                Some(ids) if !ids.is_empty() => {
                    tracing::debug!(
                        table = junction.table.as_str(),
                        field = field.as_str(),
                        count = ids.len(),
                        "resolved junction ids"
                    );
                    JsonValue::Array(ids.iter().cloned().map(JsonValue::String).collect())
                }
                _ => JsonValue::Null,
            };
            resolved.insert(field.clone(), value);
        }
        resolved
    }

    fn index(&mut self, junction: &JunctionField) -> Option<&JunctionIndex> {
        if !self.indexes.contains_key(junction) {
            let index = match build_index(self.reader, junction) {
                Ok(index) => Some(index),
                Err(e) => {
                    tracing::warn!(
                        table = junction.table.as_str(),
                        "failed to read junction table, its fields will be null: {e}"
                    );
                    None
                }
            };
            self.indexes.insert(junction.clone(), index);
        }
        self.indexes.get(junction).and_then(Option::as_ref)
    }
}

fn build_index<R: TableReader + ?Sized>(reader: &R, junction: &JunctionField) -> Result<JunctionIndex> {
    let mut index = JunctionIndex::new();
    for record in reader.read_table(&junction.table)? {
        let column = |name: &str| {
            record
                .properties
                .get(name)
                .ok_or_else(|| ImdfError::MissingColumn {
                    table: junction.table.clone(),
                    column: name.to_string(),
                })
        };
        let back_reference = column(&junction.ref_column)?;
        let own_id = column(&junction.id_column)?;

        if let (Some(back_reference), Some(own_id)) =
            (canonical_id(back_reference), canonical_id(own_id))
        {
            index.entry(back_reference).or_default().push(own_id);
        }
    }
    Ok(index)
}

/// The string form ids are compared in. `null` has none and never matches.
pub(crate) fn canonical_id(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{JunctionField, JunctionRegistry, JunctionResolver, canonical_id};
    use crate::Result;
    use crate::error::ImdfError;
    use crate::reader::{RawRecord, TableReader};
    use serde_json::{Map, Value as JsonValue, json};
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryReader {
        tables: HashMap<String, Vec<JsonValue>>,
        reads: RefCell<Vec<String>>,
    }

    impl MemoryReader {
        fn with_table(mut self, name: &str, rows: JsonValue) -> Self {
            let rows = rows.as_array().cloned().unwrap_or_default();
            self.tables.insert(name.to_string(), rows);
            self
        }
    }

    impl TableReader for MemoryReader {
        fn list_tables(&self) -> Result<Vec<String>> {
            Ok(self.tables.keys().cloned().collect())
        }

        fn read_table(&self, table: &str) -> Result<Vec<RawRecord>> {
            self.reads.borrow_mut().push(table.to_string());
            let rows = self.tables.get(table).ok_or_else(|| ImdfError::MissingTable {
                table: table.to_string(),
            })?;
            Ok(rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    let properties: Map<String, JsonValue> =
                        row.as_object().cloned().unwrap_or_default();
                    RawRecord::new(i as i64 + 1, properties)
                })
                .collect())
        }
    }

    #[test]
    fn resolves_ids_in_table_order() {
        let reader = MemoryReader::default().with_table(
            "geofence_level",
            json!([
                {"level_id": "L2", "geofence_id": "G1"},
                {"level_id": "L9", "geofence_id": "G2"},
                {"level_id": "L1", "geofence_id": "G1"},
            ]),
        )
        .with_table("geofence_building", json!([]))
        .with_table(
            "geofence_parent",
            json!([{"parent_id": "G0", "child_id": "G1"}]),
        );
        let registry = JunctionRegistry::imdf();
        let mut resolver = JunctionResolver::new(&registry, &reader);

        let resolved = resolver.resolve("geofence", &json!("G1"));
        assert_eq!(
            JsonValue::Object(resolved),
            json!({
                "building_ids": null,
                "level_ids": ["L2", "L1"],
                "parents": ["G0"],
            })
        );
    }

    #[test]
    fn unconfigured_types_resolve_to_nothing() {
        let reader = MemoryReader::default();
        let registry = JunctionRegistry::imdf();
        let mut resolver = JunctionResolver::new(&registry, &reader);
        assert!(resolver.resolve("unit", &json!("U1")).is_empty());
        assert!(reader.reads.borrow().is_empty());
    }

    #[test]
    fn missing_table_yields_null_fields_and_is_read_once() {
        let reader = MemoryReader::default();
        let registry = JunctionRegistry::imdf();
        let mut resolver = JunctionResolver::new(&registry, &reader);

        for id in ["A1", "A2"] {
            let resolved = resolver.resolve("amenity", &json!(id));
            assert_eq!(JsonValue::Object(resolved), json!({"unit_ids": null}));
        }
        assert_eq!(reader.reads.borrow().as_slice(), ["amenity_unit"]);
    }

    #[test]
    fn missing_column_yields_null_fields() {
        let reader = MemoryReader::default().with_table(
            "amenity_unit",
            json!([{"unit": "U1", "amenity_id": "A1"}]),
        );
        let registry = JunctionRegistry::imdf();
        let mut resolver = JunctionResolver::new(&registry, &reader);
        let resolved = resolver.resolve("amenity", &json!("A1"));
        assert_eq!(resolved.get("unit_ids"), Some(&JsonValue::Null));
    }

    #[test]
    fn compares_ids_in_canonical_string_form() {
        let reader = MemoryReader::default().with_table(
            "level_building",
            json!([
                {"building_id": 7, "level_id": "12"},
                {"building_id": "B8", "level_id": 12},
                {"building_id": "B9", "level_id": null},
            ]),
        );
        let registry = JunctionRegistry::imdf();
        let mut resolver = JunctionResolver::new(&registry, &reader);

        let resolved = resolver.resolve("level", &json!(12));
        assert_eq!(resolved.get("building_ids"), Some(&json!(["7", "B8"])));

        let resolved = resolver.resolve("level", &JsonValue::Null);
        assert_eq!(resolved.get("building_ids"), Some(&JsonValue::Null));
    }

    #[test]
    fn canonical_id_forms() {
        assert_eq!(canonical_id(&json!("U1")), Some("U1".to_string()));
        assert_eq!(canonical_id(&json!(42)), Some("42".to_string()));
        assert_eq!(canonical_id(&json!(1.5)), Some("1.5".to_string()));
        assert_eq!(canonical_id(&JsonValue::Null), None);
    }

    #[test]
    fn registry_deserializes_from_toml() {
        let registry: JunctionRegistry = toml::from_str(
            r#"
            [kiosk.anchor_ids]
            table = "kiosk_anchor"
            id = "anchor_id"
            ref = "kiosk_id"
            "#,
        )
        .expect("registry");
        let fields = registry.fields("kiosk").expect("kiosk fields");
        assert_eq!(
            fields.get("anchor_ids"),
            Some(&JunctionField::new("kiosk_anchor", "anchor_id", "kiosk_id"))
        );
        assert_eq!(registry.tables().collect::<Vec<_>>(), vec!["kiosk_anchor"]);
    }
}
