//! Table-level access used by the export pipeline.

use crate::error::Result;
use crate::geojson::geometry_to_geojson;
use crate::gpkg::{Gpkg, GpkgFeature, GpkgLayer};
use crate::types::{ColumnType, Value};
use serde_json::{Map, Value as JsonValue};

/// A stored row, as handed to the export pipeline.
///
/// Properties keep the table's column order. The geometry, when the table
/// has one, is already rendered as a GeoJSON geometry object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub fid: i64,
    pub geometry: Option<JsonValue>,
    pub properties: Map<String, JsonValue>,
}

impl RawRecord {
    pub fn new(fid: i64, properties: Map<String, JsonValue>) -> Self {
        Self {
            fid,
            geometry: None,
            properties,
        }
    }

    pub fn with_geometry(mut self, geometry: JsonValue) -> Self {
        self.geometry = Some(geometry);
        self
    }

    fn from_feature(layer: &GpkgLayer<'_>, feature: GpkgFeature) -> Result<Self> {
        let fid = feature.id();
        let geometry = feature
            .geometry()?
            .map(|wkb| geometry_to_geojson(&wkb));

        let properties = layer
            .property_columns
            .iter()
            .zip(feature.into_properties())
            .map(|(spec, value)| {
                let value = value_to_json(value, spec.column_type, &layer.layer_name, &spec.name);
                (spec.name.clone(), value)
            })
            .collect();

        Ok(Self {
            fid,
            geometry,
            properties,
        })
    }
}

/// Reads whole tables out of a relational store.
pub trait TableReader {
    /// Names of the tables the store exposes.
    fn list_tables(&self) -> Result<Vec<String>>;

    /// Every row of `table`, in natural storage order.
    fn read_table(&self, table: &str) -> Result<Vec<RawRecord>>;
}

impl TableReader for Gpkg {
    fn list_tables(&self) -> Result<Vec<String>> {
        self.list_layers()
    }

    fn read_table(&self, table: &str) -> Result<Vec<RawRecord>> {
        let layer = self.open_layer(table)?;
        layer
            .features()?
            .into_iter()
            .map(|feature| RawRecord::from_feature(&layer, feature))
            .collect()
    }
}

/// Convert a stored SQLite value to JSON, using the declared column type
/// where SQLite's storage class loses information (booleans).
pub(crate) fn value_to_json(
    value: Value,
    column_type: ColumnType,
    table: &str,
    column: &str,
) -> JsonValue {
    match (value, column_type) {
        (Value::Null, _) => JsonValue::Null,
        (Value::Integer(value), ColumnType::Boolean) => JsonValue::Bool(value != 0),
        (Value::Integer(value), _) => JsonValue::from(value),
        (Value::Real(value), _) => serde_json::Number::from_f64(value)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        (Value::Text(value), _) => JsonValue::String(value),
        (Value::Blob(bytes), _) => {
            tracing::warn!(
                table,
                column,
                len = bytes.len(),
                "binary attribute values are not exported"
            );
            JsonValue::Null
        }
    }
}
