//! Static schema of an IMDF GeoPackage and the tools to create one.
//!
//! The container holds one table per IMDF feature type, one table per
//! many-to-many junction and one `{code, value}` table per enumerated
//! domain. Domains can additionally be registered as enum constraints in
//! the GeoPackage schema extension (`gpkg_data_column_constraints` bound via
//! `gpkg_data_columns`).

use crate::error::{ImdfError, Result};
use crate::gpkg::Gpkg;
use crate::ogc_sql::{
    SQL_BIND_DATA_COLUMN_CONSTRAINT, SQL_INSERT_ENUM_CONSTRAINT, initialize_schema_extension,
};
use crate::types::ColumnType::{self, Boolean, DateTime, Integer, Varchar};
use crate::types::{ColumnSpec, Value};
use serde::Deserialize;
use std::path::Path;
use wkb::reader::GeometryType;

/// Name of the geometry column of every spatial layer.
pub const GEOMETRY_COLUMN: &str = "geom";
/// IMDF geometries are always WGS 84.
pub const SRS_ID: u32 = 4326;

/// What a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Feature,
    Junction,
    Domain,
}

/// One column of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub not_null: bool,
}

const fn required(name: &'static str, column_type: ColumnType) -> Attribute {
    Attribute {
        name,
        column_type,
        not_null: true,
    }
}

const fn optional(name: &'static str, column_type: ColumnType) -> Attribute {
    Attribute {
        name,
        column_type,
        not_null: false,
    }
}

/// One table of the container.
#[derive(Debug, Clone, Copy)]
pub struct LayerDef {
    pub name: &'static str,
    pub kind: LayerKind,
    pub geometry: Option<GeometryType>,
    pub attributes: &'static [Attribute],
}

impl LayerDef {
    pub fn column_specs(&self) -> Vec<ColumnSpec> {
        self.attributes
            .iter()
            .map(|attribute| {
                let spec = ColumnSpec::new(attribute.name, attribute.column_type);
                if attribute.not_null { spec.required() } else { spec }
            })
            .collect()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }
}

const fn feature(
    name: &'static str,
    geometry: Option<GeometryType>,
    attributes: &'static [Attribute],
) -> LayerDef {
    LayerDef {
        name,
        kind: LayerKind::Feature,
        geometry,
        attributes,
    }
}

const fn junction(name: &'static str, attributes: &'static [Attribute]) -> LayerDef {
    LayerDef {
        name,
        kind: LayerKind::Junction,
        geometry: None,
        attributes,
    }
}

const DOMAIN_ATTRIBUTES: &[Attribute] = &[required("code", Varchar), required("value", Varchar)];

const fn domain(name: &'static str) -> LayerDef {
    LayerDef {
        name,
        kind: LayerKind::Domain,
        geometry: None,
        attributes: DOMAIN_ATTRIBUTES,
    }
}

// Localized names are stored as JSON text.
pub const LAYERS: &[LayerDef] = &[
    domain("accessibility_domain"),
    domain("access_control_domain"),
    feature(
        "address",
        None,
        &[
            required("id", Varchar),
            required("address", Varchar),
            optional("unit", Varchar),
            required("locality", Varchar),
            optional("province", Varchar),
            required("country", Varchar),
            optional("postal_code", Varchar),
            optional("postal_code_ext", Varchar),
            optional("postal_code_vanity", Varchar),
        ],
    ),
    feature(
        "venue",
        Some(GeometryType::MultiPolygon),
        &[
            required("id", Varchar),
            required("category", Varchar),
            optional("restriction", Varchar),
            required("name", Varchar),
            optional("alt_name", Varchar),
            optional("hours", Varchar),
            optional("phone", Varchar),
            optional("website", Varchar),
            required("display_point", Varchar),
            required("address_id", Varchar),
        ],
    ),
    feature(
        "amenity",
        Some(GeometryType::Point),
        &[
            required("id", Varchar),
            required("category", Varchar),
            optional("accessibility", Varchar),
            required("name", Varchar),
            optional("alt_name", Varchar),
            optional("hours", Varchar),
            optional("phone", Varchar),
            optional("website", Varchar),
            optional("address_id", Varchar),
            optional("correlation_id", Varchar),
        ],
    ),
    feature(
        "anchor",
        Some(GeometryType::Point),
        &[
            required("id", Varchar),
            optional("address_id", Varchar),
            required("unit_id", Varchar),
        ],
    ),
    feature(
        "building",
        None,
        &[
            required("id", Varchar),
            required("name", Varchar),
            optional("alt_name", Varchar),
            required("category", Varchar),
            optional("restriction", Varchar),
            optional("display_point", Varchar),
            optional("address_id", Varchar),
        ],
    ),
    feature(
        "detail",
        Some(GeometryType::MultiLineString),
        &[
            required("id", Varchar),
            required("level_id", Varchar),
        ],
    ),
    feature(
        "fixture",
        Some(GeometryType::Polygon),
        &[
            required("id", Varchar),
            required("category", Varchar),
            required("name", Varchar),
            optional("alt_name", Varchar),
            optional("anchor_id", Varchar),
            required("level_id", Varchar),
            optional("display_point", Varchar),
        ],
    ),
    feature(
        "footprint",
        Some(GeometryType::MultiPolygon),
        &[
            required("id", Varchar),
            required("category", Varchar),
            required("name", Varchar),
        ],
    ),
    feature(
        "geofence",
        Some(GeometryType::Polygon),
        &[
            required("id", Varchar),
            required("category", Varchar),
            optional("restriction", Varchar),
            required("name", Varchar),
            optional("alt_name", Varchar),
            optional("correlation_id", Varchar),
            optional("display_point", Varchar),
        ],
    ),
    feature(
        "kiosk",
        Some(GeometryType::Polygon),
        &[
            required("id", Varchar),
            required("name", Varchar),
            optional("alt_name", Varchar),
            optional("anchor_id", Varchar),
            required("level_id", Varchar),
            optional("display_point", Varchar),
        ],
    ),
    feature(
        "level",
        Some(GeometryType::MultiPolygon),
        &[
            required("id", Varchar),
            required("category", Varchar),
            optional("restriction", Varchar),
            required("outdoor", Boolean),
            required("ordinal", Integer),
            required("name", Varchar),
            required("short_name", Varchar),
            optional("display_point", Varchar),
            optional("address_id", Varchar),
        ],
    ),
    feature(
        "occupant",
        None,
        &[
            required("id", Varchar),
            required("name", Varchar),
            required("category", Varchar),
            required("anchor_id", Varchar),
            optional("hours", Varchar),
            optional("phone", Varchar),
            optional("website", Varchar),
            optional("start", DateTime),
            optional("end", DateTime),
            optional("modified", DateTime),
            optional("correlation_id", Varchar),
        ],
    ),
    feature(
        "opening",
        Some(GeometryType::LineString),
        &[
            required("id", Varchar),
            required("category", Varchar),
            optional("accessibility", Varchar),
            optional("access_control", Varchar),
            optional("type", Varchar),
            optional("automatic", Boolean),
            optional("material", Varchar),
            required("name", Varchar),
            optional("alt_name", Varchar),
            optional("display_point", Varchar),
            required("level_id", Varchar),
        ],
    ),
    feature(
        "relationship",
        None,
        &[
            required("id", Varchar),
            required("category", Varchar),
            required("direction", Varchar),
            optional("origin_type", Varchar),
            optional("origin_unit_id", Varchar),
            optional("origin_opening_id", Varchar),
            optional("intermediary_type", Varchar),
            optional("destination_type", Varchar),
            optional("destination_unit_id", Varchar),
            optional("destination_opening_id", Varchar),
            optional("hours", Varchar),
        ],
    ),
    feature(
        "section",
        Some(GeometryType::Polygon),
        &[
            required("id", Varchar),
            required("category", Varchar),
            optional("restriction", Varchar),
            optional("accessibility", Varchar),
            required("name", Varchar),
            optional("alt_name", Varchar),
            optional("display_point", Varchar),
            required("level_id", Varchar),
            optional("address_id", Varchar),
            optional("correlation_id", Varchar),
        ],
    ),
    feature(
        "unit",
        Some(GeometryType::Polygon),
        &[
            required("id", Varchar),
            required("category", Varchar),
            optional("restriction", Varchar),
            optional("accessibility", Varchar),
            required("name", Varchar),
            optional("alt_name", Varchar),
            required("level_id", Varchar),
            optional("display_point", Varchar),
        ],
    ),
    junction(
        "geofence_level",
        &[
            required("id", Varchar),
            required("geofence_id", Varchar),
            required("level_id", Varchar),
        ],
    ),
    junction(
        "level_building",
        &[
            required("id", Varchar),
            required("level_id", Varchar),
            required("building_id", Varchar),
        ],
    ),
    junction(
        "geofence_building",
        &[
            required("id", Varchar),
            required("geofence_id", Varchar),
            required("building_id", Varchar),
        ],
    ),
    junction(
        "footprint_building",
        &[
            required("id", Varchar),
            required("footprint_id", Varchar),
            required("building_id", Varchar),
        ],
    ),
    junction(
        "relationship_opening",
        &[
            required("id", Varchar),
            required("relationship_id", Varchar),
            required("opening_id", Varchar),
        ],
    ),
    junction(
        "relationship_unit",
        &[
            required("id", Varchar),
            required("relationship_id", Varchar),
            required("unit_id", Varchar),
        ],
    ),
    junction(
        "geofence_parent",
        &[
            required("id", Varchar),
            required("parent_id", Varchar),
            required("child_id", Varchar),
        ],
    ),
    junction(
        "section_parent",
        &[
            required("id", Varchar),
            required("parent_id", Varchar),
            required("child_id", Varchar),
        ],
    ),
    junction(
        "amenity_unit",
        &[
            required("id", Varchar),
            required("amenity_id", Varchar),
            required("unit_id", Varchar),
        ],
    ),
];

/// Feature attributes constrained by a domain table.
pub const DOMAIN_FIELDS: &[(&str, &str)] = &[
    ("accessibility", "accessibility_domain"),
    ("access_control", "access_control_domain"),
];

pub fn layer(name: &str) -> Option<&'static LayerDef> {
    LAYERS.iter().find(|def| def.name == name)
}

/// Tables that never hold exportable features.
pub fn non_feature_layers() -> impl Iterator<Item = &'static str> {
    LAYERS
        .iter()
        .filter(|def| def.kind != LayerKind::Feature)
        .map(|def| def.name)
}

/// Create a new GeoPackage at `path` holding every table of [`LAYERS`].
pub fn create_container<P: AsRef<Path>>(path: P) -> Result<Gpkg> {
    let gpkg = Gpkg::new(path)?;
    create_schema(&gpkg)?;
    Ok(gpkg)
}

/// Create every table of [`LAYERS`] in an existing GeoPackage.
pub fn create_schema(gpkg: &Gpkg) -> Result<()> {
    for def in LAYERS {
        let columns = def.column_specs();
        match def.geometry {
            Some(geometry_type) => {
                gpkg.create_layer(
                    def.name,
                    GEOMETRY_COLUMN,
                    geometry_type,
                    wkb::reader::Dimension::Xy,
                    SRS_ID,
                    &columns,
                )?;
            }
            None => {
                gpkg.create_attribute_table(def.name, &columns)?;
            }
        }
        tracing::debug!(layer = def.name, "created table");
    }
    initialize_schema_extension(gpkg.connection())?;
    Ok(())
}

/// A `{code, value}` pair of an enumerated domain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub struct DomainValue {
    pub code: String,
    pub value: String,
}

impl DomainValue {
    pub fn new(code: &str, value: &str) -> Self {
        Self {
            code: code.to_string(),
            value: value.to_string(),
        }
    }
}

/// Append `values` to the domain table `table`. Returns the number of rows
/// written.
pub fn insert_domain_values(gpkg: &Gpkg, table: &str, values: &[DomainValue]) -> Result<usize> {
    let layer = gpkg.open_layer(table)?;
    for required in ["code", "value"] {
        if !layer.property_columns.iter().any(|spec| spec.name == required) {
            return Err(ImdfError::MissingColumn {
                table: table.to_string(),
                column: required.to_string(),
            });
        }
    }

    for value in values {
        let row = layer.property_columns.iter().map(|spec| match spec.name.as_str() {
            "code" => Value::Text(value.code.clone()),
            "value" => Value::Text(value.value.clone()),
            _ => Value::Null,
        });
        layer.insert_attributes(row)?;
    }
    tracing::info!(table, count = values.len(), "inserted domain values");
    Ok(values.len())
}

/// Register `values` as the enum constraint `constraint_name` and bind it to
/// `table.column`.
///
/// Existing constraint values are kept; an existing binding of the column is
/// replaced.
pub fn add_enum_domain(
    gpkg: &Gpkg,
    constraint_name: &str,
    values: &[DomainValue],
    table: &str,
    column: &str,
) -> Result<()> {
    gpkg.ensure_writable()?;
    let conn = gpkg.connection();
    initialize_schema_extension(conn)?;

    let mut stmt = conn.prepare_cached(SQL_INSERT_ENUM_CONSTRAINT)?;
    for value in values {
        stmt.execute(rusqlite::params![constraint_name, value.code, value.value])?;
    }
    conn.execute(
        SQL_BIND_DATA_COLUMN_CONSTRAINT,
        rusqlite::params![table, column, constraint_name],
    )?;
    tracing::info!(constraint_name, table, column, "bound enum domain");
    Ok(())
}

/// Read `{code, value}` pairs from CSV with a header row.
///
/// Returns `Ok(None)`, after a warning, when the header lacks either column.
/// Other columns are ignored.
pub fn read_domain_csv<R: std::io::Read>(reader: R) -> Result<Option<Vec<DomainValue>>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = reader.headers()?;
    let missing: Vec<&str> = ["code", "value"]
        .into_iter()
        .filter(|name| !headers.iter().any(|header| header == *name))
        .collect();
    if !missing.is_empty() {
        tracing::warn!(?missing, "domain values must have 'code' and 'value' columns, skipping");
        return Ok(None);
    }

    let values = reader
        .deserialize::<DomainValue>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Some(values))
}
