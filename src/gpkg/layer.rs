use crate::error::{ImdfError, Result};
use crate::ogc_sql::{sql_insert_row, sql_select_rows};
use crate::types::{ColumnSpec, GeometryColumn, Value};
use geo_traits::GeometryTrait;
use rusqlite::params_from_iter;
use std::collections::HashMap;
use std::sync::Arc;
use wkb::reader::Wkb;

use super::{Gpkg, GpkgFeature, wkb_to_gpkg_geometry};

#[derive(Debug)]
/// A GeoPackage table with its optional geometry metadata and column specs.
pub struct GpkgLayer<'a> {
    pub(super) conn: &'a Gpkg,
    pub layer_name: String,
    pub primary_key_column: String,
    pub geometry: Option<GeometryColumn>,
    pub property_columns: Vec<ColumnSpec>,
    pub(super) property_index_by_name: Arc<HashMap<String, usize>>,
}

// The SELECT query always places the primary key first, then the geometry
// column when the layer has one.
const PRIMARY_INDEX: usize = 0;
const GEOMETRY_INDEX: usize = 1;

impl<'a> GpkgLayer<'a> {
    pub(super) fn new(
        conn: &'a Gpkg,
        layer_name: &str,
        primary_key_column: String,
        geometry: Option<GeometryColumn>,
        property_columns: Vec<ColumnSpec>,
    ) -> Self {
        let property_index_by_name = Arc::new(Self::build_property_index_by_name(
            &property_columns,
        ));
        Self {
            conn,
            layer_name: layer_name.to_string(),
            primary_key_column,
            geometry,
            property_columns,
            property_index_by_name,
        }
    }

    /// Read every row of the layer in primary key order.
    ///
    /// The whole table is loaded into memory.
    pub fn features(&self) -> Result<Vec<GpkgFeature>> {
        let geometry_column = self.geometry.as_ref().map(|g| g.name.as_str());
        let sql = sql_select_rows(
            &self.layer_name,
            &self.primary_key_column,
            geometry_column,
            self.property_columns.iter().map(|spec| spec.name.as_str()),
        );
        let first_property = if geometry_column.is_some() {
            GEOMETRY_INDEX + 1
        } else {
            GEOMETRY_INDEX
        };

        let mut stmt = self.conn.connection().prepare(&sql)?;
        let features = stmt
            .query_map([], |row| {
                let id = match row.get_ref(PRIMARY_INDEX)? {
                    rusqlite::types::ValueRef::Integer(value) => value,
                    other => {
                        return Err(rusqlite::Error::InvalidColumnType(
                            PRIMARY_INDEX,
                            self.primary_key_column.clone(),
                            other.data_type(),
                        ));
                    }
                };

                let geometry = match geometry_column {
                    Some(name) => match row.get::<_, Value>(GEOMETRY_INDEX)? {
                        Value::Blob(bytes) => Some(bytes),
                        Value::Null => None,
                        other => {
                            return Err(rusqlite::Error::InvalidColumnType(
                                GEOMETRY_INDEX,
                                name.to_string(),
                                other.data_type(),
                            ));
                        }
                    },
                    None => None,
                };

                let mut properties = Vec::with_capacity(self.property_columns.len());
                for idx in 0..self.property_columns.len() {
                    properties.push(row.get::<_, Value>(first_property + idx)?);
                }

                Ok(GpkgFeature {
                    id,
                    geometry,
                    properties,
                    property_index_by_name: Arc::clone(&self.property_index_by_name),
                })
            })?
            .collect::<std::result::Result<Vec<GpkgFeature>, _>>()?;

        Ok(features)
    }

    /// Insert a feature with geometry and ordered property values.
    ///
    /// Example:
    /// ```no_run
    /// use geo_types::Point;
    /// use imdf_gpkg::{Gpkg, Value};
    ///
    /// let gpkg = Gpkg::open("data/venue.gpkg")?;
    /// let layer = gpkg.open_layer("amenity")?;
    ///
    /// let properties = vec![Value::Text("a1".to_string()), Value::Text("toilets".to_string())];
    /// layer.insert(Point::new(25.2797, 54.6872), properties)?;
    /// # Ok::<(), imdf_gpkg::ImdfError>(())
    /// ```
    pub fn insert<G, P>(&self, geometry: G, properties: P) -> Result<()>
    where
        G: GeometryTrait<T = f64>,
        P: IntoIterator<Item = Value>,
    {
        self.conn.ensure_writable()?;
        let geometry_meta =
            self.geometry
                .as_ref()
                .ok_or_else(|| ImdfError::MissingGeometryColumn {
                    layer_name: self.layer_name.clone(),
                })?;

        let mut buf = Vec::new();
        wkb::writer::write_geometry(&mut buf, &geometry, &Default::default())?;
        let wkb = Wkb::try_new(&buf)?;
        let geom = wkb_to_gpkg_geometry(wkb, geometry_meta.srs_id);

        let sql = Self::build_insert_sql(
            &self.layer_name,
            Some(geometry_meta.name.as_str()),
            &self.property_columns,
        );
        let params = std::iter::once(Value::Blob(geom)).chain(properties);

        let mut stmt = self.conn.connection().prepare_cached(&sql)?;
        stmt.execute(params_from_iter(params))?;
        Ok(())
    }

    /// Insert a row with ordered property values only. On a spatial layer the
    /// geometry is left `NULL`.
    pub fn insert_attributes<P>(&self, properties: P) -> Result<()>
    where
        P: IntoIterator<Item = Value>,
    {
        self.conn.ensure_writable()?;
        let sql = Self::build_insert_sql(&self.layer_name, None, &self.property_columns);

        let mut stmt = self.conn.connection().prepare_cached(&sql)?;
        stmt.execute(params_from_iter(properties))?;
        Ok(())
    }

    pub(crate) fn build_insert_sql(
        layer_name: &str,
        geometry_column: Option<&str>,
        property_columns: &[ColumnSpec],
    ) -> String {
        let mut columns = Vec::with_capacity(property_columns.len() + 1);
        columns.extend(geometry_column.map(|name| format!(r#""{}""#, name)));
        columns.extend(
            property_columns
                .iter()
                .map(|spec| format!(r#""{}""#, spec.name)),
        );

        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<String>>()
            .join(",");

        sql_insert_row(layer_name, &columns.join(","), &placeholders)
    }

    pub(crate) fn build_property_index_by_name(
        property_columns: &[ColumnSpec],
    ) -> HashMap<String, usize> {
        let mut property_index_by_name = HashMap::with_capacity(property_columns.len());
        for (idx, column) in property_columns.iter().enumerate() {
            property_index_by_name.insert(column.name.clone(), idx);
        }
        property_index_by_name
    }
}

#[cfg(test)]
mod tests {
    use crate::Result;
    use crate::error::ImdfError;
    use crate::gpkg::Gpkg;
    use crate::types::{ColumnSpec, ColumnType, Value};
    use geo_types::{LineString, MultiPolygon, Point, Polygon};
    use wkb::reader::GeometryType;

    fn unit_columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("id", ColumnType::Varchar),
            ColumnSpec::new("ordinal", ColumnType::Integer),
        ]
    }

    #[test]
    fn inserts_and_reads_back_rows_in_key_order() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let layer = gpkg.create_layer(
            "level",
            "geom",
            GeometryType::MultiPolygon,
            wkb::reader::Dimension::Xy,
            4326,
            &unit_columns(),
        )?;

        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            vec![],
        );
        layer.insert(
            MultiPolygon::new(vec![square]),
            [Value::from("L0".to_string()), Value::from(0_i64)],
        )?;
        layer.insert_attributes([Value::from("L1".to_string()), Value::from(1_i64)])?;

        let reopened = gpkg.open_layer("level")?;
        let features = reopened.features()?;
        assert_eq!(features.len(), 2);

        let first = &features[0];
        assert_eq!(first.id(), 1);
        assert_eq!(first.property("id"), Some(&Value::Text("L0".to_string())));
        assert_eq!(first.property("ordinal"), Some(&Value::Integer(0)));
        let geom = first.geometry()?.expect("geometry");
        assert_eq!(geom.geometry_type(), GeometryType::MultiPolygon);

        let second = &features[1];
        assert!(second.geometry()?.is_none());
        assert_eq!(second.property("missing"), None);

        Ok(())
    }

    #[test]
    fn reads_attribute_tables_without_geometry() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let columns = vec![
            ColumnSpec::new("amenity_id", ColumnType::Varchar),
            ColumnSpec::new("unit_id", ColumnType::Varchar),
        ];
        let layer = gpkg.create_attribute_table("amenity_unit", &columns)?;
        layer.insert_attributes([Value::from("A1".to_string()), Value::from("U1".to_string())])?;

        let features = gpkg.open_layer("amenity_unit")?.features()?;
        assert_eq!(features.len(), 1);
        assert!(features[0].geometry()?.is_none());
        assert_eq!(
            features[0].clone().into_properties(),
            vec![Value::Text("A1".to_string()), Value::Text("U1".to_string())]
        );

        Ok(())
    }

    #[test]
    fn reads_every_storage_class_as_owned_values() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let columns = vec![
            ColumnSpec::new("id", ColumnType::Varchar),
            ColumnSpec::new("ordinal", ColumnType::Integer),
            ColumnSpec::new("height", ColumnType::Double),
        ];
        let layer = gpkg.create_layer(
            "unit",
            "geom",
            GeometryType::Point,
            wkb::reader::Dimension::Xy,
            4326,
            &columns,
        )?;
        layer.insert(
            Point::new(25.28, 54.68),
            [Value::from("U1".to_string()), Value::Null, Value::Real(3.5)],
        )?;

        let features = gpkg.open_layer("unit")?.features()?;
        assert_eq!(
            features[0].clone().into_properties(),
            vec![Value::Text("U1".to_string()), Value::Null, Value::Real(3.5)]
        );
        assert!(features[0].geometry()?.is_some());
        Ok(())
    }

    #[test]
    fn rejects_geometry_stored_as_text() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        gpkg.create_layer(
            "anchor",
            "geom",
            GeometryType::Point,
            wkb::reader::Dimension::Xy,
            4326,
            &unit_columns(),
        )?;
        gpkg.connection().execute(
            r#"INSERT INTO "anchor" ("geom", "id", "ordinal") VALUES ('POINT (0 0)', 'X', 1)"#,
            [],
        )?;

        let result = gpkg.open_layer("anchor")?.features();
        assert!(matches!(
            result,
            Err(ImdfError::Sql(rusqlite::Error::InvalidColumnType(1, _, _)))
        ));
        Ok(())
    }

    #[test]
    fn insert_requires_geometry_column() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let layer = gpkg.create_attribute_table("address", &unit_columns())?;
        let result = layer.insert(
            Point::new(0.0, 0.0),
            [Value::from("A".to_string()), Value::from(1_i64)],
        );
        assert!(matches!(result, Err(ImdfError::MissingGeometryColumn { .. })));
        Ok(())
    }

    #[test]
    fn rejects_invalid_property_count() -> Result<()> {
        let gpkg = Gpkg::new_in_memory()?;
        let layer = gpkg.create_layer(
            "anchor",
            "geom",
            GeometryType::Point,
            wkb::reader::Dimension::Xy,
            4326,
            &unit_columns(),
        )?;

        let result = layer.insert(Point::new(0.0, 0.0), [Value::from("only".to_string())]);
        match result {
            Err(ImdfError::Sql(rusqlite::Error::InvalidParameterCount(_, _))) => {}
            e => panic!("expected InvalidParameterCount error: {e:?}"),
        }

        Ok(())
    }
}
