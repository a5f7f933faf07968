use crate::conversions::{
    column_type_from_str, column_type_to_str, dimension_from_zm, dimension_to_zm,
    geometry_type_from_str, geometry_type_to_str,
};
use crate::error::{ImdfError, Result};
use crate::ogc_sql::{
    SQL_INSERT_GPKG_CONTENTS, SQL_INSERT_GPKG_GEOMETRY_COLUMNS, SQL_LIST_LAYERS,
    SQL_SELECT_GEOMETRY_COLUMN_META, SQL_SRS_EXISTS, initialize_gpkg, sql_create_table,
    sql_table_columns,
};
use crate::types::{ColumnSpec, ColumnSpecs, GeometryColumn};
use rusqlite::{OpenFlags, OptionalExtension};
use std::path::Path;

use super::layer::GpkgLayer;

// Layers created by this crate always use this primary key. Tables without a
// declared primary key are read in rowid order instead.
const DEFAULT_PRIMARY_KEY: &str = "fid";
const ROWID: &str = "rowid";

#[derive(Debug)]
/// GeoPackage connection wrapper for reading and writing layers.
pub struct Gpkg {
    conn: rusqlite::Connection,
    read_only: bool,
}

impl Gpkg {
    /// Open a GeoPackage in read-only mode.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImdfError::FileNotFound(path.to_path_buf()));
        }

        let conn = rusqlite::Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self {
            conn,
            read_only: true,
        })
    }

    /// Open an existing GeoPackage in read-write mode.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImdfError::FileNotFound(path.to_path_buf()));
        }

        let conn = rusqlite::Connection::open(path)?;
        Ok(Self {
            conn,
            read_only: false,
        })
    }

    /// Create a new GeoPackage
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(ImdfError::FileExists(path.to_path_buf()));
        }

        let conn = rusqlite::Connection::open(path)?;
        initialize_gpkg(&conn)?;

        Ok(Self {
            conn,
            read_only: false,
        })
    }

    /// Create a new GeoPackage in memory
    pub fn new_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        initialize_gpkg(&conn)?;

        Ok(Self {
            conn,
            read_only: false,
        })
    }

    /// List the names of the feature and attribute tables, in registration order.
    pub fn list_layers(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(SQL_LIST_LAYERS)?;
        let layers = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(layers)
    }

    /// Load a layer definition and metadata by name.
    pub fn open_layer<'a>(&'a self, layer_name: &str) -> Result<GpkgLayer<'a>> {
        let geometry = self.get_geometry_column(layer_name)?;
        let column_specs = self.get_column_specs(layer_name)?;
        let primary_key_column = column_specs
            .primary_key
            .unwrap_or_else(|| ROWID.to_string());
        let property_columns = column_specs
            .other_columns
            .into_iter()
            .filter(|spec| {
                spec.name != primary_key_column
                    && geometry.as_ref().is_none_or(|g| g.name != spec.name)
            })
            .collect();

        Ok(GpkgLayer::new(
            self,
            layer_name,
            primary_key_column,
            geometry,
            property_columns,
        ))
    }

    /// Create a new feature layer with a geometry column.
    pub fn create_layer<'a>(
        &'a self,
        layer_name: &str,
        geometry_column: &str,
        geometry_type: wkb::reader::GeometryType,
        geometry_dimension: wkb::reader::Dimension,
        srs_id: u32,
        other_column_specs: &[ColumnSpec],
    ) -> Result<GpkgLayer<'a>> {
        self.ensure_new_layer(layer_name)?;

        let srs_exists: i64 =
            self.conn
                .query_row(SQL_SRS_EXISTS, rusqlite::params![srs_id], |row| row.get(0))?;
        if srs_exists == 0 {
            return Err(ImdfError::MissingSpatialRefSysId { srs_id });
        }

        let (z, m) = dimension_to_zm(geometry_dimension);
        let mut column_defs = Vec::with_capacity(other_column_specs.len() + 2);
        column_defs.push(format!("{DEFAULT_PRIMARY_KEY} INTEGER PRIMARY KEY AUTOINCREMENT"));
        column_defs.push(format!(
            r#""{}" {}"#,
            geometry_column,
            geometry_type_to_str(geometry_type)
        ));
        column_defs.extend(column_definitions(other_column_specs));

        self.conn
            .execute_batch(&sql_create_table(layer_name, &column_defs.join(", ")))?;
        self.conn.execute(
            SQL_INSERT_GPKG_CONTENTS,
            rusqlite::params![layer_name, "features", layer_name, srs_id],
        )?;
        self.conn.execute(
            SQL_INSERT_GPKG_GEOMETRY_COLUMNS,
            rusqlite::params![
                layer_name,
                geometry_column,
                geometry_type_to_str(geometry_type),
                srs_id,
                z,
                m
            ],
        )?;

        let geometry = GeometryColumn {
            name: geometry_column.to_string(),
            geometry_type,
            dimension: geometry_dimension,
            srs_id,
        };

        Ok(GpkgLayer::new(
            self,
            layer_name,
            DEFAULT_PRIMARY_KEY.to_string(),
            Some(geometry),
            other_column_specs.to_vec(),
        ))
    }

    /// Create a new attribute table (a layer without geometry).
    pub fn create_attribute_table<'a>(
        &'a self,
        table_name: &str,
        column_specs: &[ColumnSpec],
    ) -> Result<GpkgLayer<'a>> {
        self.ensure_new_layer(table_name)?;

        let mut column_defs = Vec::with_capacity(column_specs.len() + 1);
        column_defs.push(format!("{DEFAULT_PRIMARY_KEY} INTEGER PRIMARY KEY AUTOINCREMENT"));
        column_defs.extend(column_definitions(column_specs));

        self.conn
            .execute_batch(&sql_create_table(table_name, &column_defs.join(", ")))?;
        self.conn.execute(
            SQL_INSERT_GPKG_CONTENTS,
            rusqlite::params![table_name, "attributes", table_name, Option::<u32>::None],
        )?;

        Ok(GpkgLayer::new(
            self,
            table_name,
            DEFAULT_PRIMARY_KEY.to_string(),
            None,
            column_specs.to_vec(),
        ))
    }

    pub(crate) fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(ImdfError::ReadOnly);
        }
        Ok(())
    }

    fn ensure_new_layer(&self, layer_name: &str) -> Result<()> {
        self.ensure_writable()?;
        if self.list_layers()?.iter().any(|name| name == layer_name) {
            return Err(ImdfError::LayerAlreadyExists {
                layer_name: layer_name.to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the table columns and map SQLite types.
    pub(crate) fn get_column_specs(&self, layer_name: &str) -> Result<ColumnSpecs> {
        let query = sql_table_columns(layer_name);
        let mut stmt = self.conn.prepare(&query)?;

        let rows = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let column_type_str: String = row.get(1)?;
                let primary_key: i32 = row.get(2)?;
                let not_null: i32 = row.get(3)?;
                Ok((name, column_type_str, primary_key != 0, not_null != 0))
            })?
            .collect::<std::result::Result<Vec<(String, String, bool, bool)>, _>>()?;

        // pragma_table_info() yields nothing for unknown tables
        if rows.is_empty() {
            return Err(ImdfError::MissingTable {
                table: layer_name.to_string(),
            });
        }

        let mut primary_key: Option<String> = None;
        let mut other_columns = Vec::with_capacity(rows.len());
        for (name, column_type_str, is_primary_key, not_null) in rows {
            // cf. https://www.geopackage.org/spec140/index.html#_sqlite_container
            let column_type = column_type_from_str(&column_type_str).ok_or_else(|| {
                ImdfError::UnsupportedColumnType {
                    column: name.clone(),
                    declared_type: column_type_str.clone(),
                }
            })?;

            if is_primary_key {
                if primary_key.is_some() {
                    return Err(ImdfError::CompositePrimaryKeyUnsupported {
                        layer_name: layer_name.to_string(),
                    });
                }
                primary_key = Some(name.clone());
            }
            other_columns.push(ColumnSpec {
                name,
                column_type,
                not_null,
            });
        }

        Ok(ColumnSpecs {
            primary_key,
            other_columns,
        })
    }

    /// Resolve the geometry column metadata for a layer, if it has one.
    pub(crate) fn get_geometry_column(&self, layer_name: &str) -> Result<Option<GeometryColumn>> {
        let mut stmt = self.conn.prepare(SQL_SELECT_GEOMETRY_COLUMN_META)?;

        let meta = stmt
            .query_row([layer_name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i8>(2)?,
                    row.get::<_, i8>(3)?,
                    row.get::<_, u32>(4)?,
                ))
            })
            .optional()?;

        let Some((name, geometry_type_str, z, m, srs_id)) = meta else {
            return Ok(None);
        };

        Ok(Some(GeometryColumn {
            name,
            geometry_type: geometry_type_from_str(&geometry_type_str)?,
            dimension: dimension_from_zm(z, m)?,
            srs_id,
        }))
    }
}

fn column_definitions(column_specs: &[ColumnSpec]) -> impl Iterator<Item = String> + '_ {
    column_specs
        .iter()
        .map(|spec| {
            let not_null = if spec.not_null { " NOT NULL" } else { "" };
            format!(
                r#""{}" {}{not_null}"#,
                spec.name,
                column_type_to_str(spec.column_type)
            )
        })
}

#[cfg(test)]
mod tests {
    use super::Gpkg;
    use crate::error::ImdfError;
    use crate::types::{ColumnSpec, ColumnType};

    #[test]
    fn create_layer_requires_existing_srs() {
        let gpkg = Gpkg::new_in_memory().expect("new gpkg");
        let columns: Vec<ColumnSpec> = Vec::new();
        let err = gpkg
            .create_layer(
                "missing_srs",
                "geom",
                wkb::reader::GeometryType::Point,
                wkb::reader::Dimension::Xy,
                9999,
                &columns,
            )
            .expect_err("missing srs should fail");

        assert!(matches!(
            err,
            ImdfError::MissingSpatialRefSysId { srs_id: 9999 }
        ));
    }

    #[test]
    fn create_rejects_duplicate_layer() {
        let gpkg = Gpkg::new_in_memory().expect("new gpkg");
        let columns = vec![ColumnSpec::new("id", ColumnType::Varchar)];
        gpkg.create_attribute_table("address", &columns)
            .expect("first table");
        let err = gpkg
            .create_attribute_table("address", &columns)
            .expect_err("duplicate should fail");
        assert!(matches!(err, ImdfError::LayerAlreadyExists { .. }));
    }

    #[test]
    fn new_fails_if_file_exists() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let err = Gpkg::new(file.path()).expect_err("existing file should fail");
        assert!(matches!(err, ImdfError::FileExists(_)));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn open_fails_if_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing.gpkg");

        let err = Gpkg::open(&path).expect_err("missing file should fail");
        assert!(err.to_string().contains("does not exist"));
        let err = Gpkg::open_read_only(&path).expect_err("missing file should fail");
        assert!(matches!(err, ImdfError::FileNotFound(_)));
    }

    #[test]
    fn open_layer_reports_missing_table() {
        let gpkg = Gpkg::new_in_memory().expect("new gpkg");
        let err = gpkg.open_layer("venue").expect_err("no such table");
        assert!(matches!(err, ImdfError::MissingTable { table } if table == "venue"));
    }

    #[test]
    fn read_only_rejects_layer_creation() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("imdf.gpkg");
        drop(Gpkg::new(&path).expect("create gpkg"));

        let gpkg = Gpkg::open_read_only(&path).expect("open read-only gpkg");
        let err = gpkg
            .create_attribute_table("address", &[])
            .expect_err("read-only should fail");
        assert!(matches!(err, ImdfError::ReadOnly));
    }

    #[test]
    fn lists_feature_and_attribute_tables_in_creation_order() {
        let gpkg = Gpkg::new_in_memory().expect("new gpkg");
        let columns = vec![ColumnSpec::new("id", ColumnType::Varchar)];
        gpkg.create_layer(
            "venue",
            "geom",
            wkb::reader::GeometryType::MultiPolygon,
            wkb::reader::Dimension::Xy,
            4326,
            &columns,
        )
        .expect("venue");
        gpkg.create_attribute_table("address", &columns)
            .expect("address");

        assert_eq!(gpkg.list_layers().expect("layers"), vec!["venue", "address"]);

        let venue = gpkg.open_layer("venue").expect("venue layer");
        let geometry = venue.geometry.as_ref().expect("geometry column");
        assert_eq!(geometry.name, "geom");
        assert_eq!(geometry.srs_id, 4326);
        assert_eq!(venue.primary_key_column, "fid");
        assert_eq!(venue.property_columns, columns);

        let address = gpkg.open_layer("address").expect("address layer");
        assert!(address.geometry.is_none());
    }
}
