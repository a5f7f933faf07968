// cf. https://www.geopackage.org/spec140/index.html#table_definition_sql

// gpkg_spatial_ref_sys: the SRS catalog referenced by gpkg_contents and
// gpkg_geometry_columns to describe spatial reference systems.
pub(crate) const SQL_GPKG_SPATIAL_REF_SYS: &str = "
CREATE TABLE gpkg_spatial_ref_sys (
  srs_name TEXT NOT NULL,
  srs_id INTEGER PRIMARY KEY,
  organization TEXT NOT NULL,
  organization_coordsys_id INTEGER NOT NULL,
  definition  TEXT NOT NULL,
  description TEXT
);
";

// gpkg_contents: lists all geospatial contents in the package with identifying
// and descriptive metadata for user display and access.
pub(crate) const SQL_GPKG_CONTENTS: &str = "
CREATE TABLE gpkg_contents (
  table_name TEXT NOT NULL PRIMARY KEY,
  data_type TEXT NOT NULL,
  identifier TEXT UNIQUE,
  description TEXT DEFAULT '',
  last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
  min_x DOUBLE,
  min_y DOUBLE,
  max_x DOUBLE,
  max_y DOUBLE,
  srs_id INTEGER,
  CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
";

// gpkg_geometry_columns: identifies geometry columns and geometry types for
// vector feature user data tables.
pub(crate) const SQL_GPKG_GEOMETRY_COLUMNS: &str = "
CREATE TABLE gpkg_geometry_columns (
  table_name TEXT NOT NULL,
  column_name TEXT NOT NULL,
  geometry_type_name TEXT NOT NULL,
  srs_id INTEGER NOT NULL,
  z TINYINT NOT NULL,
  m TINYINT NOT NULL,
  CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
  CONSTRAINT uk_gc_table_name UNIQUE (table_name),
  CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
  CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys (srs_id)
);
";

// gpkg_data_columns / gpkg_data_column_constraints: the schema extension used
// to bind enumerated domains to attribute columns.
// cf. https://www.geopackage.org/spec140/index.html#extension_schema
pub(crate) const SQL_GPKG_DATA_COLUMNS: &str = "
CREATE TABLE IF NOT EXISTS gpkg_data_columns (
  table_name TEXT NOT NULL,
  column_name TEXT NOT NULL,
  name TEXT UNIQUE,
  title TEXT,
  description TEXT,
  mime_type TEXT,
  constraint_name TEXT,
  CONSTRAINT pk_gdc PRIMARY KEY (table_name, column_name),
  CONSTRAINT fk_gdc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name)
);
";

pub(crate) const SQL_GPKG_DATA_COLUMN_CONSTRAINTS: &str = "
CREATE TABLE IF NOT EXISTS gpkg_data_column_constraints (
  constraint_name TEXT NOT NULL,
  constraint_type TEXT NOT NULL,
  value TEXT,
  min NUMERIC,
  min_is_inclusive BOOLEAN,
  max NUMERIC,
  max_is_inclusive BOOLEAN,
  description TEXT,
  CONSTRAINT gdcc_ntv UNIQUE (constraint_name, constraint_type, value)
);
";

// cf. https://www.geopackage.org/spec140/index.html#extensions_table_definition
pub(crate) const SQL_GPKG_EXTENSIONS: &str = "
CREATE TABLE IF NOT EXISTS gpkg_extensions (
  table_name TEXT,
  column_name TEXT,
  extension_name TEXT NOT NULL,
  definition TEXT NOT NULL,
  scope TEXT NOT NULL,
  CONSTRAINT ge_tce UNIQUE (table_name, column_name, extension_name)
);
";

// column_name is NULL, so the UNIQUE constraint cannot deduplicate these rows.
const SQL_REGISTER_SCHEMA_EXTENSION: &str = "
INSERT INTO gpkg_extensions (table_name, column_name, extension_name, definition, scope)
SELECT ?1, NULL, 'gpkg_schema', 'http://www.geopackage.org/spec/#extension_schema', 'read-write'
WHERE NOT EXISTS (
  SELECT 1 FROM gpkg_extensions
  WHERE table_name = ?1 AND column_name IS NULL AND extension_name = 'gpkg_schema'
)
";

pub(crate) const SQL_INSERT_ENUM_CONSTRAINT: &str = "
INSERT OR IGNORE INTO gpkg_data_column_constraints
  (constraint_name, constraint_type, value, description)
VALUES
  (?1, 'enum', ?2, ?3)
";

pub(crate) const SQL_BIND_DATA_COLUMN_CONSTRAINT: &str = "
INSERT OR REPLACE INTO gpkg_data_columns
  (table_name, column_name, constraint_name)
VALUES
  (?1, ?2, ?3)
";

pub(crate) const SQL_LIST_LAYERS: &str = "
SELECT table_name FROM gpkg_contents
WHERE data_type IN ('features', 'attributes')
ORDER BY rowid
";

pub(crate) const SQL_INSERT_GPKG_CONTENTS: &str = "
INSERT INTO gpkg_contents
  (table_name, data_type, identifier, description, srs_id)
VALUES
  (?1, ?2, ?3, '', ?4)
";

pub(crate) const SQL_INSERT_GPKG_GEOMETRY_COLUMNS: &str = "
INSERT INTO gpkg_geometry_columns
  (table_name, column_name, geometry_type_name, srs_id, z, m)
VALUES
  (?1, ?2, ?3, ?4, ?5, ?6)
";

pub(crate) const SQL_SELECT_GEOMETRY_COLUMN_META: &str = "
SELECT column_name, geometry_type_name, z, m, srs_id
FROM gpkg_geometry_columns
WHERE table_name = ?
";

pub(crate) const SQL_SRS_EXISTS: &str =
    "SELECT EXISTS(SELECT 1 FROM gpkg_spatial_ref_sys WHERE srs_id = ?1)";

pub(crate) fn sql_create_table(layer_name: &str, column_defs: &str) -> String {
    format!(r#"CREATE TABLE "{}" ({})"#, layer_name, column_defs)
}

pub(crate) fn sql_table_columns(layer_name: &str) -> String {
    format!("SELECT name, type, pk, \"notnull\" FROM pragma_table_info('{layer_name}')")
}

/// Select the primary key, the geometry column (if any) and the property
/// columns, in this order, sorted by the primary key.
pub(crate) fn sql_select_rows<'a, I>(
    layer_name: &'a str,
    primary_key_column: &'a str,
    geometry_column: Option<&'a str>,
    other_columns: I,
) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let columns = std::iter::once(primary_key_column)
        .chain(geometry_column)
        .chain(other_columns)
        .map(|name| format!(r#""{}""#, name))
        .collect::<Vec<String>>()
        .join(", ");

    format!(r#"SELECT {columns} FROM "{layer_name}" ORDER BY "{primary_key_column}""#)
}

pub(crate) fn sql_insert_row(layer_name: &str, columns: &str, values: &str) -> String {
    format!(
        r#"INSERT INTO "{}" ({}) VALUES ({})"#,
        layer_name, columns, values
    )
}

pub(crate) fn initialize_gpkg(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SQL_GPKG_SPATIAL_REF_SYS)?;
    register_default_srs_ids(conn)?;
    conn.execute_batch(SQL_GPKG_CONTENTS)?;
    conn.execute_batch(SQL_GPKG_GEOMETRY_COLUMNS)?;
    // GeoPackage application id ("GPKG") and version 1.4.0.
    conn.execute_batch("PRAGMA application_id = 1196444487; PRAGMA user_version = 10400;")?;
    Ok(())
}

pub(crate) fn initialize_schema_extension(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SQL_GPKG_DATA_COLUMNS)?;
    conn.execute_batch(SQL_GPKG_DATA_COLUMN_CONSTRAINTS)?;
    conn.execute_batch(SQL_GPKG_EXTENSIONS)?;
    for table in ["gpkg_data_columns", "gpkg_data_column_constraints"] {
        conn.execute(SQL_REGISTER_SCHEMA_EXTENSION, [table])?;
    }
    Ok(())
}

// gpkg_spatial_ref_sys requires the WKT of the SRS. IMDF data is always
// WGS 84, so 4326 plus the two mandatory undefined entries are enough.
fn register_default_srs_ids(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    const EPSG4326_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AXIS["Latitude",NORTH],AXIS["Longitude",EAST],AUTHORITY["EPSG","4326"]]"#;

    let sql = "INSERT INTO gpkg_spatial_ref_sys \
            (srs_name, srs_id, organization, organization_coordsys_id, definition, description) \
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
    conn.execute(
        sql,
        rusqlite::params!["WGS 84", 4326, "EPSG", 4326, EPSG4326_WKT, "WGS 84"],
    )?;
    conn.execute(
        sql,
        rusqlite::params![
            "Undefined Cartesian SRS",
            -1,
            "NONE",
            -1,
            "undefined",
            "undefined Cartesian coordinate reference system"
        ],
    )?;
    conn.execute(
        sql,
        rusqlite::params![
            "Undefined geographic SRS",
            0,
            "NONE",
            0,
            "undefined",
            "undefined geographic coordinate reference system"
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{initialize_gpkg, initialize_schema_extension, sql_select_rows};

    #[test]
    fn select_rows_places_key_and_geometry_first() {
        let sql = sql_select_rows("unit", "fid", Some("geom"), ["id", "name"]);
        assert_eq!(
            sql,
            r#"SELECT "fid", "geom", "id", "name" FROM "unit" ORDER BY "fid""#
        );

        let sql = sql_select_rows("amenity_unit", "fid", None, ["amenity_id"]);
        assert_eq!(
            sql,
            r#"SELECT "fid", "amenity_id" FROM "amenity_unit" ORDER BY "fid""#
        );
    }

    #[test]
    fn schema_extension_is_registered_once() -> rusqlite::Result<()> {
        let conn = rusqlite::Connection::open_in_memory()?;
        initialize_gpkg(&conn)?;
        initialize_schema_extension(&conn)?;
        initialize_schema_extension(&conn)?;

        let mut stmt = conn.prepare(
            "SELECT table_name FROM gpkg_extensions WHERE extension_name = 'gpkg_schema' ORDER BY table_name",
        )?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        assert_eq!(tables, vec!["gpkg_data_column_constraints", "gpkg_data_columns"]);
        Ok(())
    }
}
