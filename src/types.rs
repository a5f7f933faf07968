pub use rusqlite::types::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Varchar,
    Double,
    Integer,
    Date,
    DateTime,
    Geometry,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub not_null: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: false,
        }
    }

    /// Declare the column `NOT NULL`.
    pub fn required(mut self) -> Self {
        self.not_null = true;
        self
    }
}

/// Geometry column metadata of a spatial layer, as registered in
/// `gpkg_geometry_columns`.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryColumn {
    pub name: String,
    pub geometry_type: wkb::reader::GeometryType,
    pub dimension: wkb::reader::Dimension,
    pub srs_id: u32,
}

pub(crate) struct ColumnSpecs {
    pub(crate) primary_key: Option<String>,
    pub(crate) other_columns: Vec<ColumnSpec>,
}
