//! IMDF export from indoor-mapping GeoPackages, built on top of rusqlite.
//!
//! ## Overview
//!
//! - `Gpkg` opens (or creates) the GeoPackage container. `GpkgLayer` and
//!   `GpkgFeature` give row-level access to its tables.
//! - `TableReader` is what the export needs from a container: the list of
//!   tables and every row of a table as a `RawRecord`. `Gpkg` implements it.
//! - `JunctionResolver` turns junction tables into per-feature id lists
//!   (`unit_ids`, `building_ids`, ...), as configured by a `JunctionRegistry`.
//! - `normalize` turns one record into an IMDF `OutputFeature`.
//! - `Exporter` runs the whole export: one `<feature_type>.geojson` per table,
//!   `manifest.json` and a zip archive holding both.
//! - `catalog` knows the IMDF table layout and creates new containers.
//!
//! ## Export
//!
//! ```no_run
//! use imdf_gpkg::{ExportConfig, Exporter, Gpkg};
//!
//! let gpkg = Gpkg::open_read_only("data/venue.gpkg")?;
//! let config = ExportConfig {
//!     language: "en-US".to_string(),
//!     ..ExportConfig::default()
//! };
//! let summary = Exporter::new(&gpkg, &config).export(std::path::Path::new("out"))?;
//! for file in &summary.files {
//!     println!("{}: {} features", file.feature_type, file.features);
//! }
//! # Ok::<(), imdf_gpkg::ImdfError>(())
//! ```
//!
//! ## Creating a container
//!
//! ```no_run
//! use imdf_gpkg::catalog::{self, DomainValue};
//!
//! let gpkg = catalog::create_container("data/new_venue.gpkg")?;
//! let values = [DomainValue::new("wheelchair", "Wheelchair accessible")];
//! catalog::insert_domain_values(&gpkg, "accessibility_domain", &values)?;
//! catalog::add_enum_domain(&gpkg, "accessibility_domain", &values, "unit", "accessibility")?;
//! # Ok::<(), imdf_gpkg::ImdfError>(())
//! ```
//!
//! ## Reading rows
//!
//! ```no_run
//! use imdf_gpkg::{Gpkg, TableReader};
//!
//! let gpkg = Gpkg::open_read_only("data/venue.gpkg")?;
//! for table in gpkg.list_tables()? {
//!     for record in gpkg.read_table(&table)? {
//!         println!("{table} #{}: {:?}", record.fid, record.properties.get("id"));
//!     }
//! }
//! # Ok::<(), imdf_gpkg::ImdfError>(())
//! ```
mod error;
mod gpkg;

mod config;
mod conversions;
mod export;
mod feature_type;
mod geojson;
mod junction;
mod normalize;
mod ogc_sql;
mod package;
mod reader;
mod types;

pub mod catalog;

pub use config::ExportConfig;
pub use error::{ImdfError, Result};
pub use export::{ExportSummary, ExportedFile, Exporter, SkipReason, collect_features};
pub use feature_type::FeatureType;
pub use geojson::geometry_to_geojson;
pub use gpkg::{Gpkg, GpkgFeature, GpkgLayer};
pub use junction::{JunctionField, JunctionRegistry, JunctionResolver};
pub use normalize::{FeatureCollection, OutputFeature, normalize};
pub use package::{Manifest, write_archive, write_json, write_manifest};
pub use reader::{RawRecord, TableReader};
pub use types::{ColumnSpec, ColumnType, GeometryColumn, Value};
