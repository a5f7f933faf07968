//! GeoPackage access backed by rusqlite.
//!
//! This is the relational store the IMDF export reads from: layers (feature
//! tables and attribute-only tables) are read whole, and new containers can
//! be laid out and populated through the same types.

mod feature;
mod gpkg;
mod layer;

pub use feature::GpkgFeature;
pub use gpkg::Gpkg;
pub use layer::GpkgLayer;

pub(crate) use feature::wkb_to_gpkg_geometry;
