//! Export configuration.

use crate::catalog;
use crate::error::Result;
use crate::junction::JunctionRegistry;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

pub const DEFAULT_LANGUAGE: &str = "lt-LT";
pub const DEFAULT_MANIFEST_VERSION: &str = "1.0.0";
pub const DEFAULT_ARCHIVE_NAME: &str = "exported_imdf.zip";

/// Everything an export run needs to know besides the container itself.
///
/// The defaults describe a GeoPackage created by [`catalog::create_container`].
/// Any field may be overridden from TOML:
///
/// ```toml
/// language = "en-US"
/// generated_by = "Campus mapping team"
/// feature_types = ["venue", "level", "unit"]
///
/// [junctions.kiosk.anchor_ids]
/// table = "kiosk_anchor"
/// id = "anchor_id"
/// ref = "kiosk_id"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Tables that are never exported.
    pub excluded_layers: BTreeSet<String>,
    pub junctions: JunctionRegistry,
    /// Language code written to the manifest.
    pub language: String,
    pub generated_by: String,
    pub manifest_version: String,
    pub archive_name: String,
    /// Export exactly these feature types, in this order, instead of every
    /// table of the container.
    pub feature_types: Option<Vec<String>>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            excluded_layers: catalog::non_feature_layers().map(str::to_string).collect(),
            junctions: JunctionRegistry::imdf(),
            language: DEFAULT_LANGUAGE.to_string(),
            generated_by: env!("CARGO_PKG_NAME").to_string(),
            manifest_version: DEFAULT_MANIFEST_VERSION.to_string(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            feature_types: None,
        }
    }
}

impl ExportConfig {
    /// Parse a TOML document; fields it omits keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn is_excluded(&self, table: &str) -> bool {
        self.excluded_layers.contains(table)
    }
}
