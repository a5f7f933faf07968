//! The export run: one GeoJSON file per feature type, a manifest and the
//! archive holding them.

use crate::config::ExportConfig;
use crate::error::Result;
use crate::feature_type::FeatureType;
use crate::junction::JunctionResolver;
use crate::normalize::{FeatureCollection, normalize};
use crate::package::{Manifest, write_archive, write_json, write_manifest};
use crate::reader::{RawRecord, TableReader};
use chrono::Utc;
use std::fmt;
use std::path::{Path, PathBuf};

/// Why a feature type produced no file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The container has no such table.
    Missing,
    /// The table has no rows.
    Empty,
    /// The table could not be read.
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("not found"),
            Self::Empty => f.write_str("no features"),
            Self::Unreadable(err) => write!(f, "unreadable: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub feature_type: String,
    pub path: PathBuf,
    pub features: usize,
}

/// What an export run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub files: Vec<ExportedFile>,
    pub skipped: Vec<(String, SkipReason)>,
    pub manifest: PathBuf,
    pub archive: PathBuf,
}

impl ExportSummary {
    pub fn feature_count(&self) -> usize {
        self.files.iter().map(|file| file.features).sum()
    }
}

/// Exports the feature tables of a container.
pub struct Exporter<'a, R: TableReader + ?Sized> {
    reader: &'a R,
    config: &'a ExportConfig,
}

impl<'a, R: TableReader + ?Sized> Exporter<'a, R> {
    pub fn new(reader: &'a R, config: &'a ExportConfig) -> Self {
        Self { reader, config }
    }

    /// Feature types exported by [`Exporter::export`], in order.
    ///
    /// Either the configured list or every table of the container; excluded
    /// tables are never part of it.
    pub fn feature_types(&self) -> Result<Vec<String>> {
        let candidates = match &self.config.feature_types {
            Some(types) => types.clone(),
            None => self.reader.list_tables()?,
        };
        Ok(candidates
            .into_iter()
            .filter(|name| !self.config.is_excluded(name))
            .collect())
    }

    /// Run the export into `output_dir`, creating it if needed.
    ///
    /// Feature types that are missing, empty or unreadable are skipped with
    /// a warning. Failing to write any output is an error.
    pub fn export(&self, output_dir: &Path) -> Result<ExportSummary> {
        std::fs::create_dir_all(output_dir)?;

        let available = self.reader.list_tables()?;
        let mut resolver = JunctionResolver::new(&self.config.junctions, self.reader);
        let mut files = Vec::new();
        let mut skipped = Vec::new();

        for name in self.feature_types()? {
            if !available.contains(&name) {
                tracing::warn!(feature_type = name.as_str(), ?available, "layer not found, skipping");
                skipped.push((name, SkipReason::Missing));
                continue;
            }

            let records = match self.reader.read_table(&name) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(feature_type = name.as_str(), "failed to read layer, skipping: {e}");
                    skipped.push((name, SkipReason::Unreadable(e.to_string())));
                    continue;
                }
            };
            if records.is_empty() {
                tracing::warn!(feature_type = name.as_str(), "layer has no features, skipping");
                skipped.push((name, SkipReason::Empty));
                continue;
            }

            let feature_type = FeatureType::from(name.as_str());
            let collection = collect_features(&mut resolver, &feature_type, records);

            let path = output_dir.join(format!("{name}.geojson"));
            write_json(&path, &collection)?;
            tracing::info!(
                feature_type = name.as_str(),
                features = collection.len(),
                path = %path.display(),
                "exported layer"
            );
            files.push(ExportedFile {
                feature_type: name,
                path,
                features: collection.len(),
            });
        }

        let manifest = Manifest::new(self.config, Utc::now());
        let manifest = write_manifest(output_dir, &manifest)?;

        let archive = output_dir.join(&self.config.archive_name);
        let mut packed: Vec<PathBuf> = files.iter().map(|file| file.path.clone()).collect();
        packed.push(manifest.clone());
        write_archive(&archive, &packed)?;

        Ok(ExportSummary {
            files,
            skipped,
            manifest,
            archive,
        })
    }
}

/// Resolve and normalize every record of one feature type.
pub fn collect_features<R: TableReader + ?Sized>(
    resolver: &mut JunctionResolver<'_, R>,
    feature_type: &FeatureType,
    records: Vec<RawRecord>,
) -> FeatureCollection {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record
                .properties
                .get("id")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            let derived = resolver.resolve(feature_type.as_str(), &id);
            normalize(record, feature_type, derived)
        })
        .collect()
}
