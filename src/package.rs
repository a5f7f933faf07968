//! Manifest and archive writing.

use crate::config::ExportConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub const MANIFEST_FILE: &str = "manifest.json";

/// `manifest.json` of an IMDF archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub version: String,
    /// UTC, second precision, `Z` suffix.
    pub created: String,
    pub generated_by: String,
    pub language: String,
}

impl Manifest {
    pub fn new(config: &ExportConfig, created: DateTime<Utc>) -> Self {
        Self {
            version: config.manifest_version.clone(),
            created: created.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            generated_by: config.generated_by.clone(),
            language: config.language.clone(),
        }
    }
}

/// Write `value` as pretty-printed UTF-8 JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Write `manifest.json` into `output_dir` and return its path.
pub fn write_manifest(output_dir: &Path, manifest: &Manifest) -> Result<PathBuf> {
    let path = output_dir.join(MANIFEST_FILE);
    write_json(&path, manifest)?;
    tracing::info!(path = %path.display(), "wrote manifest");
    Ok(path)
}

/// Pack `files` into a deflated zip archive at `archive_path`.
///
/// Entries are named by the file name alone.
pub fn write_archive(archive_path: &Path, files: &[PathBuf]) -> Result<()> {
    let mut zip = zip::ZipWriter::new(BufWriter::new(File::create(archive_path)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in files {
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a file path: {}", file.display()),
                )
            })?;
        zip.start_file(name, options)?;
        io::copy(&mut File::open(file)?, &mut zip)?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    tracing::info!(path = %archive_path.display(), entries = files.len(), "wrote archive");
    Ok(())
}
