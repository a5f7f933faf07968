//! Command-line interface for imdf-gpkg
//!
//! ```bash
//! # Create an empty IMDF GeoPackage and load the accessibility domain
//! imdf-gpkg create venue.gpkg --domain accessibility_domain=accessibility.csv
//!
//! # Export it as an IMDF archive
//! RUST_LOG=info imdf-gpkg export venue.gpkg --output out/ --language en-US
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use imdf_gpkg::catalog::{self, DOMAIN_FIELDS, LayerKind};
use imdf_gpkg::{ExportConfig, Exporter, Gpkg};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "imdf-gpkg")]
#[command(about = "Create IMDF GeoPackages and export them as IMDF archives")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the feature tables of a GeoPackage as an IMDF archive
    Export {
        /// GeoPackage to read
        gpkg: PathBuf,

        /// Directory receiving the GeoJSON files, manifest and archive
        #[arg(long, short, env = "IMDF_OUTPUT_DIR")]
        output: PathBuf,

        /// TOML file overriding the default export configuration
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Language code written to the manifest
        #[arg(long, env = "IMDF_LANGUAGE")]
        language: Option<String>,

        /// Generator identity written to the manifest
        #[arg(long, env = "IMDF_GENERATED_BY")]
        generated_by: Option<String>,

        /// Export only these feature types (repeatable)
        #[arg(long = "layer", value_name = "LAYER")]
        layers: Vec<String>,
    },

    /// Create a new GeoPackage holding every IMDF table
    Create {
        /// GeoPackage to create; must not exist
        gpkg: PathBuf,

        /// Load `code,value` CSV rows into a domain table (format: TABLE=CSV)
        #[arg(long = "domain", value_name = "TABLE=CSV", value_parser = parse_domain)]
        domains: Vec<(String, PathBuf)>,
    },
}

fn parse_domain(arg: &str) -> Result<(String, PathBuf), String> {
    let (table, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected TABLE=CSV, got '{arg}'"))?;
    let def = catalog::layer(table).filter(|def| def.kind == LayerKind::Domain);
    if def.is_none() {
        return Err(format!("'{table}' is not a domain table"));
    }
    Ok((table.to_string(), PathBuf::from(path)))
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            gpkg,
            output,
            config,
            language,
            generated_by,
            layers,
        } => {
            let mut export_config = match config {
                Some(path) => ExportConfig::from_file(&path)
                    .with_context(|| format!("Failed to load export config from {path:?}"))?,
                None => ExportConfig::default(),
            };
            if let Some(language) = language {
                export_config.language = language;
            }
            if let Some(generated_by) = generated_by {
                export_config.generated_by = generated_by;
            }
            if !layers.is_empty() {
                export_config.feature_types = Some(layers);
            }

            let container = Gpkg::open_read_only(&gpkg)
                .with_context(|| format!("Failed to open {gpkg:?}"))?;
            let summary = Exporter::new(&container, &export_config)
                .export(&output)
                .with_context(|| format!("Failed to export into {output:?}"))?;

            for file in &summary.files {
                println!("{}: {} features", file.feature_type, file.features);
            }
            for (feature_type, reason) in &summary.skipped {
                println!("{feature_type}: skipped ({reason})");
            }
            println!("archive: {}", summary.archive.display());
        }
        Commands::Create { gpkg, domains } => {
            let container = catalog::create_container(&gpkg)
                .with_context(|| format!("Failed to create {gpkg:?}"))?;

            for (table, path) in domains {
                let file = std::fs::File::open(&path)
                    .with_context(|| format!("Failed to open {path:?}"))?;
                let Some(values) = catalog::read_domain_csv(file)
                    .with_context(|| format!("Failed to read domain values from {path:?}"))?
                else {
                    continue;
                };
                catalog::insert_domain_values(&container, &table, &values)?;

                // Bind the values to every attribute constrained by this domain.
                for (field, _) in DOMAIN_FIELDS.iter().filter(|(_, domain)| *domain == table) {
                    for def in catalog::LAYERS
                        .iter()
                        .filter(|def| def.kind == LayerKind::Feature && def.attribute(field).is_some())
                    {
                        catalog::add_enum_domain(&container, &table, &values, def.name, field)?;
                    }
                }
            }
            println!("created {}", gpkg.display());
        }
    }

    Ok(())
}
