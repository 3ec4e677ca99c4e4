#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the living area similarity pipeline.
//!
//! `extract` pulls the input tables from StatFin, `features` derives
//! and normalizes the indicator tables, `map` computes the
//! cross-municipality matches, and `run` chains all three.

use std::path::{Path, PathBuf};
use std::time::Instant;

use area_match_features::derive::{DeriveInput, derive_features};
use area_match_features::normalize::{NormalizeConfig, normalize_group};
use area_match_features::{group_by_municipality, store as feature_store};
use area_match_matcher::{MunicipalityFeatures, compute_mappings, store as mapping_store};
use area_match_register::fetch::StatfinClient;
use area_match_register::store as register_store;
use area_match_register_models::{Municipality, PostalCode};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "area-match", about = "Living area similarity mapping pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct YearArgs {
    /// Statistical year of the current register snapshot
    /// (default: two years back, the newest published Paavo year)
    #[arg(long)]
    year_latest: Option<i32>,
    /// Statistical year of the older register snapshot used for
    /// population growth (default: seven years back)
    #[arg(long)]
    year_old: Option<i32>,
    /// Statistical year of the apartment price tables
    /// (default: last year)
    #[arg(long)]
    price_year: Option<i32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the input tables from StatFin and write them as CSV
    Extract {
        /// Output directory for the raw input tables
        #[arg(long, default_value = "data")]
        out: PathBuf,
        #[command(flatten)]
        years: YearArgs,
    },
    /// Derive and normalize the feature tables from extracted CSVs
    Features {
        /// Directory holding the extracted input tables
        #[arg(long, default_value = "data")]
        data: PathBuf,
        /// Output directory for the feature tables
        #[arg(long, default_value = "data")]
        out: PathBuf,
    },
    /// Compute the similarity mapping from the feature tables
    Map {
        /// Directory holding the per-municipality feature tables
        #[arg(long, default_value = "data")]
        features: PathBuf,
        /// Output directory for the mapping table
        #[arg(long, default_value = "data")]
        out: PathBuf,
    },
    /// Run the full pipeline: extract, features, map
    Run {
        /// Working directory for every intermediate and output table
        #[arg(long, default_value = "data")]
        out: PathBuf,
        #[command(flatten)]
        years: YearArgs,
    },
}

/// Resolved statistical years for one extraction.
#[derive(Debug, Clone, Copy)]
struct Years {
    latest: i32,
    old: i32,
    prices: i32,
}

impl Years {
    /// Fills unset years from the current date. Paavo data lags about
    /// two years behind; the price tables lag one.
    fn resolve(args: YearArgs) -> Self {
        let current = chrono::Utc::now().year();
        Self {
            latest: args.year_latest.unwrap_or(current - 2),
            old: args.year_old.unwrap_or(current - 7),
            prices: args.price_year.unwrap_or(current - 1),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { out, years } => {
            extract(&out, Years::resolve(years)).await?;
        }
        Commands::Features { data, out } => {
            derive_and_normalize(&data, &out)?;
        }
        Commands::Map { features, out } => {
            compute_map(&features, &out)?;
        }
        Commands::Run { out, years } => {
            let start = Instant::now();
            extract(&out, Years::resolve(years)).await?;
            derive_and_normalize(&out, &out)?;
            compute_map(&out, &out)?;
            log::info!("Pipeline complete in {:.1}s", start.elapsed().as_secs_f64());
        }
    }

    Ok(())
}

/// Fetches all five input tables and writes them under `out`.
async fn extract(out: &Path, years: Years) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(out)?;
    log::info!(
        "Extracting input tables (register years {} and {}, prices {})",
        years.latest,
        years.old,
        years.prices
    );
    let client = StatfinClient::embedded();

    let mapping = client.fetch_postal_code_mapping().await?;
    register_store::write_mapping(&out.join(register_store::MAPPING_FILE), &mapping)?;

    let codes: Vec<PostalCode> = mapping
        .iter()
        .map(|entry| entry.postal_code.clone())
        .collect();
    let latest = client.fetch_register(&codes, years.latest).await?;
    register_store::write_register(&out.join(register_store::REGISTER_LATEST_FILE), &latest)?;
    let old = client.fetch_register(&codes, years.old).await?;
    register_store::write_register(&out.join(register_store::REGISTER_OLD_FILE), &old)?;

    let area_prices = client.fetch_area_prices(years.prices).await?;
    register_store::write_area_prices(&out.join(register_store::AREA_PRICES_FILE), &area_prices)?;
    let municipality_prices = client.fetch_municipality_prices(years.prices).await?;
    register_store::write_municipality_prices(
        &out.join(register_store::MUNICIPALITY_PRICES_FILE),
        &municipality_prices,
    )?;

    log::info!("Extraction complete: input tables in {}", out.display());
    Ok(())
}

/// Reads the extracted tables, derives and normalizes features, and
/// writes the raw export plus one table per municipality.
fn derive_and_normalize(data: &Path, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(out)?;
    let mapping = register_store::read_mapping(&data.join(register_store::MAPPING_FILE))?;
    let latest = register_store::read_register(&data.join(register_store::REGISTER_LATEST_FILE))?;
    let old = register_store::read_register(&data.join(register_store::REGISTER_OLD_FILE))?;
    let area_prices =
        register_store::read_area_prices(&data.join(register_store::AREA_PRICES_FILE))?;
    let municipality_prices = register_store::read_municipality_prices(
        &data.join(register_store::MUNICIPALITY_PRICES_FILE),
    )?;

    let input = DeriveInput {
        mapping: &mapping,
        latest: &latest,
        old: &old,
        area_prices: &area_prices,
        municipality_prices: &municipality_prices,
    };
    let rows = derive_features(&input)?;
    log::info!("Derived features for {} areas", rows.len());
    feature_store::write_raw_features(&out.join(feature_store::RAW_FEATURES_FILE), &rows)?;

    let config = NormalizeConfig::default();
    for (municipality, group) in group_by_municipality(rows) {
        let normalized = normalize_group(&group, &config);
        log::info!("Normalized {} areas in {municipality}", normalized.len());
        feature_store::write_features(
            &out.join(feature_store::features_file_name(municipality)),
            &normalized,
        )?;
    }
    Ok(())
}

/// Reads the six feature tables, runs the matcher, and writes the
/// similarity mapping table.
fn compute_map(features_dir: &Path, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(out)?;
    let mut groups = Vec::with_capacity(Municipality::ALL.len());
    for &municipality in Municipality::ALL {
        let rows = feature_store::read_features(
            &features_dir.join(feature_store::features_file_name(municipality)),
        )?;
        groups.push(MunicipalityFeatures::new(municipality, rows));
    }
    let mappings = compute_mappings(&groups)?;
    log::info!("Computed matches for {} areas", mappings.len());
    mapping_store::write_mappings(&out.join(mapping_store::MAPPINGS_FILE), &mappings)?;
    Ok(())
}
