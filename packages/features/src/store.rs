//! CSV persistence for feature tables.
//!
//! Per-municipality normalized tables are semicolon-separated and read
//! back by the matching stage. The combined raw (pre-normalization)
//! table is the comma-separated, fully quoted app export. Column order
//! is fixed by [`Indicator::ALL`]; postal codes stay zero-padded
//! strings in both directions.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use area_match_features_models::{FeatureRow, Indicator};
use area_match_register_models::{Municipality, PostalCode};

use crate::FeatureError;

/// Combined raw feature table file name.
pub const RAW_FEATURES_FILE: &str = "raw_data.csv";

/// File name of one municipality's normalized feature table.
#[must_use]
pub fn features_file_name(municipality: Municipality) -> String {
    format!("{municipality}_features.csv")
}

fn header() -> Vec<&'static str> {
    let mut columns = vec!["Postal code", "municipality"];
    columns.extend(Indicator::ALL.iter().map(|indicator| indicator.label()));
    columns
}

fn write_rows<W: Write>(mut wtr: csv::Writer<W>, rows: &[FeatureRow]) -> Result<(), FeatureError> {
    wtr.write_record(header())?;
    for row in rows {
        let mut record = vec![
            row.postal_code.as_str().to_string(),
            row.municipality.to_string(),
        ];
        record.extend(row.values.iter().map(ToString::to_string));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes one municipality's normalized feature table
/// (semicolon-separated).
///
/// # Errors
///
/// Returns [`FeatureError`] on I/O or serialization failure.
pub fn write_features(path: &Path, rows: &[FeatureRow]) -> Result<(), FeatureError> {
    write_features_to(File::create(path)?, rows)
}

fn write_features_to<W: Write>(out: W, rows: &[FeatureRow]) -> Result<(), FeatureError> {
    let wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(out);
    write_rows(wtr, rows)
}

/// Writes the combined raw feature table (comma-separated, all fields
/// quoted — the app export convention).
///
/// # Errors
///
/// Returns [`FeatureError`] on I/O or serialization failure.
pub fn write_raw_features(path: &Path, rows: &[FeatureRow]) -> Result<(), FeatureError> {
    write_raw_features_to(File::create(path)?, rows)
}

fn write_raw_features_to<W: Write>(out: W, rows: &[FeatureRow]) -> Result<(), FeatureError> {
    let wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(out);
    write_rows(wtr, rows)
}

/// Reads a normalized feature table written by [`write_features`].
///
/// # Errors
///
/// Returns [`FeatureError`] on I/O failure or malformed rows.
pub fn read_features(path: &Path) -> Result<Vec<FeatureRow>, FeatureError> {
    read_features_from(File::open(path)?)
}

fn read_features_from<R: Read>(input: R) -> Result<Vec<FeatureRow>, FeatureError> {
    let mut reader = csv::ReaderBuilder::new().delimiter(b';').from_reader(input);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() != 2 + Indicator::COUNT {
            return Err(FeatureError::Parse {
                message: format!("expected {} fields, got {}", 2 + Indicator::COUNT, record.len()),
            });
        }
        let postal_code = PostalCode::new(&record[0])?;
        let municipality =
            Municipality::parse_name(&record[1]).ok_or_else(|| FeatureError::Parse {
                message: format!("unknown municipality {:?}", &record[1]),
            })?;

        let mut values = [0.0_f64; Indicator::COUNT];
        for (slot, field) in values.iter_mut().zip(record.iter().skip(2)) {
            *slot = field.parse().map_err(|_| FeatureError::Parse {
                message: format!("non-numeric feature value {field:?} for {postal_code}"),
            })?;
        }
        rows.push(FeatureRow {
            postal_code,
            municipality,
            values,
        });
    }
    Ok(rows)
}
