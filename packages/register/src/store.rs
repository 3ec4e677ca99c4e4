//! CSV persistence for the raw input tables.
//!
//! The extraction stage writes these files; the derivation stage reads
//! them back, so a run can be split across machines or re-run offline.
//! All input tables are semicolon-separated. Postal codes are written
//! as zero-padded strings and re-validated through [`PostalCode`] when
//! read.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use area_match_register_models::{
    AreaPriceTable, AreaRow, MappingEntry, Municipality, MunicipalityPriceTable, PostalCode,
    RegisterTable,
};
use serde::{Deserialize, Serialize};

use crate::RegisterError;

/// Postal-code mapping table file name.
pub const MAPPING_FILE: &str = "postal_code_mapping.csv";
/// Current register snapshot file name.
pub const REGISTER_LATEST_FILE: &str = "postal_code_info_latest.csv";
/// 5-years-prior register snapshot file name.
pub const REGISTER_OLD_FILE: &str = "postal_code_info_old.csv";
/// Per-area apartment price table file name.
pub const AREA_PRICES_FILE: &str = "apartment_prices_areas.csv";
/// Per-municipality apartment price table file name.
pub const MUNICIPALITY_PRICES_FILE: &str = "apartment_prices_municipalities.csv";

/// Field separator for the raw input tables.
const DELIMITER: u8 = b';';

#[derive(Debug, Serialize, Deserialize)]
struct AreaPriceRecord {
    postal_code: PostalCode,
    price_per_m2: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct MunicipalityPriceRecord {
    municipality: Municipality,
    price_per_m2: f64,
}

fn writer<W: Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().delimiter(DELIMITER).from_writer(out)
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().delimiter(DELIMITER).from_reader(input)
}

/// Writes the postal-code mapping table.
///
/// # Errors
///
/// Returns [`RegisterError`] on I/O or serialization failure.
pub fn write_mapping(path: &Path, entries: &[MappingEntry]) -> Result<(), RegisterError> {
    write_mapping_to(File::create(path)?, entries)
}

fn write_mapping_to<W: Write>(out: W, entries: &[MappingEntry]) -> Result<(), RegisterError> {
    let mut wtr = writer(out);
    for entry in entries {
        wtr.serialize(entry)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads the postal-code mapping table.
///
/// # Errors
///
/// Returns [`RegisterError`] on I/O or parse failure.
pub fn read_mapping(path: &Path) -> Result<Vec<MappingEntry>, RegisterError> {
    read_mapping_from(File::open(path)?)
}

fn read_mapping_from<R: Read>(input: R) -> Result<Vec<MappingEntry>, RegisterError> {
    let mut entries = Vec::new();
    for record in reader(input).deserialize() {
        entries.push(record?);
    }
    Ok(entries)
}

/// Writes a register snapshot.
///
/// # Errors
///
/// Returns [`RegisterError`] on I/O or serialization failure.
pub fn write_register(path: &Path, table: &RegisterTable) -> Result<(), RegisterError> {
    write_register_to(File::create(path)?, table)
}

fn write_register_to<W: Write>(out: W, table: &RegisterTable) -> Result<(), RegisterError> {
    let mut wtr = writer(out);
    for row in table.values() {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads a register snapshot.
///
/// # Errors
///
/// Returns [`RegisterError`] on I/O or parse failure.
pub fn read_register(path: &Path) -> Result<RegisterTable, RegisterError> {
    read_register_from(File::open(path)?)
}

fn read_register_from<R: Read>(input: R) -> Result<RegisterTable, RegisterError> {
    let mut table = RegisterTable::new();
    for record in reader(input).deserialize::<AreaRow>() {
        let row = record?;
        table.insert(row.postal_code.clone(), row);
    }
    Ok(table)
}

/// Writes the per-area apartment price table.
///
/// # Errors
///
/// Returns [`RegisterError`] on I/O or serialization failure.
pub fn write_area_prices(path: &Path, table: &AreaPriceTable) -> Result<(), RegisterError> {
    write_area_prices_to(File::create(path)?, table)
}

fn write_area_prices_to<W: Write>(out: W, table: &AreaPriceTable) -> Result<(), RegisterError> {
    let mut wtr = writer(out);
    for (postal_code, price) in table {
        wtr.serialize(AreaPriceRecord {
            postal_code: postal_code.clone(),
            price_per_m2: *price,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads the per-area apartment price table.
///
/// # Errors
///
/// Returns [`RegisterError`] on I/O or parse failure.
pub fn read_area_prices(path: &Path) -> Result<AreaPriceTable, RegisterError> {
    read_area_prices_from(File::open(path)?)
}

fn read_area_prices_from<R: Read>(input: R) -> Result<AreaPriceTable, RegisterError> {
    let mut table = AreaPriceTable::new();
    for record in reader(input).deserialize::<AreaPriceRecord>() {
        let record = record?;
        table.insert(record.postal_code, record.price_per_m2);
    }
    Ok(table)
}

/// Writes the per-municipality apartment price table.
///
/// # Errors
///
/// Returns [`RegisterError`] on I/O or serialization failure.
pub fn write_municipality_prices(
    path: &Path,
    table: &MunicipalityPriceTable,
) -> Result<(), RegisterError> {
    write_municipality_prices_to(File::create(path)?, table)
}

fn write_municipality_prices_to<W: Write>(
    out: W,
    table: &MunicipalityPriceTable,
) -> Result<(), RegisterError> {
    let mut wtr = writer(out);
    for (municipality, price) in table {
        wtr.serialize(MunicipalityPriceRecord {
            municipality: *municipality,
            price_per_m2: *price,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads the per-municipality apartment price table.
///
/// # Errors
///
/// Returns [`RegisterError`] on I/O or parse failure.
pub fn read_municipality_prices(path: &Path) -> Result<MunicipalityPriceTable, RegisterError> {
    read_municipality_prices_from(File::open(path)?)
}

fn read_municipality_prices_from<R: Read>(
    input: R,
) -> Result<MunicipalityPriceTable, RegisterError> {
    let mut table = MunicipalityPriceTable::new();
    for record in reader(input).deserialize::<MunicipalityPriceRecord>() {
        let record = record?;
        table.insert(record.municipality, record.price_per_m2);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(code: &str, population: u32) -> AreaRow {
        AreaRow {
            postal_code: PostalCode::new(code).unwrap(),
            population,
            mean_age: 41.5,
            students: 900,
            employed: 7800,
            unemployed: 450,
            pensioners: 2600,
            bachelor_degrees: 2100,
            master_degrees: 3300,
            households: 9500,
            rented_households: 6100,
            dwellings: 11000,
            block_dwellings: 10400,
            housing_density: 33.1,
            median_income: 27_450.0,
            land_area: 1.18,
        }
    }

    #[test]
    fn mapping_round_trip_preserves_zero_padding() {
        let entries = vec![MappingEntry {
            postal_code: PostalCode::new("00100").unwrap(),
            name: "Helsinki Keskusta".to_string(),
            municipality: Municipality::Helsinki,
        }];
        let mut buffer = Vec::new();
        write_mapping_to(&mut buffer, &entries).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.contains("00100"), "padded code missing: {text}");

        let read_back = read_mapping_from(buffer.as_slice()).unwrap();
        assert_eq!(read_back, entries);
    }

    #[test]
    fn mapping_read_repads_short_codes() {
        let csv = "postal_code;name;municipality\n100;Keskusta;Helsinki\n";
        let entries = read_mapping_from(csv.as_bytes()).unwrap();
        assert_eq!(entries[0].postal_code.as_str(), "00100");
    }

    #[test]
    fn register_round_trip() {
        let mut table = RegisterTable::new();
        let row = sample_row("00100", 18_284);
        table.insert(row.postal_code.clone(), row);

        let mut buffer = Vec::new();
        write_register_to(&mut buffer, &table).unwrap();
        let read_back = read_register_from(buffer.as_slice()).unwrap();
        assert_eq!(read_back, table);
    }

    #[test]
    fn price_tables_round_trip() {
        let mut areas = AreaPriceTable::new();
        areas.insert(PostalCode::new("00100").unwrap(), 8123.0);
        let mut buffer = Vec::new();
        write_area_prices_to(&mut buffer, &areas).unwrap();
        assert_eq!(read_area_prices_from(buffer.as_slice()).unwrap(), areas);

        let mut munis = MunicipalityPriceTable::new();
        munis.insert(Municipality::Oulu, 2310.0);
        let mut buffer = Vec::new();
        write_municipality_prices_to(&mut buffer, &munis).unwrap();
        assert_eq!(
            read_municipality_prices_from(buffer.as_slice()).unwrap(),
            munis
        );
    }
}
