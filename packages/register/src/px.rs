//! PxWeb response payload parsing.
//!
//! Turns raw StatFin responses into the typed register tables. Pure
//! functions over already-fetched payloads so they can be tested without
//! network access.

use std::collections::BTreeMap;

use area_match_register_models::{
    AreaPriceTable, AreaRow, MappingEntry, Municipality, MunicipalityPriceTable, PostalCode,
    RegisterTable,
};
use serde::Deserialize;

use crate::RegisterError;
use crate::parsing::{parse_count, parse_price, parse_value};

/// Paavo register column labels, as delivered by the API.
pub mod columns {
    /// Total population.
    pub const POPULATION: &str = "Asukkaat yhteensä (HE)";
    /// Mean age of residents.
    pub const MEAN_AGE: &str = "Asukkaiden keski-ikä (HE)";
    /// Students.
    pub const STUDENTS: &str = "Opiskelijat (PT)";
    /// Employed residents.
    pub const EMPLOYED: &str = "Työlliset (PT)";
    /// Unemployed residents.
    pub const UNEMPLOYED: &str = "Työttömät (PT)";
    /// Pensioners.
    pub const PENSIONERS: &str = "Eläkeläiset (PT)";
    /// Lower university degree holders.
    pub const BACHELOR_DEGREES: &str = "Alemman korkeakoulututkinnon suorittaneet (KO)";
    /// Higher university degree holders.
    pub const MASTER_DEGREES: &str = "Ylemmän korkeakoulututkinnon suorittaneet (KO)";
    /// Households in total.
    pub const HOUSEHOLDS: &str = "Taloudet yhteensä (TE)";
    /// Households in rented dwellings.
    pub const RENTED_HOUSEHOLDS: &str = "Vuokra-asunnoissa asuvat taloudet (TE)";
    /// Dwellings in total.
    pub const DWELLINGS: &str = "Asunnot (RA)";
    /// Dwellings in blocks of flats.
    pub const BLOCK_DWELLINGS: &str = "Kerrostaloasunnot (RA)";
    /// Average floor area per person.
    pub const HOUSING_DENSITY: &str = "Asumisväljyys (TE)";
    /// Median income of residents.
    pub const MEDIAN_INCOME: &str = "Asukkaiden mediaanitulot (HR)";
    /// Surface area of the postal code area.
    pub const LAND_AREA: &str = "Postinumeroalueen pinta-ala";
    /// Apartment price per square meter.
    pub const PRICE_PER_M2: &str = "Neliöhinta EUR/m2";
}

/// A PxWeb JSON response: column descriptors plus one data item per
/// key combination.
#[derive(Debug, Deserialize)]
pub struct PxResponse {
    /// Column descriptors; key columns first, then value columns.
    pub columns: Vec<PxColumn>,
    /// One item per key combination.
    pub data: Vec<PxItem>,
}

/// A PxWeb column descriptor.
#[derive(Debug, Deserialize)]
pub struct PxColumn {
    /// Human-readable column label.
    pub text: String,
}

/// A PxWeb data item: key values followed by the cell values.
#[derive(Debug, Deserialize)]
pub struct PxItem {
    /// Key column values (e.g., postal code, year).
    pub key: Vec<String>,
    /// Value column cells, aligned with the value columns.
    pub values: Vec<String>,
}

/// Number of key columns preceding the value columns in the register
/// response (postal code area, year).
const REGISTER_KEY_COLUMNS: usize = 2;

/// Parses the postal-code names response.
///
/// The names endpoint returns CSV whose first field combines the code,
/// area name, and owning municipality:
/// `"00100  Helsinki Keskusta - Helsingfors Centrum (Helsinki)"`.
/// The first two lines are headers. Areas outside the six tracked
/// municipalities are dropped.
///
/// # Errors
///
/// Returns [`RegisterError`] if the CSV structure or a postal code is
/// malformed.
pub fn parse_mapping_response(content: &str) -> Result<Vec<MappingEntry>, RegisterError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut entries = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if line < 2 {
            continue;
        }
        let Some(combined) = record.get(0) else {
            continue;
        };
        if let Some(entry) = parse_mapping_line(combined)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Parses one combined `code  name (Municipality)` line. Returns
/// `Ok(None)` for areas outside the tracked municipalities.
fn parse_mapping_line(combined: &str) -> Result<Option<MappingEntry>, RegisterError> {
    let trimmed = combined.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let Some((code, rest)) = trimmed.split_once(char::is_whitespace) else {
        return Err(RegisterError::Payload {
            message: format!("Unparseable postal code line: {trimmed:?}"),
        });
    };
    let Some((name, muni)) = rest.split_once('(') else {
        return Err(RegisterError::Payload {
            message: format!("Missing municipality in line: {trimmed:?}"),
        });
    };
    let muni_name = muni.trim_end().trim_end_matches(')');
    let Some(municipality) = Municipality::parse_name(muni_name) else {
        return Ok(None);
    };
    Ok(Some(MappingEntry {
        postal_code: PostalCode::new(code)?,
        name: name.trim().to_string(),
        municipality,
    }))
}

/// Parses a register snapshot response into a keyed table.
///
/// Value columns are matched by label; a missing required column is a
/// payload error, as is a key/values shape mismatch.
///
/// # Errors
///
/// Returns [`RegisterError`] on malformed payloads or unparseable
/// values.
pub fn parse_register_response(response: &PxResponse) -> Result<RegisterTable, RegisterError> {
    if response.columns.len() < REGISTER_KEY_COLUMNS {
        return Err(RegisterError::Payload {
            message: format!(
                "Register response has only {} columns",
                response.columns.len()
            ),
        });
    }
    let labels: Vec<&str> = response.columns[REGISTER_KEY_COLUMNS..]
        .iter()
        .map(|column| column.text.as_str())
        .collect();

    let mut table = RegisterTable::new();
    for item in &response.data {
        let code = item.key.first().ok_or_else(|| RegisterError::Payload {
            message: "Register data item has an empty key".to_string(),
        })?;
        if item.values.len() != labels.len() {
            return Err(RegisterError::Payload {
                message: format!(
                    "Register row {code} has {} values for {} columns",
                    item.values.len(),
                    labels.len()
                ),
            });
        }
        let cells: BTreeMap<&str, &str> = labels
            .iter()
            .copied()
            .zip(item.values.iter().map(String::as_str))
            .collect();

        let postal_code = PostalCode::new(code)?;
        let row = area_row_from_cells(&postal_code, &cells)?;
        table.insert(postal_code, row);
    }
    Ok(table)
}

/// Looks up one required cell by column label.
fn cell<'a>(cells: &BTreeMap<&str, &'a str>, column: &str) -> Result<&'a str, RegisterError> {
    cells
        .get(column)
        .copied()
        .ok_or_else(|| RegisterError::Payload {
            message: format!("Register response is missing column {column:?}"),
        })
}

/// Builds an [`AreaRow`] from labeled cells, erroring on any missing
/// required column.
fn area_row_from_cells(
    postal_code: &PostalCode,
    cells: &BTreeMap<&str, &str>,
) -> Result<AreaRow, RegisterError> {
    let code = postal_code.as_str();
    Ok(AreaRow {
        postal_code: postal_code.clone(),
        population: parse_count(cell(cells, columns::POPULATION)?, code, columns::POPULATION)?,
        mean_age: parse_value(cell(cells, columns::MEAN_AGE)?, code, columns::MEAN_AGE)?,
        students: parse_count(cell(cells, columns::STUDENTS)?, code, columns::STUDENTS)?,
        employed: parse_count(cell(cells, columns::EMPLOYED)?, code, columns::EMPLOYED)?,
        unemployed: parse_count(cell(cells, columns::UNEMPLOYED)?, code, columns::UNEMPLOYED)?,
        pensioners: parse_count(cell(cells, columns::PENSIONERS)?, code, columns::PENSIONERS)?,
        bachelor_degrees: parse_count(
            cell(cells, columns::BACHELOR_DEGREES)?,
            code,
            columns::BACHELOR_DEGREES,
        )?,
        master_degrees: parse_count(
            cell(cells, columns::MASTER_DEGREES)?,
            code,
            columns::MASTER_DEGREES,
        )?,
        households: parse_count(cell(cells, columns::HOUSEHOLDS)?, code, columns::HOUSEHOLDS)?,
        rented_households: parse_count(
            cell(cells, columns::RENTED_HOUSEHOLDS)?,
            code,
            columns::RENTED_HOUSEHOLDS,
        )?,
        dwellings: parse_count(cell(cells, columns::DWELLINGS)?, code, columns::DWELLINGS)?,
        block_dwellings: parse_count(
            cell(cells, columns::BLOCK_DWELLINGS)?,
            code,
            columns::BLOCK_DWELLINGS,
        )?,
        housing_density: parse_value(
            cell(cells, columns::HOUSING_DENSITY)?,
            code,
            columns::HOUSING_DENSITY,
        )?,
        median_income: parse_value(cell(cells, columns::MEDIAN_INCOME)?, code, columns::MEDIAN_INCOME)?,
        land_area: parse_value(cell(cells, columns::LAND_AREA)?, code, columns::LAND_AREA)?,
    })
}

/// Parses the per-area apartment price response.
///
/// Items are keyed `[year, postal_code]`; the single value is the €/m²
/// price with a dot thousands separator.
///
/// # Errors
///
/// Returns [`RegisterError`] on malformed payloads or unparseable
/// prices.
pub fn parse_area_price_response(response: &PxResponse) -> Result<AreaPriceTable, RegisterError> {
    let mut table = AreaPriceTable::new();
    for item in &response.data {
        let code = item.key.get(1).ok_or_else(|| RegisterError::Payload {
            message: "Area price item is missing the postal code key".to_string(),
        })?;
        let raw = item.values.first().ok_or_else(|| RegisterError::Payload {
            message: format!("Area price item for {code} has no value"),
        })?;
        let price = parse_price(raw, code, columns::PRICE_PER_M2)?;
        table.insert(PostalCode::new(code)?, price);
    }
    Ok(table)
}

/// Parses the per-municipality apartment price response.
///
/// Items are keyed `[year, municipality_code]`; codes resolve through
/// the fixed StatFin code table. A code outside the tracked six is a
/// payload error since the query selects exactly those codes.
///
/// # Errors
///
/// Returns [`RegisterError`] on malformed payloads, unknown municipality
/// codes, or unparseable prices.
pub fn parse_municipality_price_response(
    response: &PxResponse,
) -> Result<MunicipalityPriceTable, RegisterError> {
    let mut table = MunicipalityPriceTable::new();
    for item in &response.data {
        let code = item.key.get(1).ok_or_else(|| RegisterError::Payload {
            message: "Municipality price item is missing the code key".to_string(),
        })?;
        let municipality =
            Municipality::from_code(code).ok_or_else(|| RegisterError::UnknownMunicipality {
                code: code.clone(),
            })?;
        let raw = item.values.first().ok_or_else(|| RegisterError::Payload {
            message: format!("Municipality price item for {code} has no value"),
        })?;
        let price = parse_value(raw, code, columns::PRICE_PER_M2)?;
        table.insert(municipality, price);
    }
    Ok(table)
}
