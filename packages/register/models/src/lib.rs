#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data model for the Statistics Finland postal-code-area registers.
//!
//! Defines the six tracked municipalities, the zero-padded postal code
//! key type, and the raw table row types produced by the extraction
//! layer and consumed by feature derivation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The six municipalities covered by the similarity mapping, in the
/// fixed column order used by every output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Municipality {
    /// Helsinki (StatFin code 091).
    Helsinki,
    /// Espoo (StatFin code 049).
    Espoo,
    /// Vantaa (StatFin code 092).
    Vantaa,
    /// Turku (StatFin code 853).
    Turku,
    /// Tampere (StatFin code 837).
    Tampere,
    /// Oulu (StatFin code 564).
    Oulu,
}

impl Municipality {
    /// All tracked municipalities in fixed output-column order.
    pub const ALL: &[Self] = &[
        Self::Helsinki,
        Self::Espoo,
        Self::Vantaa,
        Self::Turku,
        Self::Tampere,
        Self::Oulu,
    ];

    /// Returns the municipality name as it appears in the source data.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Helsinki => "Helsinki",
            Self::Espoo => "Espoo",
            Self::Vantaa => "Vantaa",
            Self::Turku => "Turku",
            Self::Tampere => "Tampere",
            Self::Oulu => "Oulu",
        }
    }

    /// Parses a municipality name (exact match, as emitted by StatFin).
    ///
    /// Returns `None` for municipalities outside the tracked six.
    #[must_use]
    pub fn parse_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.as_str() == name)
    }

    /// Position of this municipality in [`Self::ALL`] (the fixed
    /// output-column order).
    #[must_use]
    pub const fn position(self) -> usize {
        match self {
            Self::Helsinki => 0,
            Self::Espoo => 1,
            Self::Vantaa => 2,
            Self::Turku => 3,
            Self::Tampere => 4,
            Self::Oulu => 5,
        }
    }

    /// Resolves a StatFin municipality code (e.g., `"091"`) to a
    /// municipality.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "049" => Some(Self::Espoo),
            "091" => Some(Self::Helsinki),
            "092" => Some(Self::Vantaa),
            "564" => Some(Self::Oulu),
            "837" => Some(Self::Tampere),
            "853" => Some(Self::Turku),
            _ => None,
        }
    }
}

impl std::fmt::Display for Municipality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced when constructing a [`PostalCode`].
#[derive(Debug, thiserror::Error)]
pub enum PostalCodeError {
    /// Input is longer than 5 characters.
    #[error("Postal code too long: {0:?}")]
    TooLong(String),
    /// Input contains a non-digit character.
    #[error("Postal code is not numeric: {0:?}")]
    NotNumeric(String),
    /// Input is empty.
    #[error("Postal code is empty")]
    Empty,
}

/// A Finnish postal code: a 5-character numeric string, zero-padded.
///
/// Postal codes are the unique key joining every table in a run. They
/// must stay strings end to end; parsing `"00100"` as an integer and
/// re-printing it would silently corrupt the key. Deserialization runs
/// through [`PostalCode::new`], so codes read back from CSV are
/// re-padded and validated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostalCode(String);

impl Serialize for PostalCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PostalCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}

impl PostalCode {
    /// Builds a postal code, left-padding with zeros to 5 characters.
    ///
    /// Padding is idempotent: a 5-character input passes through
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PostalCodeError`] if the input is empty, longer than 5
    /// characters, or contains non-digit characters.
    pub fn new(raw: &str) -> Result<Self, PostalCodeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PostalCodeError::Empty);
        }
        if trimmed.len() > 5 {
            return Err(PostalCodeError::TooLong(trimmed.to_string()));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PostalCodeError::NotNumeric(trimmed.to_string()));
        }
        Ok(Self(format!("{trimmed:0>5}")))
    }

    /// Returns the zero-padded string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PostalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the Paavo postal-code-area register.
///
/// Raw counts as delivered by StatFin, after missing-data placeholders
/// (`"..."`, `".."`, `"."`) have been normalized to zero. Zero doubles
/// as the missing sentinel throughout derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRow {
    /// Postal code of the area.
    pub postal_code: PostalCode,
    /// Total population ("Asukkaat yhteensä").
    pub population: u32,
    /// Mean age of residents ("Asukkaiden keski-ikä").
    pub mean_age: f64,
    /// Students ("Opiskelijat").
    pub students: u32,
    /// Employed residents ("Työlliset").
    pub employed: u32,
    /// Unemployed residents ("Työttömät").
    pub unemployed: u32,
    /// Pensioners ("Eläkeläiset").
    pub pensioners: u32,
    /// Residents with a lower university degree ("Alemman
    /// korkeakoulututkinnon suorittaneet").
    pub bachelor_degrees: u32,
    /// Residents with a higher university degree ("Ylemmän
    /// korkeakoulututkinnon suorittaneet").
    pub master_degrees: u32,
    /// Households in total ("Taloudet yhteensä").
    pub households: u32,
    /// Households living in rented dwellings ("Vuokra-asunnoissa asuvat
    /// taloudet").
    pub rented_households: u32,
    /// Dwellings in total ("Asunnot").
    pub dwellings: u32,
    /// Dwellings in blocks of flats ("Kerrostaloasunnot").
    pub block_dwellings: u32,
    /// Average floor area per person ("Asumisväljyys").
    pub housing_density: f64,
    /// Median income of residents ("Asukkaiden mediaanitulot").
    pub median_income: f64,
    /// Surface area of the postal code area, km².
    pub land_area: f64,
}

/// A register snapshot: one [`AreaRow`] per postal code, keyed for the
/// join in feature derivation. `BTreeMap` keeps iteration order stable.
pub type RegisterTable = BTreeMap<PostalCode, AreaRow>;

/// One entry of the postal-code mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Postal code of the area.
    pub postal_code: PostalCode,
    /// Human-readable area name (e.g., "Kaartinkaupunki").
    pub name: String,
    /// Owning municipality.
    pub municipality: Municipality,
}

/// Apartment prices per postal code area, €/m².
pub type AreaPriceTable = BTreeMap<PostalCode, f64>;

/// Apartment prices per municipality, €/m².
pub type MunicipalityPriceTable = BTreeMap<Municipality, f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_postal_code() {
        let code = PostalCode::new("100").unwrap();
        assert_eq!(code.as_str(), "00100");
    }

    #[test]
    fn padding_is_idempotent() {
        let code = PostalCode::new("00100").unwrap();
        let repadded = PostalCode::new(code.as_str()).unwrap();
        assert_eq!(code, repadded);
        assert_eq!(repadded.as_str(), "00100");
    }

    #[test]
    fn rejects_long_postal_code() {
        assert!(matches!(
            PostalCode::new("001000"),
            Err(PostalCodeError::TooLong(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_postal_code() {
        assert!(matches!(
            PostalCode::new("0010a"),
            Err(PostalCodeError::NotNumeric(_))
        ));
    }

    #[test]
    fn rejects_empty_postal_code() {
        assert!(matches!(PostalCode::new("  "), Err(PostalCodeError::Empty)));
    }

    #[test]
    fn postal_codes_order_numerically() {
        let low = PostalCode::new("100").unwrap();
        let high = PostalCode::new("90100").unwrap();
        assert!(low < high);
    }

    #[test]
    fn resolves_all_municipality_codes() {
        let pairs = [
            ("049", Municipality::Espoo),
            ("091", Municipality::Helsinki),
            ("092", Municipality::Vantaa),
            ("564", Municipality::Oulu),
            ("837", Municipality::Tampere),
            ("853", Municipality::Turku),
        ];
        for (code, expected) in pairs {
            assert_eq!(Municipality::from_code(code), Some(expected));
        }
        assert_eq!(Municipality::from_code("179"), None);
    }

    #[test]
    fn parses_tracked_municipality_names() {
        assert_eq!(
            Municipality::parse_name("Helsinki"),
            Some(Municipality::Helsinki)
        );
        assert_eq!(Municipality::parse_name("Rovaniemi"), None);
    }
}
