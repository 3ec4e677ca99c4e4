#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature vector and indicator types.
//!
//! The 12 socioeconomic indicators form a fixed, ordered feature space:
//! the enum order defines both the CSV column order of every feature
//! table and the dimensions compared by the nearest-neighbor distance.
//! Changing the order is a breaking change to persisted tables.

use area_match_register_models::{Municipality, PostalCode};
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

/// The socioeconomic indicators derived per postal-code area, in fixed
/// feature-space order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum Indicator {
    /// Apartment price, €/m².
    ApartmentPrice,
    /// Population growth ratio over the 5-year window.
    PopulationGrowth,
    /// Mean age of residents.
    MiddleAge,
    /// Students / population.
    StudentRatio,
    /// Unemployed / (unemployed + employed).
    UnemploymentRate,
    /// Pensioners / population.
    PensionerRatio,
    /// Average floor area per person.
    HousingDensity,
    /// Population / land area.
    PopulationDensity,
    /// Median income of residents.
    MedianIncome,
    /// (Bachelor + master degree holders) / population.
    HigherEducationRatio,
    /// Rented households / total households.
    RentedRatio,
    /// Block-of-flats dwellings / total dwellings.
    BlockApartmentRatio,
}

impl Indicator {
    /// Number of indicators — the dimensionality of the feature space.
    pub const COUNT: usize = 12;

    /// All indicators in fixed feature-space order.
    pub const ALL: &[Self] = &[
        Self::ApartmentPrice,
        Self::PopulationGrowth,
        Self::MiddleAge,
        Self::StudentRatio,
        Self::UnemploymentRate,
        Self::PensionerRatio,
        Self::HousingDensity,
        Self::PopulationDensity,
        Self::MedianIncome,
        Self::HigherEducationRatio,
        Self::RentedRatio,
        Self::BlockApartmentRatio,
    ];

    /// Position of this indicator in the feature vector.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// CSV column label for this indicator, matching the app export
    /// schema.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ApartmentPrice => "Apartment price",
            Self::PopulationGrowth => "Change in population",
            Self::MiddleAge => "Middle age",
            Self::StudentRatio => "Student ratio",
            Self::UnemploymentRate => "Unemployment rate",
            Self::PensionerRatio => "Pensioner ratio",
            Self::HousingDensity => "Housing density",
            Self::PopulationDensity => "Population density",
            Self::MedianIncome => "Median income",
            Self::HigherEducationRatio => "Higher education ratio",
            Self::RentedRatio => "Households living on rent ratio",
            Self::BlockApartmentRatio => "Block apartment ratio",
        }
    }
}

/// A derived feature row: the 12-indicator vector for one postal-code
/// area, indexed by [`Indicator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Postal code of the area.
    pub postal_code: PostalCode,
    /// Owning municipality.
    pub municipality: Municipality,
    /// Indicator values in [`Indicator::ALL`] order. All finite after
    /// derivation.
    pub values: [f64; Indicator::COUNT],
}

impl FeatureRow {
    /// Returns the value of one indicator.
    #[must_use]
    pub const fn get(&self, indicator: Indicator) -> f64 {
        self.values[indicator.index()]
    }

    /// Sets the value of one indicator.
    pub const fn set(&mut self, indicator: Indicator, value: f64) {
        self.values[indicator.index()] = value;
    }
}

/// Population-weighted municipality-level fallback values, used to
/// impute indicators for areas whose register row carries the missing
/// sentinel. Recomputed from the current batch every run, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MunicipalityAggregates {
    /// Population-weighted mean of resident mean age.
    pub mean_age: f64,
    /// Population-weighted mean floor area per person.
    pub housing_density: f64,
    /// Population-weighted mean of median income.
    pub median_income: f64,
    /// Σ unemployed / (Σ unemployed + Σ employed) over the municipality.
    pub unemployment_rate: f64,
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn indicator_order_is_stable() {
        let iterated: Vec<Indicator> = Indicator::iter().collect();
        assert_eq!(iterated.as_slice(), Indicator::ALL);
        assert_eq!(Indicator::ALL.len(), Indicator::COUNT);
    }

    #[test]
    fn indicator_indexes_match_positions() {
        for (position, indicator) in Indicator::ALL.iter().enumerate() {
            assert_eq!(indicator.index(), position);
        }
    }

    #[test]
    fn indicator_labels_are_unique() {
        let mut labels: Vec<&str> = Indicator::ALL.iter().map(|i| i.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Indicator::COUNT);
    }
}
