//! Feature derivation and imputation.
//!
//! Two passes over read-only inputs: pass 1 computes immutable
//! population-weighted municipality aggregates, pass 2 emits one
//! feature row per mapping entry. The fallback chain for every
//! indicator is own value → municipality aggregate → zero; degenerate
//! denominators resolve through the chain and never produce NaN.

use std::collections::BTreeMap;

use area_match_features_models::{FeatureRow, Indicator, MunicipalityAggregates};
use area_match_register_models::{
    AreaPriceTable, AreaRow, MappingEntry, Municipality, MunicipalityPriceTable, RegisterTable,
};

use crate::FeatureError;

/// Input tables for one derivation run. All borrowed read-only; the
/// derivation never mutates a table it was given.
#[derive(Debug, Clone, Copy)]
pub struct DeriveInput<'a> {
    /// Postal-code → municipality mapping; defines the output row set.
    pub mapping: &'a [MappingEntry],
    /// Current register snapshot.
    pub latest: &'a RegisterTable,
    /// Register snapshot from five years earlier (population growth).
    pub old: &'a RegisterTable,
    /// Apartment prices per postal code area.
    pub area_prices: &'a AreaPriceTable,
    /// Apartment prices per municipality.
    pub municipality_prices: &'a MunicipalityPriceTable,
}

/// Derives one feature row per mapping entry.
///
/// # Errors
///
/// Returns [`FeatureError::MissingArea`] if a mapped postal code has no
/// row in the current register snapshot. A code absent from the *old*
/// snapshot is not an error; its growth falls back to zero.
pub fn derive_features(input: &DeriveInput<'_>) -> Result<Vec<FeatureRow>, FeatureError> {
    let aggregates = municipality_aggregates(input);

    let mut rows = Vec::with_capacity(input.mapping.len());
    for entry in input.mapping {
        let Some(area) = input.latest.get(&entry.postal_code) else {
            log::error!(
                "Postal code {} ({}) is missing from the register snapshot",
                entry.postal_code,
                entry.municipality
            );
            return Err(FeatureError::MissingArea {
                postal_code: entry.postal_code.to_string(),
            });
        };
        let aggregate = aggregates
            .get(&entry.municipality)
            .copied()
            .unwrap_or_default();
        rows.push(derive_row(entry, area, input, &aggregate));
    }
    Ok(rows)
}

/// Division that resolves a non-positive denominator to zero instead
/// of NaN/∞.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Pass 1: population-weighted fallback aggregates per municipality.
///
/// Weighted means are taken over areas with a valid (nonzero) value
/// only, so suppressed rows do not drag the fallback toward zero.
/// Mapped codes without a register row are skipped here; pass 2 turns
/// them into the fatal join error.
fn municipality_aggregates(
    input: &DeriveInput<'_>,
) -> BTreeMap<Municipality, MunicipalityAggregates> {
    #[derive(Default)]
    struct Accumulator {
        age_weighted: f64,
        age_weight: f64,
        density_weighted: f64,
        density_weight: f64,
        income_weighted: f64,
        income_weight: f64,
        unemployed: f64,
        employed: f64,
    }

    let mut accumulators: BTreeMap<Municipality, Accumulator> = BTreeMap::new();
    for entry in input.mapping {
        let Some(area) = input.latest.get(&entry.postal_code) else {
            continue;
        };
        let acc = accumulators.entry(entry.municipality).or_default();
        let weight = f64::from(area.population);

        if area.mean_age != 0.0 {
            acc.age_weighted += weight * area.mean_age;
            acc.age_weight += weight;
        }
        if area.housing_density != 0.0 {
            acc.density_weighted += weight * area.housing_density;
            acc.density_weight += weight;
        }
        if area.median_income != 0.0 {
            acc.income_weighted += weight * area.median_income;
            acc.income_weight += weight;
        }
        acc.unemployed += f64::from(area.unemployed);
        acc.employed += f64::from(area.employed);
    }

    accumulators
        .into_iter()
        .map(|(municipality, acc)| {
            let aggregates = MunicipalityAggregates {
                mean_age: ratio(acc.age_weighted, acc.age_weight),
                housing_density: ratio(acc.density_weighted, acc.density_weight),
                median_income: ratio(acc.income_weighted, acc.income_weight),
                unemployment_rate: ratio(acc.unemployed, acc.unemployed + acc.employed),
            };
            (municipality, aggregates)
        })
        .collect()
}

/// Pass 2: one feature row from one register row plus its
/// municipality's aggregates.
fn derive_row(
    entry: &MappingEntry,
    area: &AreaRow,
    input: &DeriveInput<'_>,
    aggregate: &MunicipalityAggregates,
) -> FeatureRow {
    let population = f64::from(area.population);
    let mut row = FeatureRow {
        postal_code: entry.postal_code.clone(),
        municipality: entry.municipality,
        values: [0.0; Indicator::COUNT],
    };

    let area_price = input
        .area_prices
        .get(&entry.postal_code)
        .copied()
        .unwrap_or(0.0);
    let price = if area_price > 0.0 {
        area_price
    } else {
        input
            .municipality_prices
            .get(&entry.municipality)
            .copied()
            .unwrap_or(0.0)
    };
    row.set(Indicator::ApartmentPrice, price);

    let growth = input.old.get(&entry.postal_code).map_or(0.0, |old| {
        let old_population = f64::from(old.population);
        ratio(population - old_population, old_population)
    });
    row.set(Indicator::PopulationGrowth, growth);

    let middle_age = if area.mean_age == 0.0 {
        aggregate.mean_age
    } else {
        area.mean_age
    };
    row.set(Indicator::MiddleAge, middle_age);

    row.set(
        Indicator::StudentRatio,
        ratio(f64::from(area.students), population),
    );

    // The workforce division is undefined both for empty areas and for
    // areas whose employment figures are suppressed; either way the
    // municipality rate substitutes, and zero only if the whole
    // municipality lacks workforce data.
    let workforce = f64::from(area.unemployed) + f64::from(area.employed);
    let unemployment = if population == 0.0 || workforce == 0.0 {
        aggregate.unemployment_rate
    } else {
        f64::from(area.unemployed) / workforce
    };
    row.set(Indicator::UnemploymentRate, unemployment);

    row.set(
        Indicator::PensionerRatio,
        ratio(f64::from(area.pensioners), population),
    );

    let housing_density = if area.housing_density == 0.0 {
        aggregate.housing_density
    } else {
        area.housing_density
    };
    row.set(Indicator::HousingDensity, housing_density);

    row.set(
        Indicator::PopulationDensity,
        ratio(population, area.land_area),
    );

    let median_income = if area.median_income == 0.0 {
        aggregate.median_income
    } else {
        area.median_income
    };
    row.set(Indicator::MedianIncome, median_income);

    row.set(
        Indicator::HigherEducationRatio,
        ratio(
            f64::from(area.bachelor_degrees) + f64::from(area.master_degrees),
            population,
        ),
    );
    row.set(
        Indicator::RentedRatio,
        ratio(f64::from(area.rented_households), f64::from(area.households)),
    );
    row.set(
        Indicator::BlockApartmentRatio,
        ratio(f64::from(area.block_dwellings), f64::from(area.dwellings)),
    );

    row
}

#[cfg(test)]
mod tests {
    use area_match_register_models::PostalCode;

    use super::*;

    fn code(raw: &str) -> PostalCode {
        PostalCode::new(raw).unwrap()
    }

    fn entry(raw: &str, municipality: Municipality) -> MappingEntry {
        MappingEntry {
            postal_code: code(raw),
            name: format!("Area {raw}"),
            municipality,
        }
    }

    fn area(raw: &str, population: u32) -> AreaRow {
        AreaRow {
            postal_code: code(raw),
            population,
            mean_age: 40.0,
            students: population / 10,
            employed: population / 2,
            unemployed: population / 20,
            pensioners: population / 5,
            bachelor_degrees: population / 10,
            master_degrees: population / 10,
            households: population / 2,
            rented_households: population / 4,
            dwellings: population / 2,
            block_dwellings: population / 3,
            housing_density: 35.0,
            median_income: 25_000.0,
            land_area: 2.0,
        }
    }

    fn table(rows: Vec<AreaRow>) -> RegisterTable {
        rows.into_iter()
            .map(|row| (row.postal_code.clone(), row))
            .collect()
    }

    #[test]
    fn derives_one_row_per_mapping_entry() {
        let mapping = vec![
            entry("00100", Municipality::Helsinki),
            entry("00200", Municipality::Helsinki),
        ];
        let latest = table(vec![area("00100", 10_000), area("00200", 5_000)]);
        let old = table(vec![area("00100", 8_000), area("00200", 5_000)]);
        let input = DeriveInput {
            mapping: &mapping,
            latest: &latest,
            old: &old,
            area_prices: &AreaPriceTable::new(),
            municipality_prices: &MunicipalityPriceTable::new(),
        };

        let rows = derive_features(&input).unwrap();
        assert_eq!(rows.len(), 2);
        assert!((rows[0].get(Indicator::PopulationGrowth) - 0.25).abs() < 1e-12);
        assert!((rows[1].get(Indicator::PopulationGrowth) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn mapped_code_without_register_row_is_a_join_error() {
        let mapping = vec![entry("00100", Municipality::Helsinki)];
        let latest = RegisterTable::new();
        let input = DeriveInput {
            mapping: &mapping,
            latest: &latest,
            old: &latest,
            area_prices: &AreaPriceTable::new(),
            municipality_prices: &MunicipalityPriceTable::new(),
        };

        match derive_features(&input).unwrap_err() {
            FeatureError::MissingArea { postal_code } => assert_eq!(postal_code, "00100"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn suppressed_workforce_falls_back_to_municipality_rate() {
        // One area has no employment figures; the other two give the
        // municipality 800 / (800 + 9200) = 0.08.
        let mut suppressed = area("00300", 4_000);
        suppressed.unemployed = 0;
        suppressed.employed = 0;
        let mut a = area("00100", 10_000);
        a.unemployed = 500;
        a.employed = 5_700;
        let mut b = area("00200", 8_000);
        b.unemployed = 300;
        b.employed = 3_500;

        let mapping = vec![
            entry("00100", Municipality::Helsinki),
            entry("00200", Municipality::Helsinki),
            entry("00300", Municipality::Helsinki),
        ];
        let latest = table(vec![a, b, suppressed]);
        let input = DeriveInput {
            mapping: &mapping,
            latest: &latest,
            old: &RegisterTable::new(),
            area_prices: &AreaPriceTable::new(),
            municipality_prices: &MunicipalityPriceTable::new(),
        };

        let rows = derive_features(&input).unwrap();
        let rate = rows[2].get(Indicator::UnemploymentRate);
        assert!((rate - 0.08).abs() < 1e-12, "got {rate}");
    }

    #[test]
    fn empty_area_uses_aggregates_and_stays_finite() {
        let mut empty = area("00300", 0);
        empty.mean_age = 0.0;
        empty.students = 0;
        empty.employed = 0;
        empty.unemployed = 0;
        empty.pensioners = 0;
        empty.bachelor_degrees = 0;
        empty.master_degrees = 0;
        empty.households = 0;
        empty.rented_households = 0;
        empty.dwellings = 0;
        empty.block_dwellings = 0;
        empty.housing_density = 0.0;
        empty.median_income = 0.0;

        let mapping = vec![
            entry("00100", Municipality::Helsinki),
            entry("00300", Municipality::Helsinki),
        ];
        let latest = table(vec![area("00100", 10_000), empty]);
        let input = DeriveInput {
            mapping: &mapping,
            latest: &latest,
            old: &RegisterTable::new(),
            area_prices: &AreaPriceTable::new(),
            municipality_prices: &MunicipalityPriceTable::new(),
        };

        let rows = derive_features(&input).unwrap();
        let empty_row = &rows[1];
        for indicator in Indicator::ALL {
            assert!(
                empty_row.get(*indicator).is_finite(),
                "{indicator:?} is not finite"
            );
        }
        // Weighted aggregates come from the one populated area.
        assert!((empty_row.get(Indicator::MiddleAge) - 40.0).abs() < 1e-12);
        assert!((empty_row.get(Indicator::HousingDensity) - 35.0).abs() < 1e-12);
        assert!((empty_row.get(Indicator::MedianIncome) - 25_000.0).abs() < 1e-12);
        // Zero population over positive land area: density is zero, the
        // log floor in normalization handles it from here.
        assert!((empty_row.get(Indicator::PopulationDensity) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn apartment_price_falls_back_to_municipality_price() {
        let mapping = vec![
            entry("00100", Municipality::Helsinki),
            entry("00200", Municipality::Helsinki),
            entry("02100", Municipality::Espoo),
        ];
        let latest = table(vec![
            area("00100", 10_000),
            area("00200", 5_000),
            area("02100", 7_000),
        ]);
        let mut area_prices = AreaPriceTable::new();
        area_prices.insert(code("00100"), 8_100.0);
        let mut municipality_prices = MunicipalityPriceTable::new();
        municipality_prices.insert(Municipality::Helsinki, 5_200.0);

        let input = DeriveInput {
            mapping: &mapping,
            latest: &latest,
            old: &RegisterTable::new(),
            area_prices: &area_prices,
            municipality_prices: &municipality_prices,
        };

        let rows = derive_features(&input).unwrap();
        assert!((rows[0].get(Indicator::ApartmentPrice) - 8_100.0).abs() < 1e-12);
        assert!((rows[1].get(Indicator::ApartmentPrice) - 5_200.0).abs() < 1e-12);
        // Espoo has neither an area nor a municipality price.
        assert!((rows[2].get(Indicator::ApartmentPrice) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn all_indicators_finite_over_adversarial_rows() {
        let mut rows = Vec::new();
        let mut mapping = Vec::new();
        for (i, population) in [0_u32, 1, 100, 10_000].iter().enumerate() {
            let raw = format!("0010{i}");
            let mut a = area(&raw, *population);
            if i % 2 == 0 {
                a.land_area = 0.0;
                a.median_income = 0.0;
                a.housing_density = 0.0;
            }
            mapping.push(entry(&raw, Municipality::Vantaa));
            rows.push(a);
        }
        let latest = table(rows);
        let input = DeriveInput {
            mapping: &mapping,
            latest: &latest,
            old: &RegisterTable::new(),
            area_prices: &AreaPriceTable::new(),
            municipality_prices: &MunicipalityPriceTable::new(),
        };

        for row in derive_features(&input).unwrap() {
            for indicator in Indicator::ALL {
                assert!(
                    row.get(*indicator).is_finite(),
                    "{indicator:?} not finite for {}",
                    row.postal_code
                );
            }
        }
    }
}
