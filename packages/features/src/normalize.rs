//! Per-municipality feature standardization.
//!
//! Each municipality's rows are z-scored against that municipality's
//! own mean and standard deviation, so a feature value expresses the
//! area's position within its city's distribution. Two transforms run
//! before standardization: the population-growth ratio is clipped (an
//! area that grew from near-zero population would otherwise dominate
//! the distance), and population density is log-scaled to tame its
//! long right tail.

use area_match_features_models::{FeatureRow, Indicator};

/// Tunables for the normalization pass.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeConfig {
    /// Ceiling applied to the population-growth ratio before
    /// standardization.
    pub growth_clip: f64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        // 200% growth.
        Self { growth_clip: 2.0 }
    }
}

/// Standardizes one municipality's feature rows.
///
/// The caller groups rows by municipality; all rows passed here must
/// belong to the same group. Output row order matches input order.
/// A single-row group (standard deviation zero) standardizes to
/// all-zero vectors rather than dividing by zero.
#[must_use]
pub fn normalize_group(rows: &[FeatureRow], config: &NormalizeConfig) -> Vec<FeatureRow> {
    let mut out: Vec<FeatureRow> = rows.to_vec();
    if out.is_empty() {
        return out;
    }

    clip_growth(&mut out, config.growth_clip);
    log_scale_density(&mut out);

    for indicator in Indicator::ALL {
        standardize(&mut out, *indicator);
    }
    out
}

/// Caps the population-growth ratio at `ceiling`.
fn clip_growth(rows: &mut [FeatureRow], ceiling: f64) {
    for row in rows {
        let growth = row.get(Indicator::PopulationGrowth);
        if growth > ceiling {
            row.set(Indicator::PopulationGrowth, ceiling);
        }
    }
}

/// Log-transforms population density.
///
/// Non-positive densities (an area with zero population) take the
/// minimum log-density observed among the group's positive values,
/// computed before any substitution. A group with no positive density
/// at all keeps zero.
fn log_scale_density(rows: &mut [FeatureRow]) {
    let floor = rows
        .iter()
        .map(|row| row.get(Indicator::PopulationDensity))
        .filter(|density| *density > 0.0)
        .map(f64::ln)
        .fold(f64::INFINITY, f64::min);
    let floor = if floor.is_finite() { floor } else { 0.0 };

    for row in rows {
        let density = row.get(Indicator::PopulationDensity);
        let scaled = if density > 0.0 { density.ln() } else { floor };
        row.set(Indicator::PopulationDensity, scaled);
    }
}

/// Z-scores one indicator across the group in place.
///
/// Uses the population standard deviation (no Bessel correction). A
/// zero deviation leaves values centered at zero instead of scaling.
#[allow(clippy::cast_precision_loss)]
fn standardize(rows: &mut [FeatureRow], indicator: Indicator) {
    let n = rows.len() as f64;
    let mean = rows.iter().map(|row| row.get(indicator)).sum::<f64>() / n;
    let variance = rows
        .iter()
        .map(|row| {
            let centered = row.get(indicator) - mean;
            centered * centered
        })
        .sum::<f64>()
        / n;
    let deviation = variance.sqrt();

    for row in rows {
        let centered = row.get(indicator) - mean;
        let scaled = if deviation > 0.0 {
            centered / deviation
        } else {
            0.0
        };
        row.set(indicator, scaled);
    }
}

#[cfg(test)]
mod tests {
    use area_match_register_models::{Municipality, PostalCode};

    use super::*;

    fn row(code: &str, values: [f64; Indicator::COUNT]) -> FeatureRow {
        FeatureRow {
            postal_code: PostalCode::new(code).unwrap(),
            municipality: Municipality::Helsinki,
            values,
        }
    }

    fn with(code: &str, indicator: Indicator, value: f64) -> FeatureRow {
        let mut r = row(code, [1.0; Indicator::COUNT]);
        r.set(indicator, value);
        r
    }

    #[test]
    fn group_mean_zero_and_unit_deviation() {
        let rows = vec![
            row("00100", [1.0; Indicator::COUNT]),
            row("00200", [2.0; Indicator::COUNT]),
            row("00300", [3.0; Indicator::COUNT]),
            row("00400", [6.0; Indicator::COUNT]),
        ];
        let normalized = normalize_group(&rows, &NormalizeConfig::default());
        assert_eq!(normalized.len(), rows.len());

        for indicator in Indicator::ALL {
            let mean: f64 = normalized.iter().map(|r| r.get(*indicator)).sum::<f64>() / 4.0;
            let variance: f64 = normalized
                .iter()
                .map(|r| (r.get(*indicator) - mean).powi(2))
                .sum::<f64>()
                / 4.0;
            assert!(mean.abs() < 1e-12, "{indicator:?} mean {mean}");
            assert!((variance - 1.0).abs() < 1e-9, "{indicator:?} var {variance}");
        }
    }

    #[test]
    fn growth_is_clipped_before_standardization() {
        let rows = vec![
            with("00100", Indicator::PopulationGrowth, 0.1),
            with("00200", Indicator::PopulationGrowth, 45.0),
            with("00300", Indicator::PopulationGrowth, 2.0),
        ];
        // After clipping, 45.0 becomes 2.0 and ties with the third row,
        // so both must standardize to the same value.
        let normalized = normalize_group(&rows, &NormalizeConfig::default());
        let a = normalized[1].get(Indicator::PopulationGrowth);
        let b = normalized[2].get(Indicator::PopulationGrowth);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn zero_density_takes_group_log_floor() {
        let rows = vec![
            with("00100", Indicator::PopulationDensity, f64::exp(2.0)),
            with("00200", Indicator::PopulationDensity, f64::exp(5.0)),
            with("00300", Indicator::PopulationDensity, 0.0),
        ];
        let normalized = normalize_group(&rows, &NormalizeConfig::default());
        // The zero-density area is floored to ln of the smallest
        // positive density (2.0), tying it with the first row.
        let a = normalized[0].get(Indicator::PopulationDensity);
        let b = normalized[2].get(Indicator::PopulationDensity);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn single_area_group_standardizes_to_zero() {
        let rows = vec![row("00100", [7.5; Indicator::COUNT])];
        let normalized = normalize_group(&rows, &NormalizeConfig::default());
        for indicator in Indicator::ALL {
            assert!((normalized[0].get(*indicator) - 0.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn constant_column_standardizes_to_zero() {
        let rows = vec![
            with("00100", Indicator::MedianIncome, 1.0),
            with("00200", Indicator::MedianIncome, 2.0),
        ];
        // All other columns are constant 1.0 across the group.
        let normalized = normalize_group(&rows, &NormalizeConfig::default());
        for r in &normalized {
            assert!((r.get(Indicator::StudentRatio) - 0.0).abs() < f64::EPSILON);
        }
        assert!(normalized[0].get(Indicator::MedianIncome) < 0.0);
        assert!(normalized[1].get(Indicator::MedianIncome) > 0.0);
    }

    #[test]
    fn empty_group_is_a_no_op() {
        let normalized = normalize_group(&[], &NormalizeConfig::default());
        assert!(normalized.is_empty());
    }
}
