#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Cross-municipality nearest-neighbor matching.
//!
//! For every area in every municipality, finds the area with the
//! closest normalized feature vector in each of the other five
//! municipalities (exact Euclidean nearest neighbor, brute force).
//! Ties — including exact-zero distances — resolve to the earliest row
//! in ascending postal-code order, which [`MunicipalityFeatures`] pins
//! at construction so repeated runs over the same input produce
//! bit-identical mappings.
//!
//! Matching is not symmetric: A's nearest area in another city need
//! not have A as its own nearest match. Nothing here assumes it is.

pub mod store;

use std::collections::BTreeSet;

use area_match_features_models::{FeatureRow, Indicator};
use area_match_register_models::{Municipality, PostalCode};

/// Errors that can occur during matching.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// A municipality group has no rows, so no match can be produced
    /// for it.
    #[error("Municipality {municipality} has no feature rows")]
    EmptyGroup {
        /// The empty municipality.
        municipality: Municipality,
    },

    /// The same postal code appears in more than one group.
    #[error("Postal code {postal_code} appears in multiple feature tables")]
    DuplicatePostalCode {
        /// The duplicated postal code.
        postal_code: PostalCode,
    },

    /// CSV write failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One municipality's normalized feature rows in the pinned scan order.
///
/// Rows are sorted ascending by postal code at construction. The
/// nearest-neighbor scan takes the first strict minimum, so this order
/// is what makes distance ties reproducible.
#[derive(Debug, Clone)]
pub struct MunicipalityFeatures {
    municipality: Municipality,
    rows: Vec<FeatureRow>,
}

impl MunicipalityFeatures {
    /// Builds a group, sorting rows ascending by postal code.
    #[must_use]
    pub fn new(municipality: Municipality, mut rows: Vec<FeatureRow>) -> Self {
        rows.sort_by(|a, b| a.postal_code.cmp(&b.postal_code));
        Self { municipality, rows }
    }

    /// The municipality this group belongs to.
    #[must_use]
    pub const fn municipality(&self) -> Municipality {
        self.municipality
    }

    /// The rows in pinned scan order.
    #[must_use]
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }
}

/// One output row: an area and its nearest counterpart in each other
/// municipality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityRow {
    /// Source postal code.
    pub postal_code: PostalCode,
    /// Source municipality (its own column stays empty on output).
    pub municipality: Municipality,
    /// Nearest match per other municipality, in [`Municipality::ALL`]
    /// order with the source's own slot `None`.
    pub matches: [Option<PostalCode>; Municipality::ALL.len()],
}

impl SimilarityRow {
    /// Returns the matched postal code in the given municipality, or
    /// `None` for the source's own municipality.
    #[must_use]
    pub fn match_in(&self, municipality: Municipality) -> Option<&PostalCode> {
        self.matches[municipality.position()].as_ref()
    }
}

/// Computes the similarity mapping across all groups.
///
/// Output rows are ordered group-major (in the order the groups are
/// given) and postal-code-ascending within a group. Every postal code
/// present in any group appears exactly once as a source row with one
/// match per other group.
///
/// # Errors
///
/// Returns [`MatchError`] if any group is empty or a postal code
/// appears in more than one group.
pub fn compute_mappings(groups: &[MunicipalityFeatures]) -> Result<Vec<SimilarityRow>, MatchError> {
    validate_groups(groups)?;

    let mut result = Vec::with_capacity(groups.iter().map(|g| g.rows.len()).sum());
    for source_group in groups {
        log::info!(
            "Computing living area matches for {} areas in {}",
            source_group.rows.len(),
            source_group.municipality
        );
        for source in &source_group.rows {
            let mut matches: [Option<PostalCode>; Municipality::ALL.len()] = Default::default();
            for target_group in groups {
                if target_group.municipality == source_group.municipality {
                    continue;
                }
                let nearest = nearest_in_group(source, target_group);
                matches[target_group.municipality.position()] = Some(nearest.postal_code.clone());
            }
            result.push(SimilarityRow {
                postal_code: source.postal_code.clone(),
                municipality: source_group.municipality,
                matches,
            });
        }
    }
    Ok(result)
}

fn validate_groups(groups: &[MunicipalityFeatures]) -> Result<(), MatchError> {
    let mut seen: BTreeSet<&PostalCode> = BTreeSet::new();
    for group in groups {
        if group.rows.is_empty() {
            return Err(MatchError::EmptyGroup {
                municipality: group.municipality,
            });
        }
        for row in &group.rows {
            if !seen.insert(&row.postal_code) {
                return Err(MatchError::DuplicatePostalCode {
                    postal_code: row.postal_code.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Scans a target group for the row nearest to `source`.
///
/// Strict less-than comparison keeps the first minimum encountered, so
/// equidistant candidates resolve to the lowest postal code.
fn nearest_in_group<'a>(source: &FeatureRow, group: &'a MunicipalityFeatures) -> &'a FeatureRow {
    let mut best = &group.rows[0];
    let mut best_distance = distance_squared(source, best);
    for candidate in &group.rows[1..] {
        let candidate_distance = distance_squared(source, candidate);
        if candidate_distance < best_distance {
            best = candidate;
            best_distance = candidate_distance;
        }
    }
    best
}

/// Squared Euclidean distance over the 12 feature dimensions.
///
/// The square root is monotonic, so the argmin over squared distances
/// is the argmin over distances.
fn distance_squared(a: &FeatureRow, b: &FeatureRow) -> f64 {
    let mut sum = 0.0;
    for index in 0..Indicator::COUNT {
        let delta = a.values[index] - b.values[index];
        sum += delta * delta;
    }
    sum
}
