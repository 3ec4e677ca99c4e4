#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Feature derivation and normalization for postal-code areas.
//!
//! [`derive`] turns raw register rows into 12-indicator feature
//! vectors, imputing gaps with population-weighted municipality
//! fallbacks. [`normalize`] standardizes each municipality's rows
//! against its own distribution, so downstream distances compare an
//! area's position within its city rather than absolute magnitudes.

pub mod derive;
pub mod normalize;
pub mod store;

use std::collections::BTreeMap;

use area_match_features_models::FeatureRow;
use area_match_register_models::{Municipality, PostalCodeError};

/// Errors that can occur during feature derivation or persistence.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// A postal code referenced by the mapping table has no register
    /// row (join failure).
    #[error("Postal code {postal_code} is in the mapping table but missing from the register")]
    MissingArea {
        /// The unmatched postal code.
        postal_code: String,
    },

    /// CSV read/write failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted feature table row could not be parsed.
    #[error("Malformed feature table row: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// A postal code failed validation.
    #[error(transparent)]
    PostalCode(#[from] PostalCodeError),
}

/// Groups feature rows by municipality, preserving relative row order
/// within each group.
#[must_use]
pub fn group_by_municipality(rows: Vec<FeatureRow>) -> BTreeMap<Municipality, Vec<FeatureRow>> {
    let mut groups: BTreeMap<Municipality, Vec<FeatureRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.municipality).or_default().push(row);
    }
    groups
}
