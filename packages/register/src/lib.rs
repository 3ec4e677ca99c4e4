#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Extraction of postal-code-area registers from the StatFin PxWeb API
//! and CSV persistence of the raw input tables.
//!
//! The PxWeb queries are embedded JSON templates parameterized at
//! runtime (postal-code and year selections). Fetched tables are written
//! as semicolon-separated CSV so the derivation and matching stages can
//! also run offline from a previous extraction.

pub mod fetch;
pub mod parsing;
pub mod px;
pub mod store;

use area_match_register_models::PostalCodeError;

/// Errors that can occur during register extraction or persistence.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-success status.
    #[error("API request failed with status {status}")]
    Api {
        /// HTTP status code returned by the API.
        status: reqwest::StatusCode,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API payload was missing an expected field or column.
    #[error("Malformed API payload: {message}")]
    Payload {
        /// Description of what was missing or malformed.
        message: String,
    },

    /// CSV read/write failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value that must be numeric could not be parsed.
    #[error("Invalid value {value:?} in column {column:?} for row {row}")]
    Value {
        /// Row key (postal code or municipality code) of the offending
        /// row.
        row: String,
        /// Source column name.
        column: String,
        /// The unparseable raw value.
        value: String,
    },

    /// A municipality code outside the tracked six appeared where one of
    /// them was required.
    #[error("Unknown municipality code {code:?}")]
    UnknownMunicipality {
        /// The unrecognized StatFin municipality code.
        code: String,
    },

    /// A postal code failed validation.
    #[error(transparent)]
    PostalCode(#[from] PostalCodeError),
}
