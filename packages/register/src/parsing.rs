//! Scalar value parsing for StatFin payloads.
//!
//! StatFin encodes suppressed or unavailable data points as dot
//! placeholders (`"..."`, `".."`, `"."`). Those normalize to zero, which
//! doubles as the missing sentinel for the imputation policy. Any other
//! non-numeric token is a fatal data error naming the postal code and
//! column.

use crate::RegisterError;

/// Placeholders StatFin uses for confidential or unavailable values.
const MISSING_PLACEHOLDERS: &[&str] = &["...", "..", "."];

/// Returns `true` if the raw token is a missing-data placeholder.
#[must_use]
pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || MISSING_PLACEHOLDERS.contains(&trimmed)
}

/// Parses a numeric statistic, mapping placeholders to zero.
///
/// # Errors
///
/// Returns [`RegisterError::Value`] if the token is neither a
/// placeholder nor a number.
pub fn parse_value(raw: &str, row: &str, column: &str) -> Result<f64, RegisterError> {
    if is_missing(raw) {
        return Ok(0.0);
    }
    raw.trim()
        .parse::<f64>()
        .map_err(|_| RegisterError::Value {
            row: row.to_string(),
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// Parses a count statistic, mapping placeholders to zero.
///
/// Counts arrive as integers but occasionally with a decimal rendering
/// (`"12.0"`); anything with a fractional part is rejected.
///
/// # Errors
///
/// Returns [`RegisterError::Value`] if the token is not a non-negative
/// integer or placeholder.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_count(raw: &str, row: &str, column: &str) -> Result<u32, RegisterError> {
    let value = parse_value(raw, row, column)?;
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(RegisterError::Value {
            row: row.to_string(),
            column: column.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(value as u32)
}

/// Parses a price value, stripping the thousands separator StatFin uses
/// in the per-area apartment price table (`"2.914"` → `2914`).
///
/// # Errors
///
/// Returns [`RegisterError::Value`] if the stripped token is not
/// numeric.
pub fn parse_price(raw: &str, row: &str, column: &str) -> Result<f64, RegisterError> {
    if is_missing(raw) {
        return Ok(0.0);
    }
    let stripped = raw.trim().replace('.', "");
    if stripped.is_empty() {
        return Ok(0.0);
    }
    stripped
        .parse::<f64>()
        .map_err(|_| RegisterError::Value {
            row: row.to_string(),
            column: column.to_string(),
            value: raw.to_string(),
        })
}
