//! CSV export of the similarity mapping table.
//!
//! Comma-separated with every field quoted (the app export
//! convention): one row per source postal code, one column per city,
//! the source's own city cell left empty.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use area_match_register_models::Municipality;

use crate::{MatchError, SimilarityRow};

/// Similarity mapping table file name.
pub const MAPPINGS_FILE: &str = "living_area_mappings.csv";

/// Writes the similarity mapping table.
///
/// # Errors
///
/// Returns [`MatchError`] on I/O or serialization failure.
pub fn write_mappings(path: &Path, rows: &[SimilarityRow]) -> Result<(), MatchError> {
    write_mappings_to(File::create(path)?, rows)
}

fn write_mappings_to<W: Write>(out: W, rows: &[SimilarityRow]) -> Result<(), MatchError> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(out);

    let mut header = vec!["Postal code"];
    header.extend(Municipality::ALL.iter().map(|m| m.as_str()));
    wtr.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.postal_code.as_str().to_string()];
        record.extend(row.matches.iter().map(|matched| {
            matched
                .as_ref()
                .map_or_else(String::new, |code| code.as_str().to_string())
        }));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use area_match_register_models::PostalCode;

    use super::*;

    #[test]
    fn writes_quoted_rows_with_empty_own_city_cell() {
        let mut matches: [Option<PostalCode>; Municipality::ALL.len()] = Default::default();
        matches[Municipality::Espoo.position()] = Some(PostalCode::new("02100").unwrap());
        matches[Municipality::Vantaa.position()] = Some(PostalCode::new("01300").unwrap());
        matches[Municipality::Turku.position()] = Some(PostalCode::new("20100").unwrap());
        matches[Municipality::Tampere.position()] = Some(PostalCode::new("33100").unwrap());
        matches[Municipality::Oulu.position()] = Some(PostalCode::new("90100").unwrap());

        let rows = vec![SimilarityRow {
            postal_code: PostalCode::new("00100").unwrap(),
            municipality: Municipality::Helsinki,
            matches,
        }];

        let mut buffer = Vec::new();
        write_mappings_to(&mut buffer, &rows).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "\"Postal code\",\"Helsinki\",\"Espoo\",\"Vantaa\",\"Turku\",\"Tampere\",\"Oulu\""
        );
        assert_eq!(
            lines.next().unwrap(),
            "\"00100\",\"\",\"02100\",\"01300\",\"20100\",\"33100\",\"90100\""
        );
    }
}
