//! StatFin PxWeb API client.
//!
//! Each input table has an embedded JSON query template; the
//! postal-code and year selections are substituted at runtime before
//! the query is POSTed. Endpoint URLs come from the embedded
//! `sources.toml` and can be overridden field by field (e.g., to point
//! at a mirror in tests).

use area_match_register_models::{
    AreaPriceTable, MappingEntry, MunicipalityPriceTable, PostalCode, RegisterTable,
};
use serde::Deserialize;

use crate::RegisterError;
use crate::px::{
    PxResponse, parse_area_price_response, parse_mapping_response,
    parse_municipality_price_response, parse_register_response,
};

/// Embedded endpoint configuration.
const SOURCES_TOML: &str = include_str!("../sources.toml");

/// Embedded PxWeb query templates.
const POSTAL_CODES_QUERY: &str = include_str!("../queries/postal_codes.json");
const REGISTER_QUERY: &str = include_str!("../queries/postal_area_basics.json");
const AREA_PRICES_QUERY: &str = include_str!("../queries/area_prices.json");
const MUNICIPALITY_PRICES_QUERY: &str = include_str!("../queries/municipality_prices.json");

/// PxWeb endpoint URLs for the input tables.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceUrls {
    /// Paavo postal-code-area statistics endpoint (names + register).
    pub postal_code_url: String,
    /// Apartment prices by postal code area.
    pub area_price_url: String,
    /// Apartment prices by municipality.
    pub municipality_price_url: String,
}

#[derive(Debug, Deserialize)]
struct SourcesFile {
    sources: SourceUrls,
}

impl SourceUrls {
    /// Returns the endpoint URLs baked into the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `sources.toml` is malformed (a
    /// compile-time guarantee, same as the query templates).
    #[must_use]
    pub fn embedded() -> Self {
        let file: SourcesFile =
            toml::from_str(SOURCES_TOML).unwrap_or_else(|e| panic!("Invalid sources.toml: {e}"));
        file.sources
    }
}

/// Client for the StatFin PxWeb API.
pub struct StatfinClient {
    client: reqwest::Client,
    urls: SourceUrls,
}

impl StatfinClient {
    /// Creates a client against the given endpoints.
    #[must_use]
    pub fn new(urls: SourceUrls) -> Self {
        Self {
            client: reqwest::Client::new(),
            urls,
        }
    }

    /// Creates a client against the embedded StatFin endpoints.
    #[must_use]
    pub fn embedded() -> Self {
        Self::new(SourceUrls::embedded())
    }

    /// Fetches the postal-code mapping table: code, area name, and
    /// owning municipality, filtered to the six tracked cities.
    ///
    /// # Errors
    ///
    /// Returns [`RegisterError`] if the request fails or the response
    /// is malformed.
    pub async fn fetch_postal_code_mapping(&self) -> Result<Vec<MappingEntry>, RegisterError> {
        log::info!("Fetching postal code area names");
        let query = parse_template(POSTAL_CODES_QUERY)?;
        let content = self
            .post_query(&self.urls.postal_code_url, &query)
            .await?
            .text()
            .await?;
        let entries = parse_mapping_response(&content)?;
        log::info!("Received {} postal code area names", entries.len());
        Ok(entries)
    }

    /// Fetches one register snapshot for the given postal codes and
    /// statistical year.
    ///
    /// # Errors
    ///
    /// Returns [`RegisterError`] if the request fails or the response
    /// is malformed.
    pub async fn fetch_register(
        &self,
        postal_codes: &[PostalCode],
        year: i32,
    ) -> Result<RegisterTable, RegisterError> {
        log::info!("Fetching postal code register for year {year}");
        let mut query = parse_template(REGISTER_QUERY)?;
        let codes = postal_codes
            .iter()
            .map(|code| serde_json::Value::String(code.as_str().to_string()))
            .collect();
        set_selection_values(&mut query, 0, codes)?;
        set_selection_values(
            &mut query,
            2,
            vec![serde_json::Value::String(year.to_string())],
        )?;

        let response: PxResponse = self
            .post_json(&self.urls.postal_code_url, &query)
            .await?;
        let table = parse_register_response(&response)?;
        log::info!("Received register rows for {} postal code areas", table.len());
        Ok(table)
    }

    /// Fetches per-area apartment prices for the given year.
    ///
    /// # Errors
    ///
    /// Returns [`RegisterError`] if the request fails or the response
    /// is malformed.
    pub async fn fetch_area_prices(&self, year: i32) -> Result<AreaPriceTable, RegisterError> {
        log::info!("Fetching apartment prices for postal code areas, year {year}");
        let mut query = parse_template(AREA_PRICES_QUERY)?;
        set_selection_values(
            &mut query,
            0,
            vec![serde_json::Value::String(year.to_string())],
        )?;
        let response: PxResponse = self.post_json(&self.urls.area_price_url, &query).await?;
        let table = parse_area_price_response(&response)?;
        log::info!("Received apartment prices for {} areas", table.len());
        Ok(table)
    }

    /// Fetches per-municipality apartment prices for the given year.
    ///
    /// # Errors
    ///
    /// Returns [`RegisterError`] if the request fails or the response
    /// is malformed.
    pub async fn fetch_municipality_prices(
        &self,
        year: i32,
    ) -> Result<MunicipalityPriceTable, RegisterError> {
        log::info!("Fetching apartment prices for municipalities, year {year}");
        let mut query = parse_template(MUNICIPALITY_PRICES_QUERY)?;
        set_selection_values(
            &mut query,
            0,
            vec![serde_json::Value::String(year.to_string())],
        )?;
        let response: PxResponse = self
            .post_json(&self.urls.municipality_price_url, &query)
            .await?;
        parse_municipality_price_response(&response)
    }

    /// POSTs a query, rejecting non-success statuses.
    async fn post_query(
        &self,
        url: &str,
        query: &serde_json::Value,
    ) -> Result<reqwest::Response, RegisterError> {
        let response = self.client.post(url).json(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::error!("Request to {url} failed with status {status}");
            return Err(RegisterError::Api { status });
        }
        Ok(response)
    }

    /// POSTs a query and decodes the JSON body.
    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &serde_json::Value,
    ) -> Result<T, RegisterError> {
        let body = self.post_query(url, query).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Parses an embedded query template.
fn parse_template(template: &str) -> Result<serde_json::Value, RegisterError> {
    Ok(serde_json::from_str(template)?)
}

/// Substitutes the `values` array of the query clause at `index`.
fn set_selection_values(
    query: &mut serde_json::Value,
    index: usize,
    values: Vec<serde_json::Value>,
) -> Result<(), RegisterError> {
    let slot = query
        .pointer_mut(&format!("/query/{index}/selection/values"))
        .ok_or_else(|| RegisterError::Payload {
            message: format!("Query template has no selection at index {index}"),
        })?;
    *slot = serde_json::Value::Array(values);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_sources_parse() {
        let urls = SourceUrls::embedded();
        assert!(urls.postal_code_url.starts_with("https://"));
        assert!(urls.area_price_url.starts_with("https://"));
        assert!(urls.municipality_price_url.starts_with("https://"));
    }

    #[test]
    fn embedded_templates_parse() {
        for template in [
            POSTAL_CODES_QUERY,
            REGISTER_QUERY,
            AREA_PRICES_QUERY,
            MUNICIPALITY_PRICES_QUERY,
        ] {
            assert!(parse_template(template).is_ok());
        }
    }

    #[test]
    fn substitutes_selection_values() {
        let mut query = parse_template(REGISTER_QUERY).unwrap();
        set_selection_values(
            &mut query,
            2,
            vec![serde_json::Value::String("2023".to_string())],
        )
        .unwrap();
        assert_eq!(
            query.pointer("/query/2/selection/values").unwrap(),
            &serde_json::json!(["2023"])
        );
    }

    #[test]
    fn selection_index_out_of_range_is_an_error() {
        let mut query = parse_template(POSTAL_CODES_QUERY).unwrap();
        assert!(matches!(
            set_selection_values(&mut query, 9, vec![]),
            Err(RegisterError::Payload { .. })
        ));
    }
}
