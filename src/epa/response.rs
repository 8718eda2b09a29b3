//! AQS response envelope parsing.

use super::FetchError;
use serde::Deserialize;

const STATUS_FAILED: &str = "Failed";

/// One row of `annualData/byCounty`. Only the fields the loader reads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnnualRow {
    pub year: i32,
    pub state_code: String,
    pub county_code: String,
    #[serde(default)]
    pub parameter_code: Option<String>,
    #[serde(default)]
    pub site_number: Option<String>,
    #[serde(default)]
    pub sample_duration: Option<String>,
    #[serde(default)]
    pub arithmetic_mean: Option<f64>,
    #[serde(default)]
    pub units_of_measure: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Header", default)]
    header: Vec<Header>,
    #[serde(rename = "Data", default)]
    data: Vec<AnnualRow>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Vec<String>,
}

/// Decode an AQS body. An empty `Data` array (including the
/// "No data matched your selection" status) is `Ok(vec![])`.
pub fn parse_annual_response(body: &str) -> Result<Vec<AnnualRow>, FetchError> {
    let envelope: Envelope = serde_json::from_str(body)?;

    if let Some(header) = envelope.header.first() {
        if header.status == STATUS_FAILED {
            let detail = if header.error.is_empty() {
                header.status.clone()
            } else {
                header.error.join("; ")
            };
            return Err(FetchError::Api(detail));
        }
    }

    Ok(envelope.data)
}
