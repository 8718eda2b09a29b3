//! EPA module - AQS API access

mod client;
mod response;

pub use client::{with_retries, AqsClient, RetryPolicy};
pub use response::{parse_annual_response, AnnualRow};

use crate::config::Credentials;
use crate::data::Pollutant;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API Error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Rate limited by the EPA API")]
    RateLimited,
    #[error("EPA API reported failure: {0}")]
    Api(String),
    #[error("Malformed EPA response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One `annualData/byCounty` request: a county, a parameter, a calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnualQuery {
    pub state_code: String,
    pub county_code: String,
    pub parameter_code: String,
    pub year: i32,
}

impl AnnualQuery {
    pub fn new(state_code: &str, county_code: &str, pollutant: Pollutant, year: i32) -> Self {
        Self {
            state_code: state_code.to_string(),
            county_code: county_code.to_string(),
            parameter_code: pollutant.parameter_code().to_string(),
            year,
        }
    }

    /// `bdate`/`edate` in `YYYYMMDD`; AQS only accepts single-year windows.
    pub fn date_range(&self) -> (String, String) {
        (format!("{}0101", self.year), format!("{}1231", self.year))
    }
}

/// Where annual measurements come from. The loader only talks to this trait.
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    async fn fetch_annual(
        &self,
        credentials: &Credentials,
        query: &AnnualQuery,
    ) -> Result<Vec<AnnualRow>, FetchError>;
}
