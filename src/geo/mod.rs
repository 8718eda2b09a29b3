//! Geocoding Module
//! Turns (county, state abbreviation) pairs into coordinates: built-in county
//! table first, then the Census Bureau geocoder, then the continental centre.

use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub const CENSUS_GEOCODER_URL: &str = "https://geocoding.geo.census.gov/geocoder/locations/address";

/// Pause after each Census request.
pub const CENSUS_PACE: Duration = Duration::from_millis(100);

/// Geographic centre of the contiguous United States.
pub const US_CENTER: (f64, f64) = (39.8283, -98.5795);

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Could not geocode {county}, {state}")]
    NotFound { county: String, state: String },
}

/// County seats for counties that commonly host data centers.
const COUNTY_COORDINATES: &[(&str, &str, f64, f64)] = &[
    // Virginia (Data Center Alley)
    ("Loudoun", "VA", 39.0438, -77.4874),
    ("Fairfax", "VA", 38.8462, -77.3064),
    ("Prince William", "VA", 38.7932, -77.4605),
    ("Henrico", "VA", 37.5407, -77.4360),
    // California
    ("Santa Clara", "CA", 37.3541, -121.9552),
    ("Alameda", "CA", 37.7652, -122.2416),
    ("Los Angeles", "CA", 34.0522, -118.2437),
    ("San Francisco", "CA", 37.7749, -122.4194),
    ("San Mateo", "CA", 37.5630, -122.3255),
    ("Orange", "CA", 33.7175, -117.8311),
    ("Sacramento", "CA", 38.5816, -121.4944),
    ("San Diego", "CA", 32.7157, -117.1611),
    // Texas
    ("Dallas", "TX", 32.7767, -96.7970),
    ("Harris", "TX", 29.7604, -95.3698),
    ("Bexar", "TX", 29.4241, -98.4936),
    ("Collin", "TX", 33.1972, -96.6397),
    ("Tarrant", "TX", 32.7555, -97.3308),
    ("Travis", "TX", 30.2672, -97.7431),
    // Arizona
    ("Maricopa", "AZ", 33.4484, -112.0740),
    ("Pima", "AZ", 32.2217, -110.9265),
    // Illinois
    ("Cook", "IL", 41.8781, -87.6298),
    ("DuPage", "IL", 41.8500, -88.0834),
    // Georgia
    ("Fulton", "GA", 33.7490, -84.3880),
    ("Douglas", "GA", 33.7468, -84.7452),
    // New Jersey
    ("Hudson", "NJ", 40.7434, -74.0324),
    ("Middlesex", "NJ", 40.4862, -74.4518),
    ("Essex", "NJ", 40.7834, -74.2299),
    ("Passaic", "NJ", 40.8587, -74.2282),
    // Ohio
    ("Franklin", "OH", 39.9612, -82.9988),
    ("Licking", "OH", 40.0581, -82.4013),
    // Oregon
    ("Washington", "OR", 45.5272, -122.9360),
    ("Morrow", "OR", 45.4948, -119.5508),
    ("Umatilla", "OR", 45.6354, -118.8447),
    // Iowa
    ("Pottawattamie", "IA", 41.2619, -95.8608),
    ("Polk", "IA", 41.5868, -93.6250),
    // North Carolina
    ("Mecklenberg", "NC", 35.2271, -80.8431),
    ("Catawba", "NC", 35.6918, -81.2151),
    // Washington
    ("Grant", "WA", 47.2087, -119.4094),
    // Nebraska
    ("Douglas", "NE", 41.2565, -95.9345),
    ("Sarpy", "NE", 41.1175, -96.0422),
    // New York
    ("New York", "NY", 40.7128, -74.0060),
    ("Westchester", "NY", 41.1220, -73.7949),
    // Massachusetts
    ("Middlesex", "MA", 42.4868, -71.3824),
    ("Suffolk", "MA", 42.3601, -71.0589),
    // Colorado
    ("Arapahoe", "CO", 39.6433, -104.3005),
    ("Denver", "CO", 39.7392, -104.9903),
    ("Adams", "CO", 39.8747, -104.3339),
    // Nevada
    ("Clark", "NV", 36.1699, -115.1398),
    // Utah
    ("Salt Lake", "UT", 40.7608, -111.8910),
    // Minnesota
    ("Hennepin", "MN", 44.9778, -93.2650),
];

/// Lookup in the built-in county table.
pub fn known_county(county: &str, state: &str) -> Option<(f64, f64)> {
    COUNTY_COORDINATES
        .iter()
        .find(|(c, s, _, _)| c.eq_ignore_ascii_case(county.trim()) && s.eq_ignore_ascii_case(state.trim()))
        .map(|&(_, _, lat, lon)| (lat, lon))
}

#[derive(Debug, Deserialize)]
struct CensusResponse {
    result: CensusResult,
}

#[derive(Debug, Deserialize)]
struct CensusResult {
    #[serde(rename = "addressMatches", default)]
    address_matches: Vec<AddressMatch>,
}

#[derive(Debug, Deserialize)]
struct AddressMatch {
    coordinates: Coordinates,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    x: f64,
    y: f64,
}

/// First match of a Census geocoder body as (lat, lon).
pub fn parse_census_response(body: &str) -> Option<(f64, f64)> {
    let response: CensusResponse = serde_json::from_str(body).ok()?;
    response
        .result
        .address_matches
        .first()
        .map(|m| (m.coordinates.y, m.coordinates.x))
}

/// County geocoder. Without an HTTP client only the table and fallback are used.
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Option<Client>,
    endpoint: String,
    use_fallback: bool,
    pace: Duration,
    lookups: Arc<AtomicUsize>,
}

impl Geocoder {
    pub fn new(use_fallback: bool) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| warn!("Census geocoder disabled: {}", e))
            .ok();
        Self {
            client,
            endpoint: CENSUS_GEOCODER_URL.to_string(),
            use_fallback,
            pace: CENSUS_PACE,
            lookups: Arc::default(),
        }
    }

    /// Table and fallback only; never touches the network.
    pub fn offline(use_fallback: bool) -> Self {
        Self {
            client: None,
            endpoint: CENSUS_GEOCODER_URL.to_string(),
            use_fallback,
            pace: CENSUS_PACE,
            lookups: Arc::default(),
        }
    }

    /// Number of `locate` calls so far, shared between clones.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    pub async fn locate(&self, county: &str, state: &str) -> Result<(f64, f64), GeoError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if let Some(coords) = known_county(county, state) {
            return Ok(coords);
        }

        if let Some(coords) = self.census_lookup(county, state).await {
            return Ok(coords);
        }

        if self.use_fallback {
            warn!("Could not geocode {}, {}. Using fallback.", county, state);
            return Ok(US_CENTER);
        }

        Err(GeoError::NotFound {
            county: county.to_string(),
            state: state.to_string(),
        })
    }

    async fn census_lookup(&self, county: &str, state: &str) -> Option<(f64, f64)> {
        let client = self.client.as_ref()?;
        // Most counties have a seat sharing their name.
        let result = client
            .get(&self.endpoint)
            .query(&[
                ("street", ""),
                ("city", county),
                ("state", state),
                ("benchmark", "Public_AR_Current"),
                ("format", "json"),
            ])
            .send()
            .await;
        tokio::time::sleep(self.pace).await;

        let response = match result {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!("Census geocoding failed for {}, {}: HTTP {}", county, state, r.status());
                return None;
            }
            Err(e) => {
                warn!("Census geocoding failed for {}, {}: {}", county, state, e);
                return None;
            }
        };

        let body = response.text().await.ok()?;
        parse_census_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lookup_is_case_insensitive_and_state_scoped() {
        assert_eq!(known_county("loudoun", "va"), Some((39.0438, -77.4874)));
        assert_eq!(known_county("Douglas", "NE"), Some((41.2565, -95.9345)));
        assert_eq!(known_county("Douglas", "GA"), Some((33.7468, -84.7452)));
        assert_eq!(known_county("Douglas", "KS"), None);
    }

    #[test]
    fn census_body_yields_lat_lon() {
        let body = r#"{"result": {"addressMatches": [
            {"coordinates": {"x": -122.68, "y": 45.52}}
        ]}}"#;
        assert_eq!(parse_census_response(body), Some((45.52, -122.68)));
        assert_eq!(parse_census_response(r#"{"result": {"addressMatches": []}}"#), None);
    }

    #[tokio::test]
    async fn offline_geocoder_falls_back_to_center() {
        let geo = Geocoder::offline(true);
        assert_eq!(geo.locate("Nowhere", "KS").await.unwrap(), US_CENTER);
        assert_eq!(geo.locate("Clark", "NV").await.unwrap(), (36.1699, -115.1398));

        let strict = Geocoder::offline(false);
        assert!(matches!(
            strict.locate("Nowhere", "KS").await,
            Err(GeoError::NotFound { .. })
        ));
        assert_eq!(geo.lookups(), 2);
        assert_eq!(strict.clone().lookups(), 1);
    }
}
