//! Record types shared by the loader, the processor and the HTTP feed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Criteria pollutants tracked by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "PM2.5")]
    Pm25,
    Ozone,
    #[serde(rename = "SO2")]
    So2,
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "CO")]
    Co,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown pollutant: {0}")]
pub struct UnknownPollutant(pub String);

impl Pollutant {
    pub const ALL: [Pollutant; 5] = [
        Pollutant::Pm25,
        Pollutant::Ozone,
        Pollutant::So2,
        Pollutant::No2,
        Pollutant::Co,
    ];

    /// Display name, also used as the `pollutant` column value.
    pub fn name(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Ozone => "Ozone",
            Pollutant::So2 => "SO2",
            Pollutant::No2 => "NO2",
            Pollutant::Co => "CO",
        }
    }

    /// AQS parameter code.
    pub fn parameter_code(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "88101", // PM2.5 Local Conditions
            Pollutant::Ozone => "44201",
            Pollutant::So2 => "42401",
            Pollutant::No2 => "42602",
            Pollutant::Co => "42101",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "μg/m³",
            Pollutant::Ozone | Pollutant::Co => "ppm",
            Pollutant::So2 | Pollutant::No2 => "ppb",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Pollutant {
    type Err = UnknownPollutant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Pollutant::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(needle) || p.parameter_code() == needle)
            .or_else(|| needle.eq_ignore_ascii_case("pm25").then_some(Pollutant::Pm25))
            .ok_or_else(|| UnknownPollutant(s.to_string()))
    }
}

/// A monitored county, identified by FIPS codes and plotted at its city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub city: &'static str,
    pub state_code: &'static str,
    pub county_code: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

/// One measured value for a (city, year, pollutant) tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub year: i32,
    pub city: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub pollutant: String,
    pub value: f64,
    pub unit: String,
}

/// Static annotation drawn on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegislationMarker {
    pub year: i32,
    pub title: &'static str,
    pub abbrev: &'static str,
    pub description: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pollutant_parses_names_and_codes() {
        assert_eq!("pm2.5".parse::<Pollutant>(), Ok(Pollutant::Pm25));
        assert_eq!("PM25".parse::<Pollutant>(), Ok(Pollutant::Pm25));
        assert_eq!("44201".parse::<Pollutant>(), Ok(Pollutant::Ozone));
        assert_eq!(" no2 ".parse::<Pollutant>(), Ok(Pollutant::No2));
        assert!("lead".parse::<Pollutant>().is_err());
    }

    #[test]
    fn pollutant_serializes_as_display_name() {
        let json = serde_json::to_string(&Pollutant::Pm25).unwrap();
        assert_eq!(json, "\"PM2.5\"");
        assert_eq!(Pollutant::So2.unit(), "ppb");
    }
}
