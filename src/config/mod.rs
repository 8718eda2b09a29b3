//! Configuration Module
//! Runtime settings assembled from the environment (and `.env`), then
//! overridden by command-line flags in `main`.

use chrono::Datelike;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://aqs.epa.gov/data/api";
pub const SIGNUP_URL: &str = "https://aqs.epa.gov/aqsweb/documents/data_api.html#signup";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "EPA API credentials not configured! Set the EPA_EMAIL and EPA_API_KEY \
         environment variables (or add them to .env). Sign up at: {url}",
        url = SIGNUP_URL
    )]
    MissingCredentials,
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// EPA AQS account pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub api_key: String,
}

/// All runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub epa_email: Option<String>,
    pub epa_api_key: Option<String>,
    pub api_base: String,
    /// `None` disables the on-disk cache.
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl_days: i64,
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub start_year: i32,
    pub end_year: i32,
    pub host: String,
    pub port: u16,
    pub datacenters_csv: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            epa_email: None,
            epa_api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            cache_dir: Some(PathBuf::from("data_cache")),
            cache_ttl_days: 365,
            request_delay: Duration::from_millis(300),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            start_year: 1980,
            end_year: chrono::Local::now().year(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            datacenters_csv: None,
        }
    }
}

impl Settings {
    /// Build settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        settings.epa_email = get("EPA_EMAIL");
        settings.epa_api_key = get("EPA_API_KEY");
        if let Some(base) = get("EPA_API_BASE") {
            settings.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(dir) = get("US_ATLAS_CACHE_DIR") {
            settings.cache_dir = match dir.as_str() {
                "off" | "none" => None,
                _ => Some(PathBuf::from(dir)),
            };
        }
        if let Some(v) = get("US_ATLAS_CACHE_TTL_DAYS") {
            settings.cache_ttl_days = parse_value("US_ATLAS_CACHE_TTL_DAYS", &v)?;
        }
        if let Some(v) = get("US_ATLAS_REQUEST_DELAY_MS") {
            settings.request_delay =
                Duration::from_millis(parse_value("US_ATLAS_REQUEST_DELAY_MS", &v)?);
        }
        if let Some(v) = get("US_ATLAS_MAX_RETRIES") {
            settings.max_retries = parse_value("US_ATLAS_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("US_ATLAS_START_YEAR") {
            settings.start_year = parse_value("US_ATLAS_START_YEAR", &v)?;
        }
        if let Some(v) = get("US_ATLAS_END_YEAR") {
            settings.end_year = parse_value("US_ATLAS_END_YEAR", &v)?;
        }
        if let Some(v) = get("US_ATLAS_HOST") {
            settings.host = v;
        }
        if let Some(v) = get("PORT") {
            settings.port = parse_value("PORT", &v)?;
        }

        Ok(settings)
    }

    /// Credential pair, or the readable configuration error when incomplete.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        match (&self.epa_email, &self.epa_api_key) {
            (Some(email), Some(api_key)) => Ok(Credentials {
                email: email.clone(),
                api_key: api_key.clone(),
            }),
            _ => Err(ConfigError::MissingCredentials),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.max(1)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_credentials_is_a_config_error() {
        let settings = Settings::from_lookup(lookup(&[("EPA_EMAIL", "a@b.org")])).unwrap();
        assert_eq!(settings.credentials(), Err(ConfigError::MissingCredentials));

        let msg = ConfigError::MissingCredentials.to_string();
        assert!(msg.contains("EPA_EMAIL"));
        assert!(msg.contains("EPA_API_KEY"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let settings =
            Settings::from_lookup(lookup(&[("EPA_EMAIL", "a@b.org"), ("EPA_API_KEY", "  ")]))
                .unwrap();
        assert!(settings.credentials().is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = Settings::from_lookup(lookup(&[
            ("EPA_EMAIL", "a@b.org"),
            ("EPA_API_KEY", "k"),
            ("EPA_API_BASE", "http://localhost:9000/"),
            ("US_ATLAS_CACHE_DIR", "off"),
            ("US_ATLAS_REQUEST_DELAY_MS", "0"),
            ("US_ATLAS_START_YEAR", "2010"),
            ("PORT", "9090"),
        ]))
        .unwrap();

        assert_eq!(settings.api_base, "http://localhost:9000");
        assert_eq!(settings.cache_dir, None);
        assert_eq!(settings.request_delay, Duration::ZERO);
        assert_eq!(settings.start_year, 2010);
        assert_eq!(settings.port, 9090);
        assert_eq!(settings.credentials().unwrap().api_key, "k");
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = Settings::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
