//! Pollution Data Loader Module
//! Fetches annual AQS measurements for the configured cities and memoizes
//! both the raw responses and the normalized table.

use super::locations::{years_to_fetch, CITIES};
use super::processor::{DataProcessor, FetchedBatch, ProcessorError};
use super::records::{Location, Observation, Pollutant};
use crate::cache::{CacheLookup, DiskCache};
use crate::config::{ConfigError, Settings};
use crate::epa::{AnnualQuery, AnnualRow, MeasurementSource};
use polars::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How many fetch errors are quoted in `LoaderError::NoData`.
const ERROR_SUMMARY_LIMIT: usize = 10;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(
        "Failed to fetch any data from EPA API! Errors encountered (first {}): {}. \
         Check that EPA_EMAIL and EPA_API_KEY are correct, that you have internet \
         connectivity, and that the EPA API service is online.",
        ERROR_SUMMARY_LIMIT,
        .errors.join(" | ")
    )]
    NoData { errors: Vec<String> },
    #[error("Failed to build observation table: {0}")]
    Processor(#[from] ProcessorError),
}

/// Loads the pollution table from the disk cache or the EPA API.
pub struct PollutionLoader {
    settings: Arc<Settings>,
    source: Arc<dyn MeasurementSource>,
    locations: &'static [Location],
    pollutants: Vec<Pollutant>,
    cache: Option<DiskCache>,
    memo: HashMap<AnnualQuery, Vec<AnnualRow>>,
    df: Option<DataFrame>,
    network_calls: usize,
}

impl PollutionLoader {
    pub fn new(settings: Arc<Settings>, source: Arc<dyn MeasurementSource>) -> Self {
        let cache = settings
            .cache_dir
            .as_ref()
            .map(|dir| DiskCache::new(dir.clone(), settings.cache_ttl_days));
        Self {
            settings,
            source,
            locations: CITIES,
            pollutants: Pollutant::ALL.to_vec(),
            cache,
            memo: HashMap::new(),
            df: None,
            network_calls: 0,
        }
    }

    /// Restrict the cities requested (and kept in the table).
    pub fn with_locations(mut self, locations: &'static [Location]) -> Self {
        self.locations = locations;
        self
    }

    pub fn with_pollutants(mut self, pollutants: &[Pollutant]) -> Self {
        self.pollutants = pollutants.to_vec();
        self
    }

    pub fn locations(&self) -> &'static [Location] {
        self.locations
    }

    /// Requests sent to the source so far.
    pub fn network_calls(&self) -> usize {
        self.network_calls
    }

    /// Get a reference to the loaded DataFrame.
    pub fn get_dataframe(&self) -> Option<&DataFrame> {
        self.df.as_ref()
    }

    /// Return the observation table, loading it on first use.
    pub async fn load(&mut self) -> Result<&DataFrame, LoaderError> {
        if self.df.is_none() {
            let df = match self.load_from_cache() {
                Some(df) => df,
                None => self.fetch_table().await?,
            };
            self.df = Some(df);
        }
        self.df
            .as_ref()
            .ok_or(LoaderError::NoData { errors: Vec::new() })
    }

    /// Year window and parameter codes this loader requests.
    fn plan(&self) -> String {
        let codes: Vec<&str> = self.pollutants.iter().map(|p| p.parameter_code()).collect();
        format!(
            "{}-{} {}",
            self.settings.start_year,
            self.settings.end_year,
            codes.join(",")
        )
    }

    fn keeps(&self, obs: &Observation) -> bool {
        (self.settings.start_year..=self.settings.end_year).contains(&obs.year)
            && self.locations.iter().any(|l| l.city == obs.city)
            && self.pollutants.iter().any(|p| p.name() == obs.pollutant)
    }

    fn load_from_cache(&self) -> Option<DataFrame> {
        let cache = self.cache.as_ref()?;
        match cache.lookup() {
            Ok(CacheLookup::Fresh { df, metadata }) => {
                let plan = self.plan();
                if let Some(cached) = metadata.plan.as_deref().filter(|p| *p != plan) {
                    info!("Cache holds {}, need {}; fetching fresh data...", cached, plan);
                    return None;
                }
                // Re-normalize so the cached text columns get their real types
                // and rows outside the current selection drop out.
                match DataProcessor::from_frame(&df).and_then(|obs| {
                    let kept: Vec<_> = obs.into_iter().filter(|o| self.keeps(o)).collect();
                    DataProcessor::to_frame(&kept)
                }) {
                    Ok(df) if df.height() > 0 => {
                        info!("Loaded {} records from cache ({})", df.height(), metadata.years);
                        Some(df)
                    }
                    Ok(_) => {
                        info!("Cache has no rows for the current selection, fetching fresh data...");
                        None
                    }
                    Err(e) => {
                        warn!("Error reading cache: {}, fetching fresh data...", e);
                        None
                    }
                }
            }
            Ok(CacheLookup::Expired { age_days }) => {
                info!("Cache expired ({} days old), fetching fresh data...", age_days);
                None
            }
            Ok(CacheLookup::Missing) => None,
            Err(e) => {
                warn!("Error reading cache: {}, fetching fresh data...", e);
                None
            }
        }
    }

    async fn fetch_table(&mut self) -> Result<DataFrame, LoaderError> {
        let credentials = self.settings.credentials()?;
        let years = years_to_fetch(self.settings.start_year, self.settings.end_year);
        let delay = self.settings.request_delay;

        let total = self.locations.len() * self.pollutants.len() * years.len();
        info!(
            "Fetching EPA data for {} years from {} to {} ({} requests)",
            years.len(),
            self.settings.start_year,
            self.settings.end_year,
            total
        );
        info!("Using email: {}", credentials.email);

        let mut batches: Vec<FetchedBatch<'static>> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut completed = 0usize;

        for location in self.locations {
            for pollutant in self.pollutants.clone() {
                info!("Fetching {} data for {}...", pollutant, location.city);

                for &year in &years {
                    let query = AnnualQuery::new(location.state_code, location.county_code, pollutant, year);
                    completed += 1;

                    if let Some(rows) = self.memo.get(&query) {
                        batches.push(FetchedBatch {
                            location,
                            pollutant,
                            rows: rows.clone(),
                        });
                        continue;
                    }

                    self.network_calls += 1;
                    match self.source.fetch_annual(&credentials, &query).await {
                        Ok(rows) => {
                            debug!(
                                "  {}: {} ({:.1}% complete)",
                                year,
                                if rows.is_empty() { "✗" } else { "✓" },
                                completed as f64 / total as f64 * 100.0
                            );
                            self.memo.insert(query, rows.clone());
                            batches.push(FetchedBatch {
                                location,
                                pollutant,
                                rows,
                            });
                        }
                        Err(e) => {
                            warn!("  ✗ {}: {}", year, e);
                            errors.push(format!(
                                "Error fetching {} for {} ({}): {}",
                                pollutant, location.city, year, e
                            ));
                        }
                    }

                    pause(delay).await;
                }
            }
        }

        let observations = DataProcessor::normalize(&batches, self.locations);
        if observations.is_empty() {
            errors.truncate(ERROR_SUMMARY_LIMIT);
            if errors.is_empty() {
                errors.push("No measurements returned for any location".to_string());
            }
            return Err(LoaderError::NoData { errors });
        }

        let mut df = DataProcessor::to_frame(&observations)?;
        let years_span = year_span(&df);
        info!(
            "Successfully loaded {} records from EPA API (years {}, {} cities)",
            df.height(),
            years_span,
            DataProcessor::get_cities(&df).len()
        );
        if !errors.is_empty() {
            warn!("{} requests failed", errors.len());
        }

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&mut df, years_span, Some(self.plan())) {
                warn!("Could not save cache: {}", e);
            }
        }

        Ok(df)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn year_span(df: &DataFrame) -> String {
    let years = DataProcessor::get_years(df);
    match (years.first(), years.last()) {
        (Some(first), Some(last)) => format!("{first}-{last}"),
        _ => String::new(),
    }
}
