//! Data Processor Module
//! Normalizes raw AQS rows into the observation table and filters it.

use super::records::{Location, Observation, Pollutant};
use crate::epa::AnnualRow;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Null value in column {0}")]
    NullValue(&'static str),
}

/// Raw rows returned for one (location, pollutant, year) request.
#[derive(Debug, Clone)]
pub struct FetchedBatch<'a> {
    pub location: &'a Location,
    pub pollutant: Pollutant,
    pub rows: Vec<AnnualRow>,
}

/// Query parameters driven by the year slider and dropdowns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationFilter {
    pub year: Option<i32>,
    pub pollutant: Option<Pollutant>,
    pub city: Option<String>,
}

/// Column order of the observation table.
pub const COLUMNS: [&str; 8] = [
    "year",
    "city",
    "state",
    "latitude",
    "longitude",
    "pollutant",
    "value",
    "unit",
];

#[derive(Default)]
struct Accumulator {
    state: String,
    sum: f64,
    count: usize,
}

/// Handles reshaping and filtering of observation data.
pub struct DataProcessor;

impl DataProcessor {
    /// Reduce raw rows to one observation per (city, year, pollutant).
    ///
    /// Monitor rows for the same key are averaged. Rows without a finite
    /// `arithmetic_mean` are dropped, and batches for locations outside
    /// `allowed` are ignored. Output is sorted by year, city, pollutant.
    pub fn normalize(batches: &[FetchedBatch<'_>], allowed: &[Location]) -> Vec<Observation> {
        let allowed_cities: HashSet<&str> = allowed.iter().map(|l| l.city).collect();
        let mut groups: BTreeMap<(i32, &str, Pollutant), (&Location, Accumulator)> = BTreeMap::new();

        for batch in batches {
            if !allowed_cities.contains(batch.location.city) {
                continue;
            }
            for row in &batch.rows {
                let Some(value) = row.arithmetic_mean.filter(|v| v.is_finite()) else {
                    continue;
                };
                let (_, acc) = groups
                    .entry((row.year, batch.location.city, batch.pollutant))
                    .or_insert_with(|| (batch.location, Accumulator::default()));
                if acc.state.is_empty() {
                    acc.state = row.state_code.clone();
                }
                acc.sum += value;
                acc.count += 1;
            }
        }

        groups
            .into_iter()
            .map(|((year, city, pollutant), (location, acc))| Observation {
                year,
                city: city.to_string(),
                state: acc.state,
                latitude: location.latitude,
                longitude: location.longitude,
                pollutant: pollutant.name().to_string(),
                value: acc.sum / acc.count as f64,
                unit: pollutant.unit().to_string(),
            })
            .collect()
    }

    /// Build the observation DataFrame.
    pub fn to_frame(observations: &[Observation]) -> Result<DataFrame, ProcessorError> {
        let years: Vec<i32> = observations.iter().map(|o| o.year).collect();
        let cities: Vec<&str> = observations.iter().map(|o| o.city.as_str()).collect();
        let states: Vec<&str> = observations.iter().map(|o| o.state.as_str()).collect();
        let lats: Vec<f64> = observations.iter().map(|o| o.latitude).collect();
        let lons: Vec<f64> = observations.iter().map(|o| o.longitude).collect();
        let pollutants: Vec<&str> = observations.iter().map(|o| o.pollutant.as_str()).collect();
        let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
        let units: Vec<&str> = observations.iter().map(|o| o.unit.as_str()).collect();

        let df = DataFrame::new(vec![
            Column::new("year".into(), years),
            Column::new("city".into(), cities),
            Column::new("state".into(), states),
            Column::new("latitude".into(), lats),
            Column::new("longitude".into(), lons),
            Column::new("pollutant".into(), pollutants),
            Column::new("value".into(), values),
            Column::new("unit".into(), units),
        ])?;

        Ok(df)
    }

    /// Read observations back out of a frame. Numeric columns are cast, so
    /// frames read from CSV with every column as text are accepted.
    pub fn from_frame(df: &DataFrame) -> Result<Vec<Observation>, ProcessorError> {
        let years = df.column("year")?.cast(&DataType::Int32)?;
        let years = years.as_materialized_series().i32()?;
        let lats = df.column("latitude")?.cast(&DataType::Float64)?;
        let lats = lats.as_materialized_series().f64()?;
        let lons = df.column("longitude")?.cast(&DataType::Float64)?;
        let lons = lons.as_materialized_series().f64()?;
        let values = df.column("value")?.cast(&DataType::Float64)?;
        let values = values.as_materialized_series().f64()?;
        let cities = df.column("city")?.as_materialized_series().str()?;
        let states = df.column("state")?.cast(&DataType::String)?;
        let states = states.as_materialized_series().str()?;
        let pollutants = df.column("pollutant")?.as_materialized_series().str()?;
        let units = df.column("unit")?.as_materialized_series().str()?;

        let mut out = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            // Rows missing a value are absent, not zero.
            let Some(value) = values.get(i) else {
                continue;
            };
            out.push(Observation {
                year: years.get(i).ok_or(ProcessorError::NullValue("year"))?,
                city: cities
                    .get(i)
                    .ok_or(ProcessorError::NullValue("city"))?
                    .to_string(),
                state: states.get(i).unwrap_or_default().to_string(),
                latitude: lats.get(i).ok_or(ProcessorError::NullValue("latitude"))?,
                longitude: lons.get(i).ok_or(ProcessorError::NullValue("longitude"))?,
                pollutant: pollutants
                    .get(i)
                    .ok_or(ProcessorError::NullValue("pollutant"))?
                    .to_string(),
                value,
                unit: units.get(i).unwrap_or_default().to_string(),
            });
        }

        Ok(out)
    }

    /// Filter the observation frame for the current UI selection.
    pub fn filter(df: &DataFrame, filter: &ObservationFilter) -> Result<DataFrame, ProcessorError> {
        let mut predicate = lit(true);
        if let Some(year) = filter.year {
            predicate = predicate.and(col("year").eq(lit(year)));
        }
        if let Some(pollutant) = filter.pollutant {
            predicate = predicate.and(col("pollutant").eq(lit(pollutant.name())));
        }
        if let Some(city) = &filter.city {
            predicate = predicate.and(col("city").eq(lit(city.as_str())));
        }

        let filtered = df.clone().lazy().filter(predicate).collect()?;
        Ok(filtered)
    }

    /// Get sorted unique years.
    pub fn get_years(df: &DataFrame) -> Vec<i32> {
        df.column("year")
            .ok()
            .and_then(|c| c.cast(&DataType::Int32).ok())
            .map(|c| {
                c.as_materialized_series()
                    .i32()
                    .map(|ca| ca.into_iter().flatten().collect::<BTreeSet<_>>())
                    .unwrap_or_default()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get sorted unique pollutants.
    pub fn get_pollutants(df: &DataFrame) -> Vec<String> {
        Self::unique_strings(df, "pollutant")
    }

    /// Get sorted unique cities.
    pub fn get_cities(df: &DataFrame) -> Vec<String> {
        Self::unique_strings(df, "city")
    }

    fn unique_strings(df: &DataFrame, column: &str) -> Vec<String> {
        df.column(column)
            .ok()
            .and_then(|c| {
                c.as_materialized_series()
                    .str()
                    .ok()
                    .map(|ca| ca.into_iter().flatten().map(str::to_string).collect::<BTreeSet<_>>())
            })
            .map(|set| set.into_iter().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::locations::CITIES;
    use pretty_assertions::assert_eq;

    fn row(year: i32, mean: Option<f64>) -> AnnualRow {
        AnnualRow {
            year,
            state_code: "06".into(),
            county_code: "037".into(),
            parameter_code: Some("88101".into()),
            site_number: None,
            sample_duration: None,
            arithmetic_mean: mean,
            units_of_measure: None,
        }
    }

    fn sample() -> Vec<Observation> {
        let la = &CITIES[0];
        let ny = &CITIES[1];
        let batches = vec![
            FetchedBatch {
                location: la,
                pollutant: Pollutant::Pm25,
                rows: vec![row(2019, Some(10.0)), row(2019, Some(14.0)), row(2019, None)],
            },
            FetchedBatch {
                location: la,
                pollutant: Pollutant::Ozone,
                rows: vec![row(2019, Some(0.04))],
            },
            FetchedBatch {
                location: ny,
                pollutant: Pollutant::Pm25,
                rows: vec![row(2020, Some(8.0)), row(2020, Some(f64::NAN))],
            },
        ];
        DataProcessor::normalize(&batches, CITIES)
    }

    #[test]
    fn normalize_averages_duplicates_and_drops_missing() {
        let obs = sample();
        assert_eq!(obs.len(), 3);

        let la_pm = obs
            .iter()
            .find(|o| o.city == "Los Angeles" && o.pollutant == "PM2.5")
            .unwrap();
        assert_eq!(la_pm.value, 12.0);
        assert_eq!(la_pm.unit, "μg/m³");
        assert_eq!(la_pm.state, "06");

        let ny = obs.iter().find(|o| o.city == "New York").unwrap();
        assert_eq!(ny.value, 8.0);
    }

    #[test]
    fn normalize_ignores_unconfigured_locations() {
        let batches = vec![FetchedBatch {
            location: &CITIES[2],
            pollutant: Pollutant::Co,
            rows: vec![row(2001, Some(1.0))],
        }];
        let obs = DataProcessor::normalize(&batches, &CITIES[..2]);
        assert!(obs.is_empty());
    }

    #[test]
    fn frame_round_trip_and_filters() {
        let obs = sample();
        let df = DataProcessor::to_frame(&obs).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(DataProcessor::from_frame(&df).unwrap(), obs);

        assert_eq!(DataProcessor::get_years(&df), vec![2019, 2020]);
        assert_eq!(DataProcessor::get_pollutants(&df), vec!["Ozone", "PM2.5"]);
        assert_eq!(DataProcessor::get_cities(&df), vec!["Los Angeles", "New York"]);

        let filter = ObservationFilter {
            year: Some(2019),
            pollutant: Some(Pollutant::Pm25),
            city: None,
        };
        let filtered = DataProcessor::filter(&df, &filter).unwrap();
        let rows = DataProcessor::from_frame(&filtered).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].city, "Los Angeles");

        let by_city = ObservationFilter {
            city: Some("New York".into()),
            ..Default::default()
        };
        assert_eq!(DataProcessor::filter(&df, &by_city).unwrap().height(), 1);
    }
}
