//! Statistics Calculator Module
//! Per-year descriptive statistics across cities and long-run trends.

use crate::data::Observation;
use rayon::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::BTreeMap;

/// Significance threshold for the trend test
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.05;

/// Distribution of city values for one pollutant in one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearStats {
    pub year: i32,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub p95: f64,
    pub p05: f64,
}

/// Linear trend of the yearly means.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendStats {
    pub first_year: i32,
    pub last_year: i32,
    pub slope_per_year: f64,
    pub percent_change: Option<f64>,
    pub p_value: Option<f64>,
    pub is_significant: bool,
}

/// Yearly stats plus trend for one pollutant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantSummary {
    pub pollutant: String,
    pub unit: String,
    pub yearly: Vec<YearStats>,
    pub trend: Option<TrendStats>,
}

/// One city's line on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitySeries {
    pub city: String,
    pub points: Vec<(i32, f64)>,
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(year: i32, values: &[f64]) -> YearStats {
        let n = values.len();
        if n == 0 {
            return YearStats {
                year,
                count: 0,
                mean: f64::NAN,
                median: f64::NAN,
                std: f64::NAN,
                p95: f64::NAN,
                p05: f64::NAN,
            };
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        YearStats {
            year,
            count: n,
            mean,
            median: Self::percentile(&sorted, 50.0),
            std: variance.sqrt(),
            p95: Self::percentile(&sorted, 95.0),
            p05: Self::percentile(&sorted, 5.0),
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Ordinary least squares over (year, value). The two-tailed t-test on
    /// the slope needs at least three points.
    pub fn linear_trend(points: &[(i32, f64)]) -> Option<TrendStats> {
        let n = points.len();
        if n < 2 {
            return None;
        }

        let nf = n as f64;
        let mean_x = points.iter().map(|(x, _)| *x as f64).sum::<f64>() / nf;
        let mean_y = points.iter().map(|(_, y)| *y).sum::<f64>() / nf;
        let sxx: f64 = points.iter().map(|(x, _)| (*x as f64 - mean_x).powi(2)).sum();
        let sxy: f64 = points
            .iter()
            .map(|(x, y)| (*x as f64 - mean_x) * (y - mean_y))
            .sum();
        if sxx == 0.0 {
            return None;
        }
        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let (first_year, first_value) = points[0];
        let (last_year, last_value) = points[n - 1];
        let percent_change =
            (first_value != 0.0).then(|| (last_value - first_value) / first_value * 100.0);

        let p_value = if n > 2 {
            let sse: f64 = points
                .iter()
                .map(|(x, y)| (y - (intercept + slope * *x as f64)).powi(2))
                .sum();
            let se = (sse / (nf - 2.0) / sxx).sqrt();
            if se == 0.0 {
                Some(if slope == 0.0 { 1.0 } else { 0.0 })
            } else {
                let t = slope / se;
                StudentsT::new(0.0, 1.0, nf - 2.0)
                    .ok()
                    .map(|dist| 2.0 * (1.0 - dist.cdf(t.abs())))
            }
        } else {
            None
        };

        Some(TrendStats {
            first_year,
            last_year,
            slope_per_year: slope,
            percent_change,
            p_value,
            is_significant: p_value.is_some_and(|p| p <= SIGNIFICANCE_THRESHOLD),
        })
    }

    /// Yearly stats and trend for a single pollutant.
    pub fn summarize_pollutant(observations: &[Observation], pollutant: &str) -> PollutantSummary {
        let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        let mut unit = String::new();
        for obs in observations.iter().filter(|o| o.pollutant == pollutant) {
            by_year.entry(obs.year).or_default().push(obs.value);
            if unit.is_empty() {
                unit = obs.unit.clone();
            }
        }

        let yearly: Vec<YearStats> = by_year
            .iter()
            .map(|(year, values)| Self::compute_descriptive_stats(*year, values))
            .collect();
        let means: Vec<(i32, f64)> = yearly.iter().map(|s| (s.year, s.mean)).collect();

        PollutantSummary {
            pollutant: pollutant.to_string(),
            unit,
            trend: Self::linear_trend(&means),
            yearly,
        }
    }

    /// Compute summaries for all pollutants in parallel.
    pub fn summarize_all_parallel(
        observations: &[Observation],
        pollutants: &[String],
    ) -> BTreeMap<String, PollutantSummary> {
        // Use rayon for parallel computation
        pollutants
            .par_iter()
            .map(|pollutant| {
                let summary = Self::summarize_pollutant(observations, pollutant);
                (pollutant.clone(), summary)
            })
            .collect()
    }

    /// Per-city (year, value) series for one pollutant, optionally limited
    /// to the given cities. Cities are alphabetical, points by year.
    pub fn city_series(
        observations: &[Observation],
        pollutant: &str,
        cities: Option<&[String]>,
    ) -> Vec<CitySeries> {
        let mut by_city: BTreeMap<&str, Vec<(i32, f64)>> = BTreeMap::new();
        for obs in observations.iter().filter(|o| o.pollutant == pollutant) {
            if cities.is_some_and(|keep| !keep.iter().any(|c| c == &obs.city)) {
                continue;
            }
            by_city.entry(obs.city.as_str()).or_default().push((obs.year, obs.value));
        }

        by_city
            .into_iter()
            .map(|(city, mut points)| {
                points.sort_by_key(|(year, _)| *year);
                CitySeries {
                    city: city.to_string(),
                    points,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(city: &str, year: i32, pollutant: &str, value: f64) -> Observation {
        Observation {
            year,
            city: city.into(),
            state: "06".into(),
            latitude: 0.0,
            longitude: 0.0,
            pollutant: pollutant.into(),
            value,
            unit: "ppb".into(),
        }
    }

    #[test]
    fn descriptive_stats_match_numpy() {
        let stats = StatsCalculator::compute_descriptive_stats(2020, &[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert!((stats.p95 - 3.85).abs() < 1e-9);
        assert!((stats.p05 - 1.15).abs() < 1e-9);

        let empty = StatsCalculator::compute_descriptive_stats(2020, &[]);
        assert_eq!(empty.count, 0);
        assert!(empty.mean.is_nan());
    }

    #[test]
    fn declining_series_has_significant_trend() {
        let points: Vec<(i32, f64)> = (0..10).map(|i| (2000 + i, 20.0 - i as f64 + (i % 2) as f64 * 0.1)).collect();
        let trend = StatsCalculator::linear_trend(&points).unwrap();
        assert!(trend.slope_per_year < -0.9);
        assert!(trend.is_significant);
        assert_eq!(trend.first_year, 2000);
        assert_eq!(trend.last_year, 2009);
    }

    #[test]
    fn flat_noise_is_not_significant() {
        let points = vec![(2000, 5.0), (2001, 6.0), (2002, 5.0), (2003, 6.0), (2004, 5.0)];
        let trend = StatsCalculator::linear_trend(&points).unwrap();
        assert!(!trend.is_significant);
        assert!(StatsCalculator::linear_trend(&points[..1]).is_none());
    }

    #[test]
    fn summaries_and_series_group_by_pollutant() {
        let data = vec![
            obs("Boston", 2000, "NO2", 30.0),
            obs("Austin", 2000, "NO2", 10.0),
            obs("Austin", 2001, "NO2", 8.0),
            obs("Austin", 2000, "CO", 1.0),
        ];
        let all = StatsCalculator::summarize_all_parallel(&data, &["NO2".into(), "CO".into()]);
        assert_eq!(all["NO2"].yearly.len(), 2);
        assert_eq!(all["NO2"].yearly[0].mean, 20.0);
        assert_eq!(all["CO"].yearly.len(), 1);
        assert!(all["CO"].trend.is_none());

        let series = StatsCalculator::city_series(&data, "NO2", None);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].city, "Austin");
        assert_eq!(series[0].points, vec![(2000, 10.0), (2001, 8.0)]);

        let only_boston = StatsCalculator::city_series(&data, "NO2", Some(&["Boston".to_string()]));
        assert_eq!(only_boston.len(), 1);
    }
}
