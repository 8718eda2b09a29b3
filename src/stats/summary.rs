//! Headline figures for the data-center view.

use crate::data::DataCenterRow;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Scarcity at or above which a location counts as high risk.
pub const HIGH_RISK_SCARCITY: f64 = 7.0;
/// Scarcity at or above which a state is moderately to severely stressed.
pub const MODERATE_SCARCITY: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScarcityEnergy {
    pub water_scarcity: f64,
    pub energy_mw: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatacenterSummary {
    pub total_datacenters: usize,
    pub total_energy_mw: f64,
    pub high_risk_locations: usize,
    pub water_source_types: usize,
    pub percent_moderate_or_severe: f64,
    pub energy_by_scarcity: Vec<ScarcityEnergy>,
}

/// Bar colour band for a scarcity level.
pub fn scarcity_band_color(scarcity: f64) -> &'static str {
    if scarcity < 3.0 {
        "#00BFFF"
    } else if scarcity < 5.0 {
        "#FFD700"
    } else if scarcity < 7.0 {
        "#FF8C00"
    } else {
        "#FF0000"
    }
}

/// Total energy per distinct scarcity value, ascending. Facilities without
/// a water profile are left out.
pub fn energy_by_scarcity(rows: &[DataCenterRow]) -> Vec<ScarcityEnergy> {
    // Scarcity values carry one decimal; key on tenths.
    let mut totals: BTreeMap<i64, f64> = BTreeMap::new();
    for row in rows {
        if let Some(scarcity) = row.water_scarcity {
            *totals.entry((scarcity * 10.0).round() as i64).or_default() += row.energy_mw;
        }
    }

    totals
        .into_iter()
        .map(|(tenths, energy_mw)| {
            let water_scarcity = tenths as f64 / 10.0;
            ScarcityEnergy {
                water_scarcity,
                energy_mw,
                color: scarcity_band_color(water_scarcity),
            }
        })
        .collect()
}

pub fn summarize_datacenters(rows: &[DataCenterRow]) -> DatacenterSummary {
    let total = rows.len();
    let at_least = |threshold: f64| {
        rows.iter()
            .filter(|r| r.water_scarcity.is_some_and(|s| s >= threshold))
            .count()
    };
    let sources: HashSet<&str> = rows.iter().filter_map(|r| r.water_source.as_deref()).collect();

    DatacenterSummary {
        total_datacenters: total,
        total_energy_mw: rows.iter().map(|r| r.energy_mw).sum(),
        high_risk_locations: at_least(HIGH_RISK_SCARCITY),
        water_source_types: sources.len(),
        percent_moderate_or_severe: if total == 0 {
            0.0
        } else {
            100.0 * at_least(MODERATE_SCARCITY) as f64 / total as f64
        },
        energy_by_scarcity: energy_by_scarcity(rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{builtin_datacenters, merge_water};

    #[test]
    fn band_colors() {
        assert_eq!(scarcity_band_color(2.5), "#00BFFF");
        assert_eq!(scarcity_band_color(3.0), "#FFD700");
        assert_eq!(scarcity_band_color(6.5), "#FF8C00");
        assert_eq!(scarcity_band_color(9.5), "#FF0000");
    }

    #[test]
    fn builtin_summary() {
        let rows = merge_water(builtin_datacenters());
        let summary = summarize_datacenters(&rows);

        assert_eq!(summary.total_datacenters, 31);
        // California (8.5) x4, Arizona (9.0) x3, Nevada (9.5) x2, Texas (7.5) x2
        assert_eq!(summary.high_risk_locations, 11);
        assert_eq!(
            summary.total_energy_mw,
            rows.iter().map(|r| r.energy_mw).sum::<f64>()
        );

        let by_level = &summary.energy_by_scarcity;
        assert!(by_level.windows(2).all(|w| w[0].water_scarcity < w[1].water_scarcity));
        let nevada = by_level.iter().find(|e| e.water_scarcity == 9.5).unwrap();
        // Switch 280 MW + Apple Reno round(700k*170*1.15/1e6) = 137 MW
        assert_eq!(nevada.energy_mw, 417.0);
        assert_eq!(
            by_level.iter().map(|e| e.energy_mw).sum::<f64>(),
            summary.total_energy_mw
        );
    }

    #[test]
    fn empty_table_has_zero_percent() {
        let summary = summarize_datacenters(&[]);
        assert_eq!(summary.total_datacenters, 0);
        assert_eq!(summary.percent_moderate_or_severe, 0.0);
        assert!(summary.energy_by_scarcity.is_empty());
    }
}
