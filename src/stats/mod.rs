//! Stats module - Timeline statistics and data-center summaries

mod calculator;
mod summary;

pub use calculator::{
    CitySeries, PollutantSummary, StatsCalculator, TrendStats, YearStats, SIGNIFICANCE_THRESHOLD,
};
pub use summary::{
    energy_by_scarcity, scarcity_band_color, summarize_datacenters, DatacenterSummary,
    ScarcityEnergy, HIGH_RISK_SCARCITY, MODERATE_SCARCITY,
};
