//! Data module - Pollution loading, data-center catalogue and processing

mod datacenters;
mod legislation;
mod loader;
mod locations;
mod processor;
mod records;

pub use datacenters::{
    builtin_datacenters, calculate_energy, load_datacenter_table, load_datacenters_csv,
    merge_water, providers, state_name, state_water_table, water_scarcity_color, DataCenter,
    DataCenterRow, DatacenterError, StateWater, WaterProfile, DEFAULT_PUE,
    DEFAULT_WATER_SCARCITY, WATER_PROFILES,
};
pub use legislation::{markers_between, LEGISLATION};
pub use loader::{LoaderError, PollutionLoader};
pub use locations::{years_to_fetch, CITIES};
pub use processor::{DataProcessor, FetchedBatch, ObservationFilter, ProcessorError, COLUMNS};
pub use records::{LegislationMarker, Location, Observation, Pollutant, UnknownPollutant};
