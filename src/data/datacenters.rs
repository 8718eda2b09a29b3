//! Data Center Table Module
//! Static facility catalogue merged with state water-scarcity profiles, plus
//! optional extra facilities read from a bundled CSV and geocoded.

use crate::geo::{Geocoder, US_CENTER};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// PUE assumed when a CSV row leaves it blank.
pub const DEFAULT_PUE: f64 = 1.2;

/// Scarcity shown on the state layer for states without a water profile.
pub const DEFAULT_WATER_SCARCITY: f64 = 5.0;

/// Bar colour used when a facility's state has no water profile.
const UNKNOWN_COLOR: [u8; 3] = [128, 128, 128];

#[derive(Error, Debug)]
pub enum DatacenterError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
}

/// Raw facility description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataCenter {
    pub name: String,
    pub provider: String,
    pub latitude: f64,
    pub longitude: f64,
    pub state: String,
    pub facility_sqft: f64,
    pub power_density: f64,
    pub pue: f64,
}

/// State water profile (scarcity 0 = abundant, 10 = severe).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaterProfile {
    pub state: &'static str,
    pub water_source: &'static str,
    pub water_scarcity: f64,
}

/// A facility joined with its state's water profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataCenterRow {
    #[serde(flatten)]
    pub facility: DataCenter,
    pub energy_mw: f64,
    pub water_source: Option<String>,
    pub water_scarcity: Option<f64>,
    pub color: [u8; 3],
}

/// One state on the water-scarcity layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateWater {
    pub state: &'static str,
    pub abbrev: &'static str,
    pub water_source: Option<&'static str>,
    pub water_scarcity: f64,
    pub has_profile: bool,
    pub color: [u8; 3],
}

/// Facility power in MW: sqft × W/sqft × PUE / 1e6, rounded.
pub fn calculate_energy(facility_sqft: f64, power_density_w_sqft: f64, pue: f64) -> f64 {
    (facility_sqft * power_density_w_sqft * pue / 1_000_000.0).round()
}

/// Blue (abundant) to red (severe) gradient.
pub fn water_scarcity_color(scarcity: f64) -> [u8; 3] {
    let normalized = (scarcity / 10.0).clamp(0.0, 1.0);
    [
        (255.0 * normalized) as u8,
        (100.0 * (1.0 - normalized)) as u8,
        (255.0 * (1.0 - normalized)) as u8,
    ]
}

fn facility(
    name: &str,
    provider: &str,
    latitude: f64,
    longitude: f64,
    state: &str,
    facility_sqft: f64,
    power_density: f64,
    pue: f64,
) -> DataCenter {
    DataCenter {
        name: name.to_string(),
        provider: provider.to_string(),
        latitude,
        longitude,
        state: state.to_string(),
        facility_sqft,
        power_density,
        pue,
    }
}

/// Major US data centers from public provider information.
pub fn builtin_datacenters() -> Vec<DataCenter> {
    vec![
        // AWS: older regions run a higher PUE
        facility("AWS US-East-1 (Virginia)", "AWS", 38.9072, -77.0369, "Virginia", 1_000_000.0, 200.0, 1.5),
        facility("AWS US-East-2 (Ohio)", "AWS", 40.4173, -82.9071, "Ohio", 750_000.0, 180.0, 1.3),
        facility("AWS US-West-1 (N. California)", "AWS", 37.3541, -121.9552, "California", 850_000.0, 190.0, 1.3),
        facility("AWS US-West-2 (Oregon)", "AWS", 45.5152, -122.6784, "Oregon", 900_000.0, 200.0, 1.2),
        // Google Cloud
        facility("Google Iowa", "Google", 41.2619, -95.8608, "Iowa", 600_000.0, 180.0, 1.1),
        facility("Google Oregon", "Google", 45.5897, -121.1789, "Oregon", 750_000.0, 180.0, 1.1),
        facility("Google South Carolina", "Google", 33.3683, -79.8056, "South Carolina", 500_000.0, 180.0, 1.1),
        facility("Google Virginia", "Google", 36.8946, -76.2595, "Virginia", 650_000.0, 180.0, 1.1),
        // Microsoft Azure
        facility("Azure East US (Virginia)", "Microsoft", 37.3719, -79.8164, "Virginia", 800_000.0, 190.0, 1.25),
        facility("Azure West US (California)", "Microsoft", 37.7749, -122.4194, "California", 750_000.0, 180.0, 1.25),
        facility("Azure Central US (Iowa)", "Microsoft", 41.5868, -93.6250, "Iowa", 700_000.0, 170.0, 1.2),
        facility("Azure South Central US (Texas)", "Microsoft", 29.4241, -98.4936, "Texas", 750_000.0, 170.0, 1.25),
        // Meta
        facility("Meta Prineville (Oregon)", "Meta", 44.2999, -120.8342, "Oregon", 900_000.0, 180.0, 1.2),
        facility("Meta Forest City (N. Carolina)", "Meta", 35.3387, -81.8643, "North Carolina", 800_000.0, 180.0, 1.25),
        facility("Meta Altoona (Iowa)", "Meta", 41.6545, -93.4650, "Iowa", 950_000.0, 180.0, 1.2),
        // Oracle
        facility("Oracle Phoenix", "Oracle", 33.4484, -112.0740, "Arizona", 350_000.0, 150.0, 1.5),
        facility("Oracle Ashburn", "Oracle", 39.0438, -77.4874, "Virginia", 400_000.0, 150.0, 1.5),
        // Equinix colocation (multi-tenant)
        facility("Equinix Chicago", "Equinix", 41.8781, -87.6298, "Illinois", 250_000.0, 150.0, 1.6),
        facility("Equinix Dallas", "Equinix", 32.7767, -96.7970, "Texas", 270_000.0, 150.0, 1.6),
        facility("Equinix New York", "Equinix", 40.7128, -74.0060, "New York", 300_000.0, 150.0, 1.55),
        facility("Equinix Silicon Valley", "Equinix", 37.3688, -121.9851, "California", 320_000.0, 150.0, 1.55),
        facility("Equinix Los Angeles", "Equinix", 34.0522, -118.2437, "California", 280_000.0, 150.0, 1.55),
        // Digital Realty
        facility("Digital Realty Atlanta", "Digital Realty", 33.7490, -84.3880, "Georgia", 230_000.0, 150.0, 1.6),
        facility("Digital Realty Phoenix", "Digital Realty", 33.4484, -112.0740, "Arizona", 250_000.0, 150.0, 1.6),
        facility("Digital Realty Portland", "Digital Realty", 45.5152, -122.6784, "Oregon", 220_000.0, 140.0, 1.6),
        // Switch (claims PUE 1.0)
        facility("Switch Las Vegas", "Switch", 36.1699, -115.1398, "Nevada", 2_000_000.0, 140.0, 1.0),
        // Apple
        facility("Apple Mesa (Arizona)", "Apple", 33.4152, -111.8315, "Arizona", 650_000.0, 170.0, 1.15),
        facility("Apple Reno (Nevada)", "Apple", 39.5296, -119.8138, "Nevada", 700_000.0, 170.0, 1.15),
        // Regional colocation hubs
        facility("Denver Colocation Hub", "Various", 39.7392, -104.9903, "Colorado", 180_000.0, 140.0, 1.6),
        facility("Seattle Colocation Hub", "Various", 47.6062, -122.3321, "Washington", 200_000.0, 140.0, 1.6),
        facility("Miami Colocation Hub", "Various", 25.7617, -80.1918, "Florida", 170_000.0, 140.0, 1.65),
    ]
}

macro_rules! water {
    ($state:literal, $source:literal, $scarcity:literal) => {
        WaterProfile {
            state: $state,
            water_source: $source,
            water_scarcity: $scarcity,
        }
    };
}

/// Primary water source and scarcity per contiguous state.
pub const WATER_PROFILES: &[WaterProfile] = &[
    water!("California", "River/Snowmelt", 8.5),
    water!("Arizona", "River/Groundwater", 9.0),
    water!("Nevada", "River/Groundwater", 9.5),
    water!("Texas", "River/Groundwater", 7.5),
    water!("New Mexico", "River/Groundwater", 8.0),
    water!("Utah", "River/Snowmelt", 7.0),
    water!("Colorado", "River/Snowmelt", 6.5),
    water!("Oregon", "River/Rain", 4.0),
    water!("Washington", "River/Rain", 3.5),
    water!("Idaho", "River/Snowmelt", 5.0),
    water!("Montana", "River/Snowmelt", 4.5),
    water!("Wyoming", "River/Snowmelt", 6.0),
    water!("North Dakota", "River/Groundwater", 4.0),
    water!("South Dakota", "River/Groundwater", 5.5),
    water!("Nebraska", "River/Groundwater", 6.0),
    water!("Kansas", "River/Groundwater", 6.5),
    water!("Oklahoma", "River/Groundwater", 6.0),
    water!("Iowa", "River/Groundwater", 3.5),
    water!("Missouri", "River", 5.0),
    water!("Arkansas", "River", 4.5),
    water!("Louisiana", "River", 4.0),
    water!("Mississippi", "River/Groundwater", 4.5),
    water!("Alabama", "River/Groundwater", 4.0),
    water!("Georgia", "River/Groundwater", 5.5),
    water!("Florida", "River/Groundwater", 5.0),
    water!("South Carolina", "River", 4.5),
    water!("North Carolina", "River", 4.0),
    water!("Virginia", "River/Groundwater", 5.0),
    water!("West Virginia", "River", 3.0),
    water!("Kentucky", "River", 4.0),
    water!("Tennessee", "River", 5.0),
    water!("Illinois", "River/Lake", 4.5),
    water!("Indiana", "River/Groundwater", 4.0),
    water!("Ohio", "River/Lake", 3.5),
    water!("Michigan", "Lake", 3.0),
    water!("Wisconsin", "Lake", 3.5),
    water!("Minnesota", "Lake", 3.5),
    water!("New York", "Lake/River", 3.0),
    water!("Pennsylvania", "River/Groundwater", 3.5),
    water!("New Jersey", "River/Groundwater", 4.0),
    water!("Delaware", "River/Groundwater", 4.5),
    water!("Maryland", "River/Groundwater", 4.5),
    water!("Maine", "River/Lake", 2.5),
    water!("Vermont", "River/Lake", 2.5),
    water!("New Hampshire", "River/Lake", 2.5),
    water!("Massachusetts", "River/Reservoir", 3.0),
    water!("Rhode Island", "River/Reservoir", 3.0),
    water!("Connecticut", "River/Reservoir", 3.5),
];

/// Two-letter postal abbreviations to state names.
const STATE_NAMES: &[(&str, &str)] = &[
    ("AL", "Alabama"), ("AK", "Alaska"), ("AZ", "Arizona"), ("AR", "Arkansas"),
    ("CA", "California"), ("CO", "Colorado"), ("CT", "Connecticut"), ("DE", "Delaware"),
    ("DC", "District of Columbia"), ("FL", "Florida"), ("GA", "Georgia"), ("HI", "Hawaii"),
    ("ID", "Idaho"), ("IL", "Illinois"), ("IN", "Indiana"), ("IA", "Iowa"),
    ("KS", "Kansas"), ("KY", "Kentucky"), ("LA", "Louisiana"), ("ME", "Maine"),
    ("MD", "Maryland"), ("MA", "Massachusetts"), ("MI", "Michigan"), ("MN", "Minnesota"),
    ("MS", "Mississippi"), ("MO", "Missouri"), ("MT", "Montana"), ("NE", "Nebraska"),
    ("NV", "Nevada"), ("NH", "New Hampshire"), ("NJ", "New Jersey"), ("NM", "New Mexico"),
    ("NY", "New York"), ("NC", "North Carolina"), ("ND", "North Dakota"), ("OH", "Ohio"),
    ("OK", "Oklahoma"), ("OR", "Oregon"), ("PA", "Pennsylvania"), ("RI", "Rhode Island"),
    ("SC", "South Carolina"), ("SD", "South Dakota"), ("TN", "Tennessee"), ("TX", "Texas"),
    ("UT", "Utah"), ("VT", "Vermont"), ("VA", "Virginia"), ("WA", "Washington"),
    ("WV", "West Virginia"), ("WI", "Wisconsin"), ("WY", "Wyoming"),
];

pub fn state_name(abbrev: &str) -> Option<&'static str> {
    STATE_NAMES
        .iter()
        .find(|(a, _)| a.eq_ignore_ascii_case(abbrev.trim()))
        .map(|&(_, name)| name)
}

/// Every state (and DC) with its scarcity score, defaulting to
/// `DEFAULT_WATER_SCARCITY` where no profile exists.
pub fn state_water_table() -> Vec<StateWater> {
    STATE_NAMES
        .iter()
        .map(|&(abbrev, state)| {
            let profile = WATER_PROFILES.iter().find(|p| p.state == state);
            let water_scarcity = profile.map_or(DEFAULT_WATER_SCARCITY, |p| p.water_scarcity);
            StateWater {
                state,
                abbrev,
                water_source: profile.map(|p| p.water_source),
                water_scarcity,
                has_profile: profile.is_some(),
                color: water_scarcity_color(water_scarcity),
            }
        })
        .collect()
}

/// Left-join facilities with water profiles and derive energy and colour.
pub fn merge_water(facilities: Vec<DataCenter>) -> Vec<DataCenterRow> {
    let profiles: HashMap<&str, &WaterProfile> =
        WATER_PROFILES.iter().map(|p| (p.state, p)).collect();

    facilities
        .into_iter()
        .map(|facility| {
            let profile = profiles.get(facility.state.as_str());
            let energy_mw = calculate_energy(facility.facility_sqft, facility.power_density, facility.pue);
            DataCenterRow {
                energy_mw,
                water_source: profile.map(|p| p.water_source.to_string()),
                water_scarcity: profile.map(|p| p.water_scarcity),
                color: profile
                    .map(|p| water_scarcity_color(p.water_scarcity))
                    .unwrap_or(UNKNOWN_COLOR),
                facility,
            }
        })
        .collect()
}

/// Read `name, provider, County, State, facility_sqft, power_density[, pue]`
/// rows from a CSV and geocode each distinct county once. Rows with an unknown
/// state are skipped; counties that cannot be geocoded sit at the US centre.
pub async fn load_datacenters_csv(
    path: &Path,
    geocoder: &Geocoder,
) -> Result<Vec<DataCenter>, DatacenterError> {
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(10000))
        .finish()?
        .collect()?;

    let names = df.column("name")?.cast(&DataType::String)?;
    let names = names.as_materialized_series().str()?;
    let providers = df.column("provider")?.cast(&DataType::String)?;
    let providers = providers.as_materialized_series().str()?;
    let counties = df.column("County")?.cast(&DataType::String)?;
    let counties = counties.as_materialized_series().str()?;
    let states = df.column("State")?.cast(&DataType::String)?;
    let states = states.as_materialized_series().str()?;
    let sqft = df.column("facility_sqft")?.cast(&DataType::Float64)?;
    let sqft = sqft.as_materialized_series().f64()?;
    let density = df.column("power_density")?.cast(&DataType::Float64)?;
    let density = density.as_materialized_series().f64()?;
    let pue = df
        .column("pue")
        .ok()
        .and_then(|c| c.cast(&DataType::Float64).ok());
    let pue = pue.as_ref().and_then(|c| c.as_materialized_series().f64().ok());

    let mut located: HashMap<(String, String), (f64, f64)> = HashMap::new();
    let mut out = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(name), Some(county), Some(abbrev), Some(sqft), Some(density)) = (
            names.get(i),
            counties.get(i),
            states.get(i),
            sqft.get(i),
            density.get(i),
        ) else {
            continue;
        };
        let Some(state) = state_name(abbrev) else {
            warn!("Skipping {}: unknown state abbreviation {:?}", name, abbrev);
            continue;
        };
        let key = (county.trim().to_ascii_lowercase(), abbrev.trim().to_ascii_uppercase());
        let (latitude, longitude) = match located.get(&key) {
            Some(&coords) => coords,
            None => {
                let coords = geocoder.locate(county, abbrev).await.unwrap_or_else(|e| {
                    warn!("{}. Using fallback.", e);
                    US_CENTER
                });
                located.insert(key, coords);
                coords
            }
        };

        out.push(DataCenter {
            name: name.to_string(),
            provider: providers.get(i).unwrap_or("Various").to_string(),
            latitude,
            longitude,
            state: state.to_string(),
            facility_sqft: sqft,
            power_density: density,
            pue: pue.and_then(|ca| ca.get(i)).unwrap_or(DEFAULT_PUE),
        });
    }

    info!("Loaded {} data centers from {}", out.len(), path.display());
    Ok(out)
}

/// Built-in catalogue plus any CSV rows, merged with water data.
pub async fn load_datacenter_table(
    csv: Option<&Path>,
    geocoder: &Geocoder,
) -> Result<Vec<DataCenterRow>, DatacenterError> {
    let mut facilities = builtin_datacenters();
    if let Some(path) = csv {
        facilities.extend(load_datacenters_csv(path, geocoder).await?);
    }
    Ok(merge_water(facilities))
}

/// Sorted unique providers.
pub fn providers(rows: &[DataCenterRow]) -> Vec<String> {
    let mut providers: Vec<String> = rows.iter().map(|r| r.facility.provider.clone()).collect();
    providers.sort();
    providers.dedup();
    providers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn energy_formula_matches_published_examples() {
        // 750,000 sq ft × 200 W/sq ft = 150 MW before PUE
        assert_eq!(calculate_energy(750_000.0, 200.0, 1.0), 150.0);
        assert_eq!(calculate_energy(1_000_000.0, 200.0, 1.5), 300.0);
        assert_eq!(calculate_energy(170_000.0, 140.0, 1.65), 39.0);
    }

    #[test]
    fn color_gradient_endpoints() {
        assert_eq!(water_scarcity_color(0.0), [0, 100, 255]);
        assert_eq!(water_scarcity_color(10.0), [255, 0, 0]);
        assert_eq!(water_scarcity_color(5.0), [127, 50, 127]);
    }

    #[test]
    fn merge_is_a_left_join() {
        let mut facilities = builtin_datacenters();
        facilities.push(facility("Anchorage Edge", "Various", 61.2, -149.9, "Alaska", 10_000.0, 100.0, 1.5));
        let rows = merge_water(facilities);

        assert_eq!(rows.len(), 32);
        let nevada = rows.iter().find(|r| r.facility.name == "Switch Las Vegas").unwrap();
        assert_eq!(nevada.water_scarcity, Some(9.5));
        assert_eq!(nevada.energy_mw, 280.0);

        let alaska = rows.last().unwrap();
        assert_eq!(alaska.water_scarcity, None);
        assert_eq!(alaska.color, UNKNOWN_COLOR);
    }

    #[test]
    fn builtin_states_all_have_profiles() {
        let rows = merge_water(builtin_datacenters());
        assert_eq!(rows.len(), 31);
        assert!(rows.iter().all(|r| r.water_scarcity.is_some()));
        assert_eq!(providers(&rows).len(), 10);
    }

    #[tokio::test]
    async fn csv_rows_are_geocoded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,provider,County,State,facility_sqft,power_density,pue").unwrap();
        writeln!(file, "QTS Ashburn,QTS,Loudoun,VA,400000,150,1.4").unwrap();
        writeln!(file, "Prairie DC,Local,Nowhere,KS,50000,100,").unwrap();

        let geo = Geocoder::offline(true);
        let rows = load_datacenters_csv(file.path(), &geo).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].state, "Virginia");
        assert_eq!((rows[0].latitude, rows[0].longitude), (39.0438, -77.4874));
        assert_eq!(rows[1].pue, DEFAULT_PUE);
        assert_eq!((rows[1].latitude, rows[1].longitude), crate::geo::US_CENTER);
    }

    #[test]
    fn state_water_table_defaults_missing_profiles() {
        let table = state_water_table();
        assert_eq!(table.len(), 51);
        assert_eq!(table.iter().filter(|s| s.has_profile).count(), WATER_PROFILES.len());

        let alaska = table.iter().find(|s| s.abbrev == "AK").unwrap();
        assert_eq!(alaska.water_scarcity, DEFAULT_WATER_SCARCITY);
        assert_eq!(alaska.water_source, None);
        assert_eq!(alaska.color, water_scarcity_color(5.0));

        let nevada = table.iter().find(|s| s.state == "Nevada").unwrap();
        assert_eq!(nevada.water_scarcity, 9.5);
        assert_eq!(nevada.water_source, Some("River/Groundwater"));
    }

    #[tokio::test]
    async fn repeated_counties_are_geocoded_once_and_bad_rows_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,provider,County,State,facility_sqft,power_density,pue").unwrap();
        writeln!(file, "Ashburn A,QTS,Loudoun,VA,400000,150,1.4").unwrap();
        writeln!(file, "Ashburn B,Equinix,loudoun,va,300000,120,1.3").unwrap();
        writeln!(file, "Offshore,Local,Nowhere,ZZ,50000,100,").unwrap();
        writeln!(file, "Prairie A,Local,Nowhere,KS,50000,100,").unwrap();
        writeln!(file, "Prairie B,Local,Nowhere,KS,60000,100,").unwrap();

        // Strict geocoder: an unknown county falls back instead of failing the load.
        let geo = Geocoder::offline(false);
        let rows = load_datacenters_csv(file.path(), &geo).await.unwrap();

        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Ashburn A", "Ashburn B", "Prairie A", "Prairie B"]);
        assert_eq!(geo.lookups(), 2);
        assert_eq!((rows[1].latitude, rows[1].longitude), (39.0438, -77.4874));
        assert_eq!(rows[1].state, "Virginia");
        assert!(rows[2..]
            .iter()
            .all(|r| (r.latitude, r.longitude) == crate::geo::US_CENTER));
    }
}
