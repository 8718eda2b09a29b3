//! Monitored cities with their county FIPS codes.

use super::records::Location;

macro_rules! location {
    ($city:literal, $state:literal, $county:literal, $lat:literal, $lon:literal) => {
        Location {
            city: $city,
            state_code: $state,
            county_code: $county,
            latitude: $lat,
            longitude: $lon,
        }
    };
}

/// Major US cities, the ten most populous first.
pub const CITIES: &[Location] = &[
    location!("Los Angeles", "06", "037", 34.0522, -118.2437),
    location!("New York", "36", "061", 40.7128, -74.0060),
    location!("Chicago", "17", "031", 41.8781, -87.6298),
    location!("Houston", "48", "201", 29.7604, -95.3698),
    location!("Phoenix", "04", "013", 33.4484, -112.0740),
    location!("Philadelphia", "42", "101", 39.9526, -75.1652),
    location!("San Antonio", "48", "029", 29.4241, -98.4936),
    location!("San Diego", "06", "073", 32.7157, -117.1611),
    location!("Dallas", "48", "113", 32.7767, -96.7970),
    location!("San Jose", "06", "085", 37.3382, -121.8863),
    // Wider geographic coverage
    location!("Austin", "48", "453", 30.2672, -97.7431),
    location!("Jacksonville", "12", "031", 30.3322, -81.6557),
    location!("Fort Worth", "48", "439", 32.7555, -97.3308),
    location!("Columbus", "39", "049", 39.9612, -82.9988),
    location!("Charlotte", "37", "119", 35.2271, -80.8431),
    location!("San Francisco", "06", "075", 37.7749, -122.4194),
    location!("Indianapolis", "18", "097", 39.7684, -86.1581),
    location!("Seattle", "53", "033", 47.6062, -122.3321),
    location!("Denver", "08", "031", 39.7392, -104.9903),
    location!("Boston", "25", "025", 42.3601, -71.0589),
    location!("El Paso", "48", "141", 31.7619, -106.4850),
    location!("Detroit", "26", "163", 42.3314, -83.0458),
    location!("Nashville", "47", "037", 36.1627, -86.7816),
    location!("Portland", "41", "051", 45.5152, -122.6784),
    location!("Las Vegas", "32", "003", 36.1699, -115.1398),
    location!("Memphis", "47", "157", 35.1495, -90.0490),
    location!("Louisville", "21", "111", 38.2527, -85.7585),
    location!("Baltimore", "24", "510", 39.2904, -76.6122),
    location!("Milwaukee", "55", "079", 43.0389, -87.9065),
    location!("Albuquerque", "35", "001", 35.0844, -106.6504),
    location!("Tucson", "04", "019", 32.2226, -110.9747),
    location!("Fresno", "06", "019", 36.7378, -119.7871),
    location!("Sacramento", "06", "067", 38.5816, -121.4944),
    location!("Kansas City", "29", "095", 39.0997, -94.5786),
    location!("Atlanta", "13", "121", 33.7490, -84.3880),
    location!("Miami", "12", "086", 25.7617, -80.1918),
    location!("Cleveland", "39", "035", 41.4993, -81.6944),
    location!("New Orleans", "22", "071", 29.9511, -90.0715),
    location!("Minneapolis", "27", "053", 44.9778, -93.2650),
    location!("Tampa", "12", "057", 27.9506, -82.4572),
];

/// Years to request: every other year before 2000, then every year.
pub fn years_to_fetch(start_year: i32, end_year: i32) -> Vec<i32> {
    let mut years: Vec<i32> = (start_year..end_year.min(2000)).step_by(2).collect();
    years.extend(start_year.max(2000)..=end_year);
    years
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalogue_has_unique_cities() {
        let names: HashSet<_> = CITIES.iter().map(|l| l.city).collect();
        assert_eq!(names.len(), CITIES.len());
        assert_eq!(CITIES.len(), 40);
        assert!(CITIES
            .iter()
            .all(|l| l.state_code.len() == 2 && l.county_code.len() == 3));
    }

    #[test]
    fn year_plan_is_biennial_before_2000() {
        let years = years_to_fetch(1980, 2003);
        assert_eq!(&years[..3], &[1980, 1982, 1984]);
        assert!(years.contains(&1998));
        assert!(!years.contains(&1999));
        assert_eq!(&years[years.len() - 4..], &[2000, 2001, 2002, 2003]);
        assert_eq!(years.len(), 10 + 4);
    }

    #[test]
    fn year_plan_after_2000_is_annual() {
        assert_eq!(years_to_fetch(2018, 2020), vec![2018, 2019, 2020]);
        assert!(years_to_fetch(2021, 2020).is_empty());
    }
}
