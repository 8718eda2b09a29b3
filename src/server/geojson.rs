//! GeoJSON FeatureCollections for the map layers.

use crate::data::{DataCenterRow, Observation};
use serde_json::{json, Value};

fn collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

fn point(longitude: f64, latitude: f64, properties: Value) -> Value {
    json!({
        "type": "Feature",
        "geometry": { "type": "Point", "coordinates": [longitude, latitude] },
        "properties": properties,
    })
}

/// One point per city observation.
pub fn observation_features(observations: &[Observation]) -> Value {
    collection(
        observations
            .iter()
            .map(|o| {
                point(
                    o.longitude,
                    o.latitude,
                    json!({
                        "city": o.city,
                        "state": o.state,
                        "year": o.year,
                        "pollutant": o.pollutant,
                        "value": o.value,
                        "unit": o.unit,
                    }),
                )
            })
            .collect(),
    )
}

/// One point per facility, carrying energy, water data and the marker colour.
pub fn datacenter_features(rows: &[DataCenterRow]) -> Value {
    collection(
        rows.iter()
            .map(|r| {
                let f = &r.facility;
                point(
                    f.longitude,
                    f.latitude,
                    json!({
                        "name": f.name,
                        "provider": f.provider,
                        "state": f.state,
                        "facility_sqft": f.facility_sqft,
                        "power_density": f.power_density,
                        "pue": f.pue,
                        "energy_mw": r.energy_mw,
                        "water_source": r.water_source,
                        "water_scarcity": r.water_scarcity,
                        "color": r.color,
                    }),
                )
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_points_are_lon_lat() {
        let obs = Observation {
            year: 2020,
            city: "Denver".into(),
            state: "08".into(),
            latitude: 39.7392,
            longitude: -104.9903,
            pollutant: "Ozone".into(),
            value: 0.07,
            unit: "ppm".into(),
        };
        let fc = observation_features(&[obs]);
        assert_eq!(fc["type"], "FeatureCollection");
        let feature = &fc["features"][0];
        assert_eq!(feature["geometry"]["coordinates"][0], -104.9903);
        assert_eq!(feature["geometry"]["coordinates"][1], 39.7392);
        assert_eq!(feature["properties"]["city"], "Denver");
    }
}
