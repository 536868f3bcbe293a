//! Reference dictionaries and geo-distance pseudo-metrics
//!
//! Five JSON dictionaries collected offline drive the geographic
//! features: city descriptors, street-level and zip-level address
//! coordinates, per-city price-cluster centroids, and the US cities
//! population table. A missing dictionary file degrades to an empty
//! map with a warning; lookups then fall back to their defaults.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::stats::median;
use crate::store::PopulationMedians;

pub const CITIES_FILE: &str = "cities.json";
pub const ADDRESSES_FILE: &str = "addresses.json";
pub const ADDRESSES_BY_ZIP_FILE: &str = "addresses_by_zip.json";
pub const PRICE_CLUSTERS_FILE: &str = "price_clusters.json";
pub const USCITIES_FILE: &str = "uscities.json";

/// Distance value used when a listing's coordinates cannot be resolved
pub const UNRESOLVED_DISTANCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// City descriptor from the city reference dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    /// Settlement type ("city", "town", "village", ...)
    #[serde(rename = "type")]
    pub kind: String,
    pub importance: f64,
    /// [lat_min, lat_max, lng_min, lng_max]
    pub boundingbox: [f64; 4],
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub location: GeoPoint,
}

/// Price-cluster centroids for one city
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub low: GeoPoint,
    pub high: GeoPoint,
}

/// One row of the US cities population table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRow {
    pub state_id: String,
    pub city: String,
    pub population: f64,
    pub density: f64,
}

/// Key into the city, cluster, and population dictionaries
pub fn city_key(state: &str, city: &str) -> String {
    format!("{}, {}", state, city)
}

/// Key into the street-level address dictionary
pub fn address_key(state: &str, city: &str, street: &str) -> String {
    format!("{}, {}, {}", state, city, street)
}

/// Key into the zip-level address dictionary
pub fn address_zip_key(state: &str, city: &str, zipcode: &str) -> String {
    format!("{}, {}, {}", state, city, zipcode)
}

/// Pseudo-area of a bounding box, orientation-insensitive
pub fn city_area(bb: &[f64; 4]) -> f64 {
    (bb[0].max(bb[1]) - bb[0].min(bb[1])) * (bb[2].max(bb[3]) - bb[2].min(bb[3]))
}

/// All reference dictionaries, loaded once at startup
#[derive(Debug, Default)]
pub struct RefData {
    pub cities: BTreeMap<String, CityRecord>,
    pub addresses: BTreeMap<String, AddressRecord>,
    pub addresses_by_zip: BTreeMap<String, AddressRecord>,
    pub clusters: BTreeMap<String, ClusterRecord>,
    /// Median population/density per city key, pre-aggregated from the
    /// US cities table
    pub population: BTreeMap<String, PopulationMedians>,
}

impl RefData {
    pub fn load(data_dir: &Path) -> Self {
        let cities = load_dict(&data_dir.join(CITIES_FILE));
        let addresses = load_dict(&data_dir.join(ADDRESSES_FILE));
        let addresses_by_zip = load_dict(&data_dir.join(ADDRESSES_BY_ZIP_FILE));
        let clusters = load_dict(&data_dir.join(PRICE_CLUSTERS_FILE));

        let rows: Vec<PopulationRow> = load_list(&data_dir.join(USCITIES_FILE));
        let population = aggregate_population(&rows);

        info!(
            cities = cities.len(),
            addresses = addresses.len(),
            addresses_by_zip = addresses_by_zip.len(),
            clusters = clusters.len(),
            population_cities = population.len(),
            "Loaded reference dictionaries"
        );

        Self {
            cities,
            addresses,
            addresses_by_zip,
            clusters,
            population,
        }
    }

    pub fn city(&self, state: &str, city: &str) -> Option<&CityRecord> {
        self.cities.get(&city_key(state, city))
    }

    /// Listing coordinates, street-level first then zip-level
    pub fn resolve_location(
        &self,
        state: &str,
        city: &str,
        street: Option<&str>,
        zipcode: Option<&str>,
    ) -> Option<GeoPoint> {
        if let Some(street) = street {
            if let Some(rec) = self.addresses.get(&address_key(state, city, street)) {
                return Some(rec.location);
            }
        }
        if let Some(zipcode) = zipcode {
            if let Some(rec) = self.addresses_by_zip.get(&address_zip_key(state, city, zipcode)) {
                return Some(rec.location);
            }
        }
        None
    }

    /// Normalized pseudo-distance to the city center
    pub fn center_distance(
        &self,
        state: &str,
        city: &str,
        street: Option<&str>,
        zipcode: Option<&str>,
        city_record: &CityRecord,
    ) -> f64 {
        match self.resolve_location(state, city, street, zipcode) {
            Some(point) => normalized_distance(
                point,
                GeoPoint {
                    lat: city_record.lat,
                    lng: city_record.lng,
                },
                &city_record.boundingbox,
            ),
            None => UNRESOLVED_DISTANCE,
        }
    }

    /// Normalized pseudo-distance to the high-priced cluster centroid
    pub fn high_price_distance(
        &self,
        state: &str,
        city: &str,
        street: Option<&str>,
        zipcode: Option<&str>,
        city_record: &CityRecord,
    ) -> f64 {
        self.cluster_distance(state, city, street, zipcode, city_record, |c| c.high)
    }

    /// Normalized pseudo-distance to the low-priced cluster centroid
    pub fn low_price_distance(
        &self,
        state: &str,
        city: &str,
        street: Option<&str>,
        zipcode: Option<&str>,
        city_record: &CityRecord,
    ) -> f64 {
        self.cluster_distance(state, city, street, zipcode, city_record, |c| c.low)
    }

    fn cluster_distance(
        &self,
        state: &str,
        city: &str,
        street: Option<&str>,
        zipcode: Option<&str>,
        city_record: &CityRecord,
        centroid: impl Fn(&ClusterRecord) -> GeoPoint,
    ) -> f64 {
        let Some(cluster) = self.clusters.get(&city_key(state, city)) else {
            return UNRESOLVED_DISTANCE;
        };
        match self.resolve_location(state, city, street, zipcode) {
            Some(point) => {
                normalized_distance(point, centroid(cluster), &city_record.boundingbox)
            }
            None => UNRESOLVED_DISTANCE,
        }
    }
}

/// 2D Euclidean distance normalized by bounding-box extent per axis,
/// clamped to 1.0. A degenerate box (zero extent) also yields 1.0.
pub fn normalized_distance(point: GeoPoint, center: GeoPoint, bb: &[f64; 4]) -> f64 {
    let size_lat = bb[1] - bb[0];
    let size_lng = bb[3] - bb[2];

    let d = ((point.lat - center.lat).powi(2) / size_lat.powi(2)
        + (point.lng - center.lng).powi(2) / size_lng.powi(2))
    .sqrt();

    if d.is_finite() {
        d.min(1.0)
    } else {
        1.0
    }
}

/// Group the population table by (state, lower-cased city) and take
/// per-group medians
pub fn aggregate_population(rows: &[PopulationRow]) -> BTreeMap<String, PopulationMedians> {
    let mut groups: BTreeMap<String, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for row in rows {
        let key = city_key(&row.state_id, &row.city.to_lowercase());
        let entry = groups.entry(key).or_default();
        entry.0.push(row.population);
        entry.1.push(row.density);
    }

    groups
        .into_iter()
        .filter_map(|(key, (pops, dens))| {
            let population = median(pops.iter().copied())?;
            let density = median(dens.iter().copied())?;
            Some((key, PopulationMedians { population, density }))
        })
        .collect()
}

fn load_dict<T: for<'de> Deserialize<'de>>(path: &Path) -> BTreeMap<String, T> {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                BTreeMap::new()
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            BTreeMap::new()
        }
    }
}

fn load_list<T: for<'de> Deserialize<'de>>(path: &Path) -> Vec<T> {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(list) => list,
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                Vec::new()
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city_record() -> CityRecord {
        CityRecord {
            kind: "city".into(),
            importance: 0.6,
            boundingbox: [29.5, 30.1, -95.8, -95.0],
            lat: 29.8,
            lng: -95.4,
        }
    }

    fn ref_data() -> RefData {
        let mut data = RefData::default();
        data.cities.insert(city_key("TX", "houston"), city_record());
        data.addresses.insert(
            address_key("TX", "houston", "123 Main St"),
            AddressRecord {
                location: GeoPoint { lat: 29.9, lng: -95.5 },
            },
        );
        data.addresses_by_zip.insert(
            address_zip_key("TX", "houston", "77032"),
            AddressRecord {
                location: GeoPoint { lat: 29.7, lng: -95.3 },
            },
        );
        data.clusters.insert(
            city_key("TX", "houston"),
            ClusterRecord {
                low: GeoPoint { lat: 29.6, lng: -95.7 },
                high: GeoPoint { lat: 30.0, lng: -95.1 },
            },
        );
        data
    }

    #[test]
    fn keys_are_comma_joined() {
        assert_eq!(city_key("TX", "houston"), "TX, houston");
        assert_eq!(address_key("TX", "houston", "1 Elm"), "TX, houston, 1 Elm");
        assert_eq!(address_zip_key("TX", "houston", "77032"), "TX, houston, 77032");
    }

    #[test]
    fn area_is_orientation_insensitive() {
        assert_eq!(city_area(&[1.0, 3.0, 10.0, 14.0]), 8.0);
        assert_eq!(city_area(&[3.0, 1.0, 14.0, 10.0]), 8.0);
    }

    #[test]
    fn street_lookup_beats_zip_lookup() {
        let data = ref_data();
        let point = data
            .resolve_location("TX", "houston", Some("123 Main St"), Some("77032"))
            .unwrap();
        assert_eq!(point.lat, 29.9);

        let point = data
            .resolve_location("TX", "houston", Some("9 Unknown Rd"), Some("77032"))
            .unwrap();
        assert_eq!(point.lat, 29.7);

        assert!(data
            .resolve_location("TX", "houston", Some("9 Unknown Rd"), Some("00000"))
            .is_none());
    }

    #[test]
    fn unresolved_address_defaults_to_half() {
        let data = ref_data();
        let record = city_record();
        let d = data.center_distance("TX", "houston", Some("9 Unknown Rd"), None, &record);
        assert_eq!(d, UNRESOLVED_DISTANCE);

        let d = data.high_price_distance("FL", "miami", Some("1 Elm"), None, &record);
        assert_eq!(d, UNRESOLVED_DISTANCE);
    }

    #[test]
    fn distance_is_clamped_and_degenerate_box_saturates() {
        let inside = GeoPoint { lat: 29.85, lng: -95.45 };
        let center = GeoPoint { lat: 29.8, lng: -95.4 };
        let bb = [29.5, 30.1, -95.8, -95.0];
        let d = normalized_distance(inside, center, &bb);
        assert!(d > 0.0 && d < 1.0);

        let far = GeoPoint { lat: 45.0, lng: -80.0 };
        assert_eq!(normalized_distance(far, center, &bb), 1.0);

        let degenerate = [29.8, 29.8, -95.4, -95.4];
        assert_eq!(normalized_distance(inside, center, &degenerate), 1.0);
    }

    #[test]
    fn population_grouped_by_state_and_city() {
        let rows = vec![
            PopulationRow {
                state_id: "TX".into(),
                city: "Houston".into(),
                population: 100.0,
                density: 10.0,
            },
            PopulationRow {
                state_id: "TX".into(),
                city: "houston".into(),
                population: 300.0,
                density: 30.0,
            },
            PopulationRow {
                state_id: "FL".into(),
                city: "Miami".into(),
                population: 50.0,
                density: 5.0,
            },
        ];
        let agg = aggregate_population(&rows);
        let houston = &agg[&city_key("TX", "houston")];
        assert_eq!(houston.population, 200.0);
        assert_eq!(houston.density, 20.0);
        assert_eq!(agg[&city_key("FL", "miami")].population, 50.0);
    }
}
