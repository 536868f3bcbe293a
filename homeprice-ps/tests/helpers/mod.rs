//! Shared fixtures: reference dictionaries and raw listing rows

use serde_json::{json, Value};

use homeprice_ps::geo::{
    address_key, city_key, AddressRecord, CityRecord, ClusterRecord, GeoPoint, RefData,
};
use homeprice_ps::store::PopulationMedians;

pub const HOUSTON_STREET: &str = "100 Main St";
pub const MIAMI_STREET: &str = "200 Ocean Dr";

/// Two known cities with addresses, clusters, and population data
pub fn ref_data() -> RefData {
    let mut refs = RefData::default();

    refs.cities.insert(
        city_key("TX", "houston"),
        CityRecord {
            kind: "city".into(),
            importance: 0.8,
            boundingbox: [29.5, 30.1, -95.8, -95.0],
            lat: 29.76,
            lng: -95.37,
        },
    );
    refs.cities.insert(
        city_key("FL", "miami"),
        CityRecord {
            kind: "town".into(),
            importance: 0.7,
            boundingbox: [25.7, 25.9, -80.4, -80.1],
            lat: 25.77,
            lng: -80.19,
        },
    );

    refs.addresses.insert(
        address_key("TX", "houston", HOUSTON_STREET),
        AddressRecord {
            location: GeoPoint { lat: 29.8, lng: -95.4 },
        },
    );
    refs.addresses.insert(
        address_key("FL", "miami", MIAMI_STREET),
        AddressRecord {
            location: GeoPoint { lat: 25.78, lng: -80.2 },
        },
    );

    refs.clusters.insert(
        city_key("TX", "houston"),
        ClusterRecord {
            low: GeoPoint { lat: 29.6, lng: -95.7 },
            high: GeoPoint { lat: 29.9, lng: -95.2 },
        },
    );

    refs.population.insert(
        city_key("TX", "houston"),
        PopulationMedians {
            population: 2_300_000.0,
            density: 1400.0,
        },
    );
    refs.population.insert(
        city_key("FL", "miami"),
        PopulationMedians {
            population: 450_000.0,
            density: 4900.0,
        },
    );

    refs
}

fn home_facts(year: &str) -> String {
    format!(
        "{{'atAGlanceFacts': [\
         {{'factValue': '{year}', 'factLabel': 'Year built'}}, \
         {{'factValue': None, 'factLabel': 'Remodeled year'}}, \
         {{'factValue': 'Central A/C', 'factLabel': 'Cooling'}}, \
         {{'factValue': 'Forced Air', 'factLabel': 'Heating'}}, \
         {{'factValue': 'Garage - Attached', 'factLabel': 'Parking'}}]}}"
    )
}

const SCHOOLS: &str = "[{'rating': ['7/10', '5/10'], \
    'data': {'Distance': ['1.2mi', '0.6mi'], 'Grades': ['K-5', '6-8']}, \
    'name': ['Test Elem', 'Test Middle']}]";

/// One raw listing row in the 17-column wire order, optionally with a
/// trailing target price
pub fn listing_row(
    state: &str,
    city: &str,
    street: &str,
    zipcode: &str,
    year: &str,
    sqft: &str,
    target: Option<&str>,
) -> Vec<Value> {
    let mut row = vec![
        json!("for sale"),        // status
        json!(null),              // private pool
        json!("Single Family"),   // propertyType
        json!(street),            // street
        json!("Bathrooms: 2"),    // baths
        json!(home_facts(year)),  // homeFacts
        json!(null),              // fireplace
        json!(city),              // city
        json!(SCHOOLS),           // schools
        json!(sqft),              // sqft
        json!(zipcode),           // zipcode
        json!("3 Beds"),          // beds
        json!(state),             // state
        json!("2 Story"),         // stories
        json!(null),              // mls-id
        json!(null),              // PrivatePool
        json!("MLS-1234"),        // MlsId
    ];
    if let Some(target) = target {
        row.push(json!(target));
    }
    row
}

/// Labelled batch over both fixture cities with a spread of build
/// years and sizes
pub fn training_batch() -> Vec<Vec<Value>> {
    let mut rows = Vec::new();
    for i in 0..30 {
        let year = format!("{}", 1950 + (i % 6) * 10);
        if i % 2 == 0 {
            rows.push(listing_row(
                "TX",
                "Houston",
                HOUSTON_STREET,
                "77001",
                &year,
                "1,200 sqft",
                Some("$250,000"),
            ));
        } else {
            rows.push(listing_row(
                "FL",
                "Miami",
                MIAMI_STREET,
                "33126",
                &year,
                "1,500 sqft",
                Some("$310,000"),
            ));
        }
    }
    rows
}
