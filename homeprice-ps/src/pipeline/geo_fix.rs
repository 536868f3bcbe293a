//! Stage 2: state/city correction
//!
//! Normalizes known-bad state abbreviations and city spellings, nulls
//! out cities absent from the city reference dictionary, and resolves
//! the remainder: fit mode drops them (persisting modal fallbacks),
//! replay mode reassigns them to the fitted modal state/city.

use std::collections::BTreeMap;

use homeprice_common::{Error, Result};

use crate::frame::Frame;
use crate::geo::{city_key, RefData};
use crate::pipeline::Mode;
use crate::stats::modal;
use crate::store::{ParamStore, ParamValue};

const STATES_REPLACE: [(&str, &str); 2] = [("Fl", "FL"), ("BA", "FL")];

/// Curated misspellings and ambiguous names; `None` means the value
/// carries no usable city at all
const CITIES_REPLACE: [(&str, Option<&str>); 45] = [
    ("cherryhillsvillage", Some("Cherry Hills Village")),
    ("commercecity", Some("Commerce City")),
    ("federalheights", Some("Federal Heights")),
    ("bonita spgs", Some("Bonita Springs")),
    ("doctor philips", Some("Orlando")),
    ("ldhl", Some("Lauderhill")),
    ("p c beach", Some("Panama City Beach")),
    ("un-incorporated broward county", Some("Fort Lauderdale")),
    ("unincorporated broward county", Some("Fort Lauderdale")),
    ("atlaanta", Some("Atlanta")),
    ("saranac vlg", Some("Saranac")),
    ("uninc", Some("Charlotte")),
    ("west ashville", Some("Ashville")),
    ("city center", Some("Las Vegas")),
    ("bellerose manor", Some("Queens Village")),
    ("bellerose vlg", Some("Bellerose Village")),
    ("jamaica est", Some("Jamaica")),
    ("old mill basin", Some("Brooklyn")),
    ("downtown pgh", Some("Pittsburgh")),
    ("outside area (outside ca)", Some("Nashville")),
    ("unicorp/memphis", Some("Memphis")),
    ("botines", Some("Laredo")),
    ("brookside vl", Some("Brookside Village")),
    ("bville", Some("Brownsville")),
    ("clear lk shrs", Some("Clear Lake Shores")),
    ("hollywood pa", Some("Hollywood Park")),
    ("la moca", Some("Laredo")),
    ("longvi", Some("Longview")),
    ("mc allen", Some("Mcallen")),
    ("mc gregor", Some("Mcgregor")),
    ("mc kinney", Some("Mckinney")),
    ("romayor", Some("Cleveland")),
    ("s.a.", Some("San Antonio")),
    ("tarkington prairie", Some("Cleveland")),
    ("belllingham", Some("Bellingham")),
    ("china spring", None),
    ("other city - in the state of florida", None),
    ("other city not in the state of florida", None),
    ("other city value - out of area", None),
    ("other city value out of area", None),
    ("unincorporated dade county", None),
    ("foreign country", None),
    ("other", None),
    (" ", None),
    ("--", None),
];

pub fn run(frame: &mut Frame, mode: Mode, store: &mut ParamStore, refs: &RefData) -> Result<()> {
    for state in frame.str_col_mut("state")?.iter_mut().flatten() {
        if let Some((_, fixed)) = STATES_REPLACE.iter().find(|(bad, _)| bad == state) {
            *state = fixed.to_string();
        }
    }

    for city in frame.str_col_mut("city")?.iter_mut() {
        if let Some(current) = city.as_deref() {
            if let Some((_, replacement)) = CITIES_REPLACE.iter().find(|(bad, _)| *bad == current) {
                *city = replacement.map(|r| r.to_lowercase());
            }
        }
    }

    // Anything the reference dictionary does not know is unresolved
    let states = frame.str_col("state")?.to_vec();
    let cities = frame.str_col_mut("city")?;
    for (city, state) in cities.iter_mut().zip(&states) {
        let known = match (city.as_deref(), state.as_deref()) {
            (Some(c), Some(s)) => refs.cities.contains_key(&city_key(s, c)),
            _ => false,
        };
        if !known {
            *city = None;
        }
    }

    if mode.can_drop_rows() {
        let keep: Vec<bool> = frame.str_col("city")?.iter().map(Option::is_some).collect();
        frame.retain_rows(&keep)?;

        let states = frame.str_col("state")?.to_vec();
        let cities = frame.str_col("city")?.to_vec();

        store.get_or_fit("popular_state_name", mode, || {
            modal(states.iter().flatten().map(String::as_str))
                .map(ParamValue::Text)
                .ok_or_else(|| Error::InvalidInput("no rows left to fit a modal state".into()))
        })?;

        store.get_or_fit("popular_cities", mode, || {
            let mut by_state: BTreeMap<String, Vec<&str>> = BTreeMap::new();
            for (state, city) in states.iter().zip(&cities) {
                if let (Some(state), Some(city)) = (state, city) {
                    by_state.entry(state.clone()).or_default().push(city);
                }
            }
            let modal_cities = by_state
                .into_iter()
                .filter_map(|(state, cities)| {
                    modal(cities.iter().copied()).map(|city| (state, city))
                })
                .collect();
            Ok(ParamValue::CityByState(modal_cities))
        })?;
    } else {
        let popular_state = store
            .get("popular_state_name")?
            .as_text("popular_state_name")?
            .to_string();
        let popular_cities = store
            .get("popular_cities")?
            .as_city_by_state("popular_cities")?
            .clone();

        let fallback_city = popular_cities.get(&popular_state).cloned().ok_or_else(|| {
            Error::Internal("popular_cities has no entry for the popular state".into())
        })?;

        let cities = frame.str_col("city")?.to_vec();
        let states = frame.str_col_mut("state")?;
        let mut new_cities = cities.clone();
        for ((city, new_city), state) in cities.iter().zip(&mut new_cities).zip(states.iter_mut()) {
            if city.is_some() {
                continue;
            }
            match state.as_deref().and_then(|s| popular_cities.get(s)) {
                Some(modal_city) => *new_city = Some(modal_city.clone()),
                None => {
                    *state = Some(popular_state.clone());
                    *new_city = Some(fallback_city.clone());
                }
            }
        }
        frame.push(
            "city",
            crate::frame::Column::Str(new_cities),
        )?;
    }

    Ok(())
}
