//! Stage 5: final state/city encoding
//!
//! Collapses rare cities into one bucket, binary-encodes state and
//! city, and drops the raw address columns, whose signal now lives in
//! the distance features.

use homeprice_common::Result;

use crate::frame::Frame;
use crate::pipeline::city_features::encode_categories;
use crate::pipeline::Mode;
use crate::stats::value_counts;
use crate::store::{ParamStore, ParamValue};

/// Cities kept by frequency before collapsing into "other_city"
const TOP_CITIES: usize = 30;

const OTHER_CITY: &str = "other_city";

pub fn run(frame: &mut Frame, mode: Mode, store: &mut ParamStore) -> Result<()> {
    let cities: Vec<String> = frame
        .str_col("city")?
        .iter()
        .map(|c| c.clone().unwrap_or_default())
        .collect();

    let top_cities = store
        .get_or_fit("top_cities_list", mode, || {
            let counts = value_counts(cities.iter().map(String::as_str));
            Ok(ParamValue::TextList(
                counts.into_iter().take(TOP_CITIES).map(|(v, _)| v).collect(),
            ))
        })?
        .as_text_list("top_cities_list")?
        .to_vec();

    let collapsed: Vec<String> = cities
        .into_iter()
        .map(|c| {
            if top_cities.iter().any(|t| *t == c) {
                c
            } else {
                OTHER_CITY.to_string()
            }
        })
        .collect();

    let states: Vec<String> = frame
        .str_col("state")?
        .iter()
        .map(|s| s.clone().unwrap_or_default())
        .collect();

    encode_categories(frame, store, mode, "state", &states)?;
    encode_categories(frame, store, mode, "city", &collapsed)?;

    frame.drop_columns(&["state", "city", "street", "zipcode"]);
    Ok(())
}
