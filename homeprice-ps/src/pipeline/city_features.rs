//! Stage 3: city feature enrichment
//!
//! Joins the city reference dictionary, derives three normalized
//! geo-distance pseudo-metrics, and turns the city descriptors into
//! bucketed, binary-encoded feature blocks.

use homeprice_common::{Error, Result};

use crate::encode::{ord_cat, BinaryEncoder};
use crate::frame::{Column, Frame};
use crate::geo::{city_area, RefData};
use crate::pipeline::Mode;
use crate::stats::value_counts;
use crate::store::{ParamStore, ParamValue};

/// Bucket count for the ordinal city descriptors
pub const GEO_BUCKETS: usize = 15;

/// City types kept before collapsing into "other_type"
const TOP_CITY_TYPES: usize = 10;

const OTHER_TYPE: &str = "other_type";

pub fn run(frame: &mut Frame, mode: Mode, store: &mut ParamStore, refs: &RefData) -> Result<()> {
    let states = frame.str_col("state")?.to_vec();
    let cities = frame.str_col("city")?.to_vec();
    let streets = frame.str_col("street")?.to_vec();
    let zipcodes = frame.str_col("zipcode")?.to_vec();

    let records: Vec<_> = states
        .iter()
        .zip(&cities)
        .map(|(state, city)| match (state.as_deref(), city.as_deref()) {
            (Some(s), Some(c)) => refs.city(s, c),
            _ => None,
        })
        .collect();

    // Rare city types collapse into one bucket; the retained set is
    // fitted so replay collapses identically
    let raw_types: Vec<String> = records
        .iter()
        .map(|r| r.map_or_else(|| OTHER_TYPE.to_string(), |r| r.kind.clone()))
        .collect();

    let top_types = store
        .get_or_fit("city_type_top", mode, || {
            let counts = value_counts(raw_types.iter().map(String::as_str));
            Ok(ParamValue::TextList(
                counts
                    .into_iter()
                    .take(TOP_CITY_TYPES)
                    .map(|(v, _)| v)
                    .collect(),
            ))
        })?
        .as_text_list("city_type_top")?
        .to_vec();

    let city_types: Vec<String> = raw_types
        .into_iter()
        .map(|t| {
            if top_types.iter().any(|k| *k == t) {
                t
            } else {
                OTHER_TYPE.to_string()
            }
        })
        .collect();

    // Distance pseudo-metrics, 0.5 when unresolvable
    let mut center = Vec::with_capacity(records.len());
    let mut high = Vec::with_capacity(records.len());
    let mut low = Vec::with_capacity(records.len());
    for (((record, state), city), (street, zipcode)) in records
        .iter()
        .zip(&states)
        .zip(&cities)
        .zip(streets.iter().zip(&zipcodes))
    {
        match (record, state.as_deref(), city.as_deref()) {
            (Some(record), Some(state), Some(city)) => {
                let street = street.as_deref();
                let zipcode = zipcode.as_deref();
                center.push(Some(refs.center_distance(state, city, street, zipcode, record)));
                high.push(Some(refs.high_price_distance(state, city, street, zipcode, record)));
                low.push(Some(refs.low_price_distance(state, city, street, zipcode, record)));
            }
            _ => {
                center.push(Some(crate::geo::UNRESOLVED_DISTANCE));
                high.push(Some(crate::geo::UNRESOLVED_DISTANCE));
                low.push(Some(crate::geo::UNRESOLVED_DISTANCE));
            }
        }
    }
    frame.push("center_dist", Column::F64(center))?;
    frame.push("hp_dist", Column::F64(high))?;
    frame.push("lp_dist", Column::F64(low))?;

    encode_categories(frame, store, mode, "city_type", &city_types)?;

    // Ordinal descriptors: unknown cities carry NaN, which ord_cat
    // sends to the top bucket
    let importance: Vec<f64> = records
        .iter()
        .map(|r| r.map_or(f64::NAN, |r| r.importance))
        .collect();
    bucket_and_encode(frame, store, mode, "city_importance", &importance)?;

    let areas: Vec<f64> = records
        .iter()
        .map(|r| r.map_or(f64::NAN, |r| city_area(&r.boundingbox)))
        .collect();
    bucket_and_encode(frame, store, mode, "city_sqr", &areas)?;

    let lats: Vec<f64> = records.iter().map(|r| r.map_or(f64::NAN, |r| r.lat)).collect();
    bucket_and_encode(frame, store, mode, "city_lat", &lats)?;

    let lngs: Vec<f64> = records.iter().map(|r| r.map_or(f64::NAN, |r| r.lng)).collect();
    bucket_and_encode(frame, store, mode, "city_lng", &lngs)?;

    Ok(())
}

/// Fit (or reuse) a `[min, max]` range for `base`, bucket the values
/// into `GEO_BUCKETS` ordinal categories, and binary-encode them
fn bucket_and_encode(
    frame: &mut Frame,
    store: &mut ParamStore,
    mode: Mode,
    base: &str,
    values: &[f64],
) -> Result<()> {
    let min_name = format!("{}_min", base);
    let max_name = format!("{}_max", base);

    let min_val = store
        .get_or_fit(&min_name, mode, || {
            finite_fold(values, f64::INFINITY, f64::min)
                .map(ParamValue::Float)
                .ok_or_else(|| no_finite_values(base))
        })?
        .as_float(&min_name)?;
    let max_val = store
        .get_or_fit(&max_name, mode, || {
            finite_fold(values, f64::NEG_INFINITY, f64::max)
                .map(ParamValue::Float)
                .ok_or_else(|| no_finite_values(base))
        })?
        .as_float(&max_name)?;

    let buckets: Vec<String> = values
        .iter()
        .map(|v| ord_cat(*v, min_val, max_val, GEO_BUCKETS).to_string())
        .collect();
    encode_categories(frame, store, mode, &format!("{}_cat", base), &buckets)
}

/// Fit (or reuse) a binary encoder for `base` and push its bit columns
pub(super) fn encode_categories(
    frame: &mut Frame,
    store: &mut ParamStore,
    mode: Mode,
    base: &str,
    values: &[String],
) -> Result<()> {
    let enc_name = format!("{}_binenc", base);
    let encoder = store.get_or_fit(&enc_name, mode, || {
        Ok(ParamValue::Encoder(BinaryEncoder::fit(
            values.iter().map(String::as_str),
        )))
    })?;
    let encoder = encoder.as_encoder(&enc_name)?;

    let mut bit_columns: Vec<Vec<u8>> = vec![Vec::with_capacity(values.len()); encoder.bit_width()];
    for value in values {
        for (col, bit) in bit_columns.iter_mut().zip(encoder.encode(value)) {
            col.push(bit);
        }
    }
    for (name, bits) in encoder.column_names(base).into_iter().zip(bit_columns) {
        frame.push(&name, Column::Bin(bits))?;
    }
    Ok(())
}

fn finite_fold(values: &[f64], init: f64, f: fn(f64, f64) -> f64) -> Option<f64> {
    let folded = values.iter().copied().filter(|v| v.is_finite()).fold(init, f);
    folded.is_finite().then_some(folded)
}

fn no_finite_values(base: &str) -> Error {
    Error::InvalidInput(format!("no finite {} values to fit a bucket range", base))
}
