//! Stage 1: baseline cleaning
//!
//! Expands the semi-structured raw fields into typed feature columns,
//! imputes the simple gaps, and drops every consumed raw column.

use homeprice_common::Result;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::extract::classify::{COOLING, HEATING, PARKING, PROPERTY_TYPE, STORY_FROM_PROPERTY_TYPE};
use crate::extract::jsonish::subfact;
use crate::extract::rooms::{
    baths_to_int, beds_to_int, room_flags, sqft_to_f64, story_count, BATH_FEATURES, BED_FEATURES,
};
use crate::extract::schools::{summarize, GRADE_CATEGORIES};
use crate::frame::{Column, Frame};
use crate::pipeline::Mode;
use crate::stats::{coverage_size, median, modal, value_counts, weighted_random_item, weighted_subset};
use crate::store::{ParamStore, ParamValue};

/// Raw columns with no predictive signal
const UNINFORMATIVE_COLUMNS: [&str; 5] =
    ["status", "private pool", "fireplace", "mls-id", "PrivatePool"];

/// Nested facts pulled out of the homeFacts blob
const FACTS: [(&str, &str); 5] = [
    ("fact_year_built", "Year built"),
    ("fact_remodeled_year", "Remodeled year"),
    ("fact_cooling", "Cooling"),
    ("fact_heating", "Heating"),
    ("fact_parking", "Parking"),
];

/// City backfill for a handful of zip codes scraped without one
const CITY_BY_ZIP_STATE: [(&str, &str); 11] = [
    ("32686_FL", "Reddick"),
    ("32668_FL", "Morriston"),
    ("78045_TX", "Laredo"),
    ("34474_FL", "Ocala"),
    ("34432_FL", "Dunnellon"),
    ("34741_FL", "Kissimmee"),
    ("38732_MS", "Cleveland"),
    ("34747_FL", "Kissimmee"),
    ("34744_FL", "Kissimmee"),
    ("33126_FL", "Miami"),
    ("77032_TX", "Houston"),
];

/// Reference year for property age
pub const BASE_YEAR: i64 = 2023;

/// Square footage at or above this is treated as a scraping artifact
const SQFT_OUTLIER: f64 = 15000.0;

/// Last-resort square footage when neither the batch nor the store has
/// a usable median
const SQFT_PLACEHOLDER: f64 = 1500.0;

const MISSING_CITY: &str = "--";
const NO_DATA_YEAR: &str = "No Data";

fn city_by_zip_state(zipcode: &str, state: &str) -> Option<&'static str> {
    let key = format!("{}_{}", zipcode, state);
    CITY_BY_ZIP_STATE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, city)| *city)
}

pub fn run(frame: &mut Frame, mode: Mode, store: &mut ParamStore) -> Result<()> {
    frame.drop_columns(&UNINFORMATIVE_COLUMNS);

    expand_facts(frame)?;
    expand_schools(frame)?;
    resolve_city(frame, mode)?;
    resolve_sqft(frame, mode, store)?;
    flag_mls_id(frame)?;
    expand_property_type(frame)?;
    expand_beds_and_baths(frame)?;
    flag_remodeled(frame)?;
    resolve_year_built(frame, mode, store)?;
    expand_hvac_and_parking(frame)?;

    Ok(())
}

fn expand_facts(frame: &mut Frame) -> Result<()> {
    let home_facts = frame.str_col("homeFacts")?.to_vec();
    for (col_name, label) in FACTS {
        let values: Vec<Option<String>> = home_facts
            .iter()
            .map(|v| v.as_deref().and_then(|s| subfact(s, label)))
            .collect();
        frame.push(col_name, Column::Str(values))?;
    }
    frame.drop_columns(&["homeFacts"]);
    Ok(())
}

fn expand_schools(frame: &mut Frame) -> Result<()> {
    let summaries: Vec<_> = frame
        .str_col("schools")?
        .iter()
        .map(|v| v.as_deref().and_then(summarize))
        .collect();

    // An unparsable blob degrades to an empty summary rather than a
    // hole in the numeric columns
    let numeric = |f: fn(&crate::extract::schools::SchoolSummary) -> f64| {
        Column::F64(
            summaries
                .iter()
                .map(|s| Some(s.as_ref().map_or(0.0, f)))
                .collect(),
        )
    };
    frame.push("schools_count", numeric(|s| s.count))?;
    frame.push("schools_avg_rate", numeric(|s| s.avg_rating))?;
    frame.push("schools_min_distance", numeric(|s| s.min_distance))?;
    frame.push("schools_avg_distance", numeric(|s| s.avg_distance))?;

    for category in GRADE_CATEGORIES {
        let flags: Vec<u8> = summaries
            .iter()
            .map(|s| {
                u8::from(
                    s.as_ref()
                        .is_some_and(|s| s.grades.iter().any(|g| g == category)),
                )
            })
            .collect();
        frame.push(&format!("schools_{}", category), Column::Bin(flags))?;
    }

    frame.drop_columns(&["schools"]);
    Ok(())
}

fn resolve_city(frame: &mut Frame, mode: Mode) -> Result<()> {
    let states = frame.str_col("state")?.to_vec();
    let zipcodes = frame.str_col("zipcode")?.to_vec();

    let cities = frame.str_col_mut("city")?;
    for ((city, state), zipcode) in cities.iter_mut().zip(&states).zip(&zipcodes) {
        if city.is_none() {
            if let (Some(state), Some(zipcode)) = (state.as_deref(), zipcode.as_deref()) {
                *city = city_by_zip_state(zipcode, state).map(str::to_string);
            }
        }
    }

    if mode.can_drop_rows() {
        let keep: Vec<bool> = frame.str_col("city")?.iter().map(Option::is_some).collect();
        frame.retain_rows(&keep)?;
        let keep: Vec<bool> = frame
            .str_col("street")?
            .iter()
            .map(Option::is_some)
            .collect();
        frame.retain_rows(&keep)?;
    } else {
        for city in frame.str_col_mut("city")?.iter_mut() {
            if city.is_none() {
                *city = Some(MISSING_CITY.to_string());
            }
        }
    }

    for city in frame.str_col_mut("city")?.iter_mut() {
        if let Some(c) = city {
            *c = c.to_lowercase();
        }
    }
    Ok(())
}

fn resolve_sqft(frame: &mut Frame, mode: Mode, store: &mut ParamStore) -> Result<()> {
    let mut values: Vec<Option<f64>> = frame
        .str_col("sqft")?
        .iter()
        .map(|v| v.as_deref().and_then(sqft_to_f64))
        .collect();

    // Fitted from in-range parsed values only; imputation in both modes
    // goes through the stored median
    let sqft_median = store
        .get_or_fit("sqft_median", mode, || {
            let in_range = values
                .iter()
                .flatten()
                .copied()
                .filter(|v| *v < SQFT_OUTLIER);
            Ok(ParamValue::Float(median(in_range).unwrap_or(SQFT_PLACEHOLDER)))
        })?
        .as_float("sqft_median")?;

    for v in values.iter_mut() {
        if v.is_none() || v.is_some_and(|v| v >= SQFT_OUTLIER) {
            *v = Some(sqft_median);
        }
    }

    if mode.can_drop_rows() {
        // Fit drops the outlier rows instead of keeping the imputation
        let keep: Vec<bool> = frame
            .str_col("sqft")?
            .iter()
            .map(|v| {
                v.as_deref()
                    .and_then(sqft_to_f64)
                    .is_none_or(|v| v < SQFT_OUTLIER)
            })
            .collect();
        let mut i = 0;
        values.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
        frame.retain_rows(&keep)?;
    }
    frame.push("sqft_fl", Column::F64(values))?;

    frame.drop_columns(&["sqft"]);
    Ok(())
}

fn flag_mls_id(frame: &mut Frame) -> Result<()> {
    let flags: Vec<u8> = frame
        .str_col("MlsId")?
        .iter()
        .map(|v| u8::from(v.is_some()))
        .collect();
    frame.push("has_mls_id", Column::Bin(flags))?;
    frame.drop_columns(&["MlsId"]);
    Ok(())
}

fn expand_property_type(frame: &mut Frame) -> Result<()> {
    let mut types = frame.str_col("propertyType")?.to_vec();

    // Batch-modal fill; count ties resolve to the smallest value
    if let Some(fill) = modal(types.iter().flatten().map(String::as_str)) {
        for t in types.iter_mut() {
            if t.is_none() {
                *t = Some(fill.clone());
            }
        }
    }

    push_table_flags(frame, &PROPERTY_TYPE, &types, "")?;
    push_table_flags(frame, &STORY_FROM_PROPERTY_TYPE, &types, "")?;

    // A parseable stories field overrides the property-type-derived
    // story flags, zeros included
    let story_counts: Vec<Option<i64>> = frame
        .str_col("stories")?
        .iter()
        .map(|v| v.as_deref().and_then(story_count))
        .collect();

    let n_buckets = STORY_FROM_PROPERTY_TYPE.len();
    for (bucket, name) in STORY_FROM_PROPERTY_TYPE.feature_names().enumerate() {
        let ordinal = (bucket + 1) as i64;
        let last = bucket + 1 == n_buckets;
        let mut flags = frame.bin_col(name)?.to_vec();
        for (flag, count) in flags.iter_mut().zip(&story_counts) {
            if let Some(count) = count {
                let hit = if last { ordinal <= *count } else { ordinal == *count };
                *flag = u8::from(hit);
            }
        }
        frame.push(name, Column::Bin(flags))?;
    }

    frame.drop_columns(&["propertyType", "stories"]);
    Ok(())
}

fn expand_beds_and_baths(frame: &mut Frame) -> Result<()> {
    let beds: Vec<Option<i64>> = frame
        .str_col("beds")?
        .iter()
        .map(|v| v.as_deref().and_then(beds_to_int))
        .collect();
    push_room_flags(frame, &BED_FEATURES, &beds)?;

    let baths: Vec<Option<i64>> = frame
        .str_col("baths")?
        .iter()
        .map(|v| v.as_deref().and_then(baths_to_int))
        .collect();
    push_room_flags(frame, &BATH_FEATURES, &baths)?;

    frame.drop_columns(&["beds", "baths"]);
    Ok(())
}

fn push_room_flags(frame: &mut Frame, features: &[&str; 7], counts: &[Option<i64>]) -> Result<()> {
    for (bucket, name) in features.iter().copied().enumerate() {
        let flags: Vec<u8> = counts
            .iter()
            .map(|c| c.map_or(0, |c| room_flags(c)[bucket]))
            .collect();
        frame.push(name, Column::Bin(flags))?;
    }
    Ok(())
}

fn flag_remodeled(frame: &mut Frame) -> Result<()> {
    let flags: Vec<u8> = frame
        .str_col("fact_remodeled_year")?
        .iter()
        .map(|v| u8::from(v.is_some()))
        .collect();
    frame.push("was_remodeled", Column::Bin(flags))?;
    frame.drop_columns(&["fact_remodeled_year"]);
    Ok(())
}

fn resolve_year_built(frame: &mut Frame, mode: Mode, store: &mut ParamStore) -> Result<()> {
    // Unparsable years are treated the same as the "No Data" literal
    let known: Vec<Option<i64>> = frame
        .str_col("fact_year_built")?
        .iter()
        .map(|v| {
            v.as_deref()
                .filter(|s| *s != NO_DATA_YEAR)
                .and_then(crate::extract::rooms::parse_locale_f64)
                .map(|y| y.round() as i64)
        })
        .collect();

    let known_strs: Vec<String> = known.iter().flatten().map(|y| y.to_string()).collect();

    let distribution = store
        .get_or_fit("years_distr_subset", mode, || {
            let counts = value_counts(known_strs.iter().map(String::as_str));
            let size = coverage_size(&counts, 50.0, 10, 5);
            Ok(ParamValue::WeightedList(weighted_subset(&counts, size, 10.0)))
        })?
        .as_weighted_list("years_distr_subset")?
        .to_vec();

    let years: Vec<i64> = if mode.is_fit() {
        let mut rng = SmallRng::seed_from_u64(42);
        let filled: Vec<i64> = known
            .iter()
            .map(|y| match y {
                Some(y) => Ok(*y),
                None => weighted_random_item(&distribution, &mut rng)
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or_else(|| {
                        homeprice_common::Error::InvalidInput(
                            "no build years available to fit a distribution".into(),
                        )
                    }),
            })
            .collect::<Result<_>>()?;

        let filled_strs: Vec<String> = filled.iter().map(|y| y.to_string()).collect();
        store.get_or_fit("years_mode", mode, || {
            modal(filled_strs.iter().map(String::as_str))
                .map(ParamValue::Text)
                .ok_or_else(|| {
                    homeprice_common::Error::InvalidInput(
                        "no build years available to fit a mode".into(),
                    )
                })
        })?;
        filled
    } else {
        let mode_year: i64 = store
            .get("years_mode")?
            .as_text("years_mode")?
            .parse()
            .map_err(|_| {
                homeprice_common::Error::Internal("stored years_mode is not a year".into())
            })?;
        known.iter().map(|y| y.unwrap_or(mode_year)).collect()
    };

    let ages: Vec<Option<f64>> = years
        .iter()
        .map(|y| Some((BASE_YEAR - y).max(0) as f64))
        .collect();
    frame.push("object_age", Column::F64(ages))?;
    frame.drop_columns(&["fact_year_built"]);
    Ok(())
}

fn expand_hvac_and_parking(frame: &mut Frame) -> Result<()> {
    // The three tables share a few feature names (GAS, ELECTRIC, ...),
    // so each block is prefixed to keep all of them in the schema
    let cooling = frame.str_col("fact_cooling")?.to_vec();
    push_table_flags(frame, &COOLING, &cooling, "COOL_")?;

    let heating = frame.str_col("fact_heating")?.to_vec();
    push_table_flags(frame, &HEATING, &heating, "HEAT_")?;

    let parking = frame.str_col("fact_parking")?.to_vec();
    push_table_flags(frame, &PARKING, &parking, "PARK_")?;

    frame.drop_columns(&["fact_cooling", "fact_heating", "fact_parking"]);
    Ok(())
}

fn push_table_flags(
    frame: &mut Frame,
    table: &crate::extract::classify::PatternTable,
    values: &[Option<String>],
    prefix: &str,
) -> Result<()> {
    let row_flags: Vec<Option<Vec<u8>>> = values
        .iter()
        .map(|v| v.as_deref().map(|s| table.flags(s)))
        .collect();

    for (i, name) in table.feature_names().enumerate() {
        let flags: Vec<u8> = row_flags
            .iter()
            .map(|f| f.as_ref().map_or(0, |f| f[i]))
            .collect();
        frame.push(&format!("{}{}", prefix, name), Column::Bin(flags))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_state_backfill() {
        assert_eq!(city_by_zip_state("78045", "TX"), Some("Laredo"));
        assert_eq!(city_by_zip_state("34747", "FL"), Some("Kissimmee"));
        assert_eq!(city_by_zip_state("78045", "FL"), None);
        assert_eq!(city_by_zip_state("00000", "TX"), None);
    }
}
