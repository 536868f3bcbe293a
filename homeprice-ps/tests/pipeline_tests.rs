//! End-to-end pipeline tests: fit/replay parity, store discipline, and
//! the raw-field extraction path

mod helpers;

use homeprice_common::Error;
use homeprice_ps::frame::Frame;
use homeprice_ps::pipeline::{self, Mode};
use homeprice_ps::store::ParamStore;

use helpers::{listing_row, ref_data, training_batch, HOUSTON_STREET};

const FIT: Mode = Mode::Fit {
    force_rebuild: false,
};

/// Unlabelled serving batch over the fixture cities
fn serving_batch(n: usize) -> Vec<Vec<serde_json::Value>> {
    (0..n)
        .map(|i| {
            if i % 2 == 0 {
                listing_row(
                    "TX",
                    "Houston",
                    HOUSTON_STREET,
                    "77001",
                    "1970",
                    "1,250 sqft",
                    None,
                )
            } else {
                listing_row(
                    "FL",
                    "Miami",
                    helpers::MIAMI_STREET,
                    "33126",
                    "1990",
                    "1,480 sqft",
                    None,
                )
            }
        })
        .collect()
}

fn fitted_store(dir: &tempfile::TempDir) -> ParamStore {
    let mut store = ParamStore::load(&dir.path().join("default_values.json")).unwrap();
    let refs = ref_data();
    let mut frame = Frame::from_rows(&training_batch()).unwrap();
    pipeline::run(&mut frame, FIT, &mut store, &refs).unwrap();
    store
}

#[test]
fn fit_and_replay_agree_on_schema() {
    let dir = tempfile::tempdir().unwrap();
    let refs = ref_data();

    let mut store = ParamStore::load(&dir.path().join("default_values.json")).unwrap();
    let mut fit_frame = Frame::from_rows(&training_batch()).unwrap();
    pipeline::run(&mut fit_frame, FIT, &mut store, &refs).unwrap();
    assert_eq!(fit_frame.n_rows(), 30);

    let mut replay_frame = Frame::from_rows(&serving_batch(5)).unwrap();
    pipeline::run(&mut replay_frame, Mode::Replay, &mut store, &refs).unwrap();
    assert_eq!(replay_frame.n_rows(), 5);

    // The target column exists only at fit time; everything else must
    // line up exactly
    let fit_cols: Vec<_> = fit_frame
        .column_names()
        .filter(|n| *n != "target")
        .collect();
    let replay_cols: Vec<_> = replay_frame.column_names().collect();
    assert_eq!(fit_cols, replay_cols);

    let matrix = replay_frame.to_matrix().unwrap();
    assert_eq!(matrix.len(), 5);
    assert!(matrix[0].iter().all(|v| v.is_finite()));
}

#[test]
fn replay_is_deterministic_and_never_writes_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("default_values.json");
    let mut store = fitted_store(&dir);
    let refs = ref_data();

    let before = std::fs::read(&store_path).unwrap();

    let mut first = Frame::from_rows(&serving_batch(8)).unwrap();
    pipeline::run(&mut first, Mode::Replay, &mut store, &refs).unwrap();
    let mut second = Frame::from_rows(&serving_batch(8)).unwrap();
    pipeline::run(&mut second, Mode::Replay, &mut store, &refs).unwrap();

    assert_eq!(first.to_matrix().unwrap(), second.to_matrix().unwrap());

    let after = std::fs::read(&store_path).unwrap();
    assert_eq!(before, after);
}

#[test]
fn two_fit_runs_produce_identical_stores() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let _ = fitted_store(&dir_a);
    let _ = fitted_store(&dir_b);

    let a = std::fs::read_to_string(dir_a.path().join("default_values.json")).unwrap();
    let b = std::fs::read_to_string(dir_b.path().join("default_values.json")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn second_fit_run_reuses_the_store_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("default_values.json");
    let mut store = ParamStore::load(&store_path).unwrap();
    let refs = ref_data();

    let mut first = Frame::from_rows(&training_batch()).unwrap();
    pipeline::run(&mut first, FIT, &mut store, &refs).unwrap();
    let after_first = std::fs::read(&store_path).unwrap();

    // Nothing recomputes without force_rebuild, so the store file does
    // not change and the schema comes out identical
    let mut second = Frame::from_rows(&training_batch()).unwrap();
    pipeline::run(&mut second, FIT, &mut store, &refs).unwrap();

    assert_eq!(std::fs::read(&store_path).unwrap(), after_first);
    let first_cols: Vec<_> = first.column_names().collect();
    let second_cols: Vec<_> = second.column_names().collect();
    assert_eq!(first_cols, second_cols);
}

#[test]
fn replay_against_an_unfitted_store_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ParamStore::load(&dir.path().join("default_values.json")).unwrap();
    let refs = ref_data();

    let mut frame = Frame::from_rows(&serving_batch(3)).unwrap();
    let result = pipeline::run(&mut frame, Mode::Replay, &mut store, &refs);
    assert!(matches!(result, Err(Error::MissingParameter(_))));
}

#[test]
fn replay_reassigns_unknown_cities_to_the_modal_city() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = fitted_store(&dir);
    let refs = ref_data();

    let rows = vec![listing_row(
        "TX",
        "Nowhereville",
        "9 Unknown Rd",
        "00000",
        "1980",
        "1,400 sqft",
        None,
    )];
    let mut frame = Frame::from_rows(&rows).unwrap();
    pipeline::run(&mut frame, Mode::Replay, &mut store, &refs).unwrap();

    assert_eq!(frame.n_rows(), 1);
    let matrix = frame.to_matrix().unwrap();
    assert!(matrix[0].iter().all(|v| v.is_finite()));
}

#[test]
fn baseline_extracts_the_documented_example_row() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ParamStore::load(&dir.path().join("default_values.json")).unwrap();

    let rows = vec![listing_row(
        "TX",
        "Houston",
        HOUSTON_STREET,
        "77001",
        "1967",
        "1,200 sqft",
        None,
    )];
    let mut frame = Frame::from_rows(&rows).unwrap();
    pipeline::baseline::run(&mut frame, FIT, &mut store).unwrap();

    assert_eq!(frame.f64_col("sqft_fl").unwrap()[0], Some(1200.0));
    assert_eq!(frame.bin_col("SINGLE-FAMILY").unwrap()[0], 1);
    assert_eq!(frame.bin_col("CONDOMINIMUM").unwrap()[0], 0);
    assert_eq!(frame.bin_col("TOWNHOUSE").unwrap()[0], 0);
    assert_eq!(frame.bin_col("3-BEDROOMS").unwrap()[0], 1);
    assert_eq!(frame.bin_col("2-BEDROOMS").unwrap()[0], 0);
    assert_eq!(frame.bin_col("2-BATHROOMS").unwrap()[0], 1);
    assert_eq!(frame.bin_col("1-BATHROOM").unwrap()[0], 0);
    assert_eq!(frame.bin_col("2-STORY").unwrap()[0], 1);
    assert_eq!(frame.bin_col("1-STORY").unwrap()[0], 0);

    // Facts and schools expand alongside
    assert_eq!(frame.f64_col("object_age").unwrap()[0], Some(56.0));
    assert_eq!(frame.bin_col("was_remodeled").unwrap()[0], 0);
    assert_eq!(frame.bin_col("has_mls_id").unwrap()[0], 1);
    assert_eq!(frame.bin_col("COOL_CENTRAL_COOLING").unwrap()[0], 1);
    assert_eq!(frame.bin_col("HEAT_FORCED_AIR_HEAT").unwrap()[0], 1);
    assert_eq!(frame.bin_col("PARK_GARAGE").unwrap()[0], 1);
    assert_eq!(frame.bin_col("PARK_ATTACHED").unwrap()[0], 1);
    assert_eq!(frame.f64_col("schools_count").unwrap()[0], Some(2.0));
    assert_eq!(frame.f64_col("schools_avg_rate").unwrap()[0], Some(6.0));
    assert_eq!(frame.f64_col("schools_min_distance").unwrap()[0], Some(0.6));
    assert_eq!(frame.bin_col("schools_K").unwrap()[0], 1);
    assert_eq!(frame.bin_col("schools_M").unwrap()[0], 1);
    assert_eq!(frame.bin_col("schools_PK").unwrap()[0], 0);

    // Consumed raw columns are gone
    assert!(!frame.has_column("homeFacts"));
    assert!(!frame.has_column("schools"));
    assert!(!frame.has_column("propertyType"));
    assert!(!frame.has_column("beds"));
    assert!(!frame.has_column("baths"));
    assert!(!frame.has_column("stories"));
}

#[test]
fn fit_drops_rows_it_cannot_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ParamStore::load(&dir.path().join("default_values.json")).unwrap();
    let refs = ref_data();

    let mut rows = training_batch();
    // Unknown city and missing street both drop at fit time
    rows.push(listing_row(
        "TX",
        "Nowhereville",
        "9 Unknown Rd",
        "00000",
        "1980",
        "1,400 sqft",
        Some("$100,000"),
    ));
    let mut bad_street = listing_row(
        "TX",
        "Houston",
        "",
        "77001",
        "1980",
        "1,400 sqft",
        Some("$100,000"),
    );
    bad_street[3] = serde_json::Value::Null;
    rows.push(bad_street);

    let mut frame = Frame::from_rows(&rows).unwrap();
    pipeline::run(&mut frame, FIT, &mut store, &refs).unwrap();
    assert_eq!(frame.n_rows(), 30);
}
