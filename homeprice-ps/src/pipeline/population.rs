//! Stage 4: population enrichment
//!
//! Joins per-(state, city) median population and density from the US
//! cities table, imputes gaps per-state then globally, and buckets and
//! binary-encodes both columns.

use std::collections::BTreeMap;

use homeprice_common::{Error, Result};

use crate::encode::ord_cat;
use crate::frame::Frame;
use crate::geo::{city_key, RefData};
use crate::pipeline::city_features::{encode_categories, GEO_BUCKETS};
use crate::pipeline::Mode;
use crate::stats::median;
use crate::store::{ParamStore, ParamValue, PopulationMedians};

pub fn run(frame: &mut Frame, mode: Mode, store: &mut ParamStore, refs: &RefData) -> Result<()> {
    let states = frame.str_col("state")?.to_vec();
    let cities = frame.str_col("city")?.to_vec();

    let mut population: Vec<Option<f64>> = Vec::with_capacity(states.len());
    let mut density: Vec<Option<f64>> = Vec::with_capacity(states.len());
    for (state, city) in states.iter().zip(&cities) {
        let joined = match (state.as_deref(), city.as_deref()) {
            (Some(s), Some(c)) => refs.population.get(&city_key(s, c)),
            _ => None,
        };
        population.push(joined.map(|p| p.population));
        density.push(joined.map(|p| p.density));
    }

    let state_medians = store
        .get_or_fit("pop_state_medians", mode, || {
            let mut by_state: BTreeMap<String, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
            for ((state, p), d) in states.iter().zip(&population).zip(&density) {
                if let (Some(state), Some(p)) = (state, p) {
                    let entry = by_state.entry(state.clone()).or_default();
                    entry.0.push(*p);
                    if let Some(d) = d {
                        entry.1.push(*d);
                    }
                }
            }
            let medians = by_state
                .into_iter()
                .filter_map(|(state, (pops, dens))| {
                    let population = median(pops)?;
                    let density = median(dens)?;
                    Some((state, PopulationMedians { population, density }))
                })
                .collect();
            Ok(ParamValue::PopMedians(medians))
        })?
        .as_pop_medians("pop_state_medians")?
        .clone();

    // Per-state imputation first
    for ((state, p), d) in states.iter().zip(&mut population).zip(&mut density) {
        let Some(medians) = state.as_deref().and_then(|s| state_medians.get(s)) else {
            continue;
        };
        if p.is_none() {
            *p = Some(medians.population);
        }
        if d.is_none() {
            *d = Some(medians.density);
        }
    }

    let p_median = store
        .get_or_fit("p_median", mode, || {
            median(population.iter().flatten().copied())
                .map(ParamValue::Float)
                .ok_or_else(|| Error::InvalidInput("no population values to fit a median".into()))
        })?
        .as_float("p_median")?;
    let d_median = store
        .get_or_fit("d_median", mode, || {
            median(density.iter().flatten().copied())
                .map(ParamValue::Float)
                .ok_or_else(|| Error::InvalidInput("no density values to fit a median".into()))
        })?
        .as_float("d_median")?;

    if mode.can_drop_rows() {
        let keep: Vec<bool> = population.iter().map(Option::is_some).collect();
        let mut i = 0;
        population.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
        let mut i = 0;
        density.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
        frame.retain_rows(&keep)?;
    } else {
        for p in population.iter_mut() {
            if p.is_none() {
                *p = Some(p_median);
            }
        }
        for d in density.iter_mut() {
            if d.is_none() {
                *d = Some(d_median);
            }
        }
    }

    bucket_and_encode(frame, store, mode, "population", &population)?;
    bucket_and_encode(frame, store, mode, "density", &density)?;

    Ok(())
}

fn bucket_and_encode(
    frame: &mut Frame,
    store: &mut ParamStore,
    mode: Mode,
    base: &str,
    values: &[Option<f64>],
) -> Result<()> {
    let min_name = format!("{}_min", base);
    let max_name = format!("{}_max", base);

    let min_val = store
        .get_or_fit(&min_name, mode, || {
            fold(values, f64::INFINITY, f64::min)
                .map(ParamValue::Float)
                .ok_or_else(|| Error::InvalidInput(format!("no {} values to fit a range", base)))
        })?
        .as_float(&min_name)?;
    let max_val = store
        .get_or_fit(&max_name, mode, || {
            fold(values, f64::NEG_INFINITY, f64::max)
                .map(ParamValue::Float)
                .ok_or_else(|| Error::InvalidInput(format!("no {} values to fit a range", base)))
        })?
        .as_float(&max_name)?;

    let buckets: Vec<String> = values
        .iter()
        .map(|v| {
            ord_cat(v.unwrap_or(f64::NAN), min_val, max_val, GEO_BUCKETS).to_string()
        })
        .collect();
    encode_categories(frame, store, mode, &format!("{}_cat", base), &buckets)
}

fn fold(values: &[Option<f64>], init: f64, f: fn(f64, f64) -> f64) -> Option<f64> {
    let folded = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .fold(init, f);
    folded.is_finite().then_some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Column;

    fn listing_frame(rows: &[(&str, &str)]) -> Frame {
        let mut frame = Frame::new();
        frame
            .push(
                "state",
                Column::Str(rows.iter().map(|(s, _)| Some(s.to_string())).collect()),
            )
            .unwrap();
        frame
            .push(
                "city",
                Column::Str(rows.iter().map(|(_, c)| Some(c.to_string())).collect()),
            )
            .unwrap();
        frame
    }

    fn refs() -> RefData {
        let mut refs = RefData::default();
        for (city, population, density) in [
            ("houston", 1000.0, 10.0),
            ("austin", 3000.0, 30.0),
            ("waco", 2000.0, 20.0),
        ] {
            refs.population.insert(
                city_key("TX", city),
                PopulationMedians { population, density },
            );
        }
        refs
    }

    #[test]
    fn replay_imputes_density_from_the_density_median() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ParamStore::load(&dir.path().join("default_values.json")).unwrap();
        let refs = refs();

        let mut fit_frame = listing_frame(&[("TX", "houston"), ("TX", "austin"), ("TX", "waco")]);
        run(
            &mut fit_frame,
            Mode::Fit {
                force_rebuild: false,
            },
            &mut store,
            &refs,
        )
        .unwrap();

        // The two global medians differ, so a density gap filled from
        // the population median would bucket past the fitted range
        assert_eq!(store.get("p_median").unwrap().as_float("p_median").unwrap(), 2000.0);
        assert_eq!(store.get("d_median").unwrap().as_float("d_median").unwrap(), 20.0);

        // Row 1 joins nothing and its state has no fitted medians, so
        // both gaps fill globally; it must bucket exactly like the
        // median city in row 0
        let mut replay_frame = listing_frame(&[("TX", "waco"), ("NV", "reno")]);
        run(&mut replay_frame, Mode::Replay, &mut store, &refs).unwrap();

        let enc_name = "density_cat_binenc";
        let encoder = store.get(enc_name).unwrap().as_encoder(enc_name).unwrap();
        for name in encoder.column_names("density_cat") {
            let bits = replay_frame.bin_col(&name).unwrap();
            assert_eq!(bits[0], bits[1], "{name}");
        }
    }
}
