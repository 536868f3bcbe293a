//! Stage 6: dimensionality reduction and scaling
//!
//! Projects the two binary-encoded blocks through fitted reductions
//! and standardizes the six core numeric columns. The block column
//! lists come from the fitted encoders, so fit and replay always agree
//! on block membership and order.

use homeprice_common::{Error, Result};

use crate::frame::{Column, Frame};
use crate::pipeline::Mode;
use crate::reduce::{
    shrunk_components, Pca, StandardScaler, PCA_SHRINK_RATE_1, PCA_SHRINK_RATE_2,
};
use crate::store::{ParamStore, ParamValue};

/// Encoder bases whose bit columns form the city-descriptor block
const CITY_DESCR_BASES: [&str; 6] = [
    "city_type",
    "city_importance_cat",
    "city_sqr_cat",
    "city_lat_cat",
    "city_lng_cat",
    "city",
];

/// Encoder bases whose bit columns form the population block
const POPULATION_BASES: [&str; 2] = ["population_cat", "density_cat"];

/// Continuous columns standardized at the very end
pub const NUM_COLS: [&str; 6] = [
    "schools_count",
    "schools_avg_rate",
    "schools_min_distance",
    "schools_avg_distance",
    "sqft_fl",
    "object_age",
];

pub fn run(frame: &mut Frame, mode: Mode, store: &mut ParamStore) -> Result<()> {
    let city_block = block_columns(store, &CITY_DESCR_BASES)?;
    project_block(
        frame,
        store,
        mode,
        "pca_city_descr",
        &city_block,
        PCA_SHRINK_RATE_1,
        "cdcf",
    )?;

    let population_block = block_columns(store, &POPULATION_BASES)?;
    project_block(
        frame,
        store,
        mode,
        "pca_cpop",
        &population_block,
        PCA_SHRINK_RATE_2,
        "cp",
    )?;

    scale_numeric(frame, store, mode)?;
    Ok(())
}

/// Bit column names contributed by each fitted encoder, in block order
fn block_columns(store: &ParamStore, bases: &[&str]) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for base in bases {
        let enc_name = format!("{}_binenc", base);
        let encoder = store.get(&enc_name)?.as_encoder(&enc_name)?;
        names.extend(encoder.column_names(base));
    }
    Ok(names)
}

fn project_block(
    frame: &mut Frame,
    store: &mut ParamStore,
    mode: Mode,
    param: &str,
    columns: &[String],
    rate: f64,
    out_prefix: &str,
) -> Result<()> {
    let mut rows = vec![Vec::with_capacity(columns.len()); frame.n_rows()];
    for name in columns {
        for (row, bit) in rows.iter_mut().zip(frame.bin_col(name)?) {
            row.push(f64::from(*bit));
        }
    }

    let pca = store.get_or_fit(param, mode, || {
        Ok(ParamValue::Projection(Pca::fit(
            &rows,
            shrunk_components(columns.len(), rate),
        )?))
    })?;
    let pca = pca.as_projection(param)?;

    if pca.n_dims() != columns.len() {
        return Err(Error::Internal(format!(
            "{} was fitted on {} columns, block has {}",
            param,
            pca.n_dims(),
            columns.len()
        )));
    }

    let mut projected = vec![Vec::with_capacity(frame.n_rows()); pca.n_components()];
    for row in &rows {
        for (col, v) in projected.iter_mut().zip(pca.transform_row(row)?) {
            col.push(Some(v));
        }
    }

    let names: Vec<&str> = columns.iter().map(String::as_str).collect();
    frame.drop_columns(&names);
    for (i, col) in projected.into_iter().enumerate() {
        frame.push(&format!("{}_{}", out_prefix, i + 1), Column::F64(col))?;
    }
    Ok(())
}

fn scale_numeric(frame: &mut Frame, store: &mut ParamStore, mode: Mode) -> Result<()> {
    let mut columns = Vec::with_capacity(NUM_COLS.len());
    for name in NUM_COLS {
        let values: Vec<f64> = frame
            .f64_col(name)?
            .iter()
            .map(|v| {
                v.ok_or_else(|| {
                    Error::Internal(format!("column '{}' still has gaps before scaling", name))
                })
            })
            .collect::<Result<_>>()?;
        columns.push(values);
    }

    let scaler = store.get_or_fit("std_scaler", mode, || {
        Ok(ParamValue::Scaler(StandardScaler::fit(&columns)?))
    })?;
    let scaler = scaler.as_scaler("std_scaler")?;

    for (i, (name, mut values)) in NUM_COLS.into_iter().zip(columns).enumerate() {
        scaler.transform_column(i, &mut values)?;
        frame.push(name, Column::F64(values.into_iter().map(Some).collect()))?;
    }
    Ok(())
}
