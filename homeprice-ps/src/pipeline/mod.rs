//! Feature-engineering pipeline
//!
//! Six stages run strictly in order; each derives columns from the
//! frame and reads or populates the parameter store. In fit mode a
//! stage may drop rows it cannot resolve; in replay mode it imputes
//! from fitted parameters instead, so the row count is stable and the
//! store is only read.

use homeprice_common::Result;
use tracing::debug;

use crate::frame::Frame;
use crate::geo::RefData;
use crate::store::ParamStore;

pub mod baseline;
pub mod city_features;
pub mod encode_city;
pub mod final_tune;
pub mod geo_fix;
pub mod population;

/// Pipeline execution mode.
///
/// Fit computes and persists missing statistics and may drop rows;
/// replay strictly reuses the fitted store and never drops a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Fit { force_rebuild: bool },
    Replay,
}

impl Mode {
    pub fn is_fit(self) -> bool {
        matches!(self, Mode::Fit { .. })
    }

    /// Row dropping is a fit-time privilege
    pub fn can_drop_rows(self) -> bool {
        self.is_fit()
    }
}

/// Run all six stages over `frame`
pub fn run(frame: &mut Frame, mode: Mode, store: &mut ParamStore, refs: &RefData) -> Result<()> {
    let start_rows = frame.n_rows();

    baseline::run(frame, mode, store)?;
    debug!(rows = frame.n_rows(), "Baseline cleaning done");

    geo_fix::run(frame, mode, store, refs)?;
    debug!(rows = frame.n_rows(), "State/city correction done");

    city_features::run(frame, mode, store, refs)?;
    debug!(rows = frame.n_rows(), "City feature enrichment done");

    population::run(frame, mode, store, refs)?;
    debug!(rows = frame.n_rows(), "Population enrichment done");

    encode_city::run(frame, mode, store)?;
    debug!(rows = frame.n_rows(), "State/city encoding done");

    final_tune::run(frame, mode, store)?;
    debug!(
        rows_in = start_rows,
        rows_out = frame.n_rows(),
        cols_out = frame.n_cols(),
        "Pipeline complete"
    );

    Ok(())
}
