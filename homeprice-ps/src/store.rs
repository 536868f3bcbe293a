//! Parameter store: fitted statistics shared between fit and replay
//!
//! Single source of truth for every statistic fit during training and
//! required, unchanged, during inference. Entries are named, typed
//! values persisted wholesale to one JSON file. Writes are atomic
//! (temp file then rename). An absent backing file bootstraps an empty
//! store.
//!
//! The store is an explicitly constructed object passed into each
//! pipeline stage; every cached statistic goes through `get_or_fit`,
//! the single read-or-recompute primitive.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use homeprice_common::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::encode::BinaryEncoder;
use crate::pipeline::Mode;
use crate::reduce::{Pca, StandardScaler};

/// Per-state population/density medians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationMedians {
    pub population: f64,
    pub density: f64,
}

/// A named, typed value in the parameter store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ParamValue {
    /// Scalar threshold / statistic (median, min, max)
    Float(f64),
    /// Single categorical value (modal state, modal year)
    Text(String),
    /// Category list (top cities, top city types)
    TextList(Vec<String>),
    /// Weighted sample list (values repeated per weight)
    WeightedList(Vec<String>),
    /// Per-state modal city
    CityByState(BTreeMap<String, String>),
    /// Per-state population/density medians
    PopMedians(BTreeMap<String, PopulationMedians>),
    /// Fitted categorical binary encoder
    Encoder(BinaryEncoder),
    /// Fitted dimensionality-reduction projection
    Projection(Pca),
    /// Fitted standardization scaler
    Scaler(StandardScaler),
}

impl ParamValue {
    pub fn as_float(&self, name: &str) -> Result<f64> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            _ => Err(type_error(name, "Float")),
        }
    }

    pub fn as_text(&self, name: &str) -> Result<&str> {
        match self {
            ParamValue::Text(v) => Ok(v),
            _ => Err(type_error(name, "Text")),
        }
    }

    pub fn as_text_list(&self, name: &str) -> Result<&[String]> {
        match self {
            ParamValue::TextList(v) => Ok(v),
            _ => Err(type_error(name, "TextList")),
        }
    }

    pub fn as_weighted_list(&self, name: &str) -> Result<&[String]> {
        match self {
            ParamValue::WeightedList(v) => Ok(v),
            _ => Err(type_error(name, "WeightedList")),
        }
    }

    pub fn as_city_by_state(&self, name: &str) -> Result<&BTreeMap<String, String>> {
        match self {
            ParamValue::CityByState(v) => Ok(v),
            _ => Err(type_error(name, "CityByState")),
        }
    }

    pub fn as_pop_medians(&self, name: &str) -> Result<&BTreeMap<String, PopulationMedians>> {
        match self {
            ParamValue::PopMedians(v) => Ok(v),
            _ => Err(type_error(name, "PopMedians")),
        }
    }

    pub fn as_encoder(&self, name: &str) -> Result<&BinaryEncoder> {
        match self {
            ParamValue::Encoder(v) => Ok(v),
            _ => Err(type_error(name, "Encoder")),
        }
    }

    pub fn as_projection(&self, name: &str) -> Result<&Pca> {
        match self {
            ParamValue::Projection(v) => Ok(v),
            _ => Err(type_error(name, "Projection")),
        }
    }

    pub fn as_scaler(&self, name: &str) -> Result<&StandardScaler> {
        match self {
            ParamValue::Scaler(v) => Ok(v),
            _ => Err(type_error(name, "Scaler")),
        }
    }
}

fn type_error(name: &str, expected: &str) -> Error {
    Error::Internal(format!(
        "parameter '{}' has unexpected type (expected {})",
        name, expected
    ))
}

/// File-backed parameter store
#[derive(Debug)]
pub struct ParamStore {
    path: PathBuf,
    entries: BTreeMap<String, ParamValue>,
}

impl ParamStore {
    /// Load the store from `path`, bootstrapping an empty persisted
    /// store when the backing file does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let entries: BTreeMap<String, ParamValue> = serde_json::from_str(&content)?;
            info!(
                "Loaded {} fitted parameters from {}",
                entries.len(),
                path.display()
            );
            Ok(Self {
                path: path.to_path_buf(),
                entries,
            })
        } else {
            info!(
                "Parameter store {} does not exist, bootstrapping empty store",
                path.display()
            );
            let store = Self {
                path: path.to_path_buf(),
                entries: BTreeMap::new(),
            };
            store.persist()?;
            Ok(store)
        }
    }

    /// Read a stored entry; absence is fatal (replay must never invent
    /// a value).
    pub fn get(&self, name: &str) -> Result<&ParamValue> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::MissingParameter(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Overwrite an entry and persist immediately
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<()> {
        debug!(parameter = name, "Persisting fitted parameter");
        self.entries.insert(name.to_string(), value);
        self.persist()
    }

    /// The read-or-recompute primitive used by every pipeline stage.
    ///
    /// - Entry exists and rebuild is not forced: return the stored value.
    /// - Fit mode, entry missing or rebuild forced: run `compute`,
    ///   persist the result, return it. Repeated fit runs therefore
    ///   complete a partially-populated store incrementally.
    /// - Replay mode, entry missing: fail with `MissingParameter`.
    pub fn get_or_fit(
        &mut self,
        name: &str,
        mode: Mode,
        compute: impl FnOnce() -> Result<ParamValue>,
    ) -> Result<ParamValue> {
        match mode {
            Mode::Replay => self.get(name).cloned(),
            Mode::Fit { force_rebuild } => {
                if !force_rebuild {
                    if let Some(existing) = self.entries.get(name) {
                        return Ok(existing.clone());
                    }
                }
                let value = compute()?;
                self.set(name, value.clone())?;
                Ok(value)
            }
        }
    }

    fn persist(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
