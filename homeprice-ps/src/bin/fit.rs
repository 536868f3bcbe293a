//! homeprice-fit - offline fitting CLI
//!
//! Runs the pipeline in fit mode over a labelled training batch,
//! populating the parameter store, and writes a baseline model. A
//! partially-populated store is completed incrementally on the next
//! run; `--force-rebuild` refits every parameter from scratch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use homeprice_common::config::{self, TomlConfig};
use homeprice_ps::frame::{Frame, TARGET_COLUMN};
use homeprice_ps::geo::RefData;
use homeprice_ps::model::{LinearModel, Predictor, DEFAULT_MODEL_FILE};
use homeprice_ps::pipeline::{self, Mode};
use homeprice_ps::store::ParamStore;

const STORE_FILE: &str = "default_values.json";

#[derive(Debug, Parser)]
#[command(name = "homeprice-fit", about = "Fit the feature pipeline on a training batch")]
struct Cli {
    /// Training batch: JSON array of raw listing rows, each with the
    /// 17 raw columns plus a trailing target price
    #[arg(long)]
    input: PathBuf,

    /// Data directory (overrides HOMEPRICE_DATA_DIR and the TOML config)
    #[arg(long)]
    data_dir: Option<String>,

    /// Refit every parameter instead of reusing stored entries
    #[arg(long)]
    force_rebuild: bool,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let toml_config = TomlConfig::load(&config::config_file_path())?;
    let data_dir = config::resolve_data_dir(cli.data_dir.as_deref(), &toml_config);
    info!("Data directory: {}", data_dir.display());

    let mut store = ParamStore::load(&data_dir.join(STORE_FILE))?;
    let refs = RefData::load(&data_dir);

    let content = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("read training batch {}", cli.input.display()))?;
    let rows: Vec<Vec<serde_json::Value>> =
        serde_json::from_str(&content).context("parse training batch")?;
    info!(rows = rows.len(), "Loaded training batch");

    let mut frame = Frame::from_rows(&rows)?;
    let mode = Mode::Fit {
        force_rebuild: cli.force_rebuild,
    };
    pipeline::run(&mut frame, mode, &mut store, &refs)?;
    info!(
        rows = frame.n_rows(),
        "Pipeline fitted, parameter store written to {}",
        data_dir.join(STORE_FILE).display()
    );

    if frame.has_column(TARGET_COLUMN) {
        write_baseline_model(&mut frame, &data_dir, &toml_config)?;
    } else {
        warn!("Training batch has no target column, skipping model write");
    }

    Ok(())
}

/// Fit a constant mean-target baseline and verify it runs over the
/// training matrix
fn write_baseline_model(
    frame: &mut Frame,
    data_dir: &std::path::Path,
    toml_config: &TomlConfig,
) -> Result<()> {
    let targets = match frame.take(TARGET_COLUMN)? {
        homeprice_ps::frame::Column::F64(values) => values,
        _ => anyhow::bail!("target column is not numeric"),
    };
    let known: Vec<f64> = targets.into_iter().flatten().collect();
    if known.is_empty() {
        warn!("No parseable target prices, skipping model write");
        return Ok(());
    }
    let mean_target = known.iter().sum::<f64>() / known.len() as f64;

    let matrix = frame.to_matrix()?;
    let n_features = matrix.first().map_or(0, Vec::len);
    let model = LinearModel::mean_baseline(n_features, mean_target);
    model.predict(&matrix)?;

    let model_file = toml_config
        .model_file
        .as_deref()
        .unwrap_or(DEFAULT_MODEL_FILE);
    let model_path = data_dir.join(model_file);
    model.save(&model_path)?;
    info!(
        features = n_features,
        "Baseline model written to {}",
        model_path.display()
    );
    Ok(())
}
