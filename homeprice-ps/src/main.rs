//! homeprice-ps - Prediction Serving Service
//!
//! Loads the fitted parameter store, reference dictionaries, and model
//! weights, then serves replay-mode predictions over HTTP.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use homeprice_common::config::{self, TomlConfig};
use homeprice_ps::geo::RefData;
use homeprice_ps::model::{LinearModel, DEFAULT_MODEL_FILE};
use homeprice_ps::store::ParamStore;
use homeprice_ps::AppState;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5900";
const STORE_FILE: &str = "default_values.json";

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting homeprice-ps (Prediction Serving)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let toml_config = TomlConfig::load(&config::config_file_path())?;
    let data_dir = config::resolve_data_dir(None, &toml_config);
    info!("Data directory: {}", data_dir.display());

    let store = ParamStore::load(&data_dir.join(STORE_FILE))?;
    let refs = RefData::load(&data_dir);

    let model_file = toml_config
        .model_file
        .as_deref()
        .unwrap_or(DEFAULT_MODEL_FILE);
    let model = LinearModel::load(&data_dir.join(model_file))?;

    let state = AppState::new(store, refs, Arc::new(model));
    let app = homeprice_ps::build_router(state);

    let bind_address = toml_config
        .bind_address
        .as_deref()
        .unwrap_or(DEFAULT_BIND_ADDRESS);
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
