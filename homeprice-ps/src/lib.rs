//! homeprice-ps library interface
//!
//! Feature-engineering pipeline and prediction serving for real-estate
//! listings. The binary crates (`homeprice-ps`, `homeprice-fit`) wire
//! these pieces to the HTTP server and the fit CLI respectively.

pub mod api;
pub mod encode;
pub mod extract;
pub mod frame;
pub mod geo;
pub mod model;
pub mod pipeline;
pub mod reduce;
pub mod stats;
pub mod store;

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::geo::RefData;
use crate::model::Predictor;
use crate::store::ParamStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Fitted parameter store (replay only reads it)
    pub store: Arc<RwLock<ParamStore>>,
    /// Reference dictionaries, loaded once at startup
    pub refs: Arc<RefData>,
    /// Prediction model
    pub model: Arc<dyn Predictor>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: ParamStore, refs: RefData, model: Arc<dyn Predictor>) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            refs: Arc::new(refs),
            model,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::predict_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
