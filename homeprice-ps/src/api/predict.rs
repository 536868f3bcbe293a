//! Prediction endpoint
//!
//! Runs the replay-mode pipeline over a batch of raw listing rows and
//! returns one prediction per row. Failures are reported in-band: the
//! HTTP status is always 200 and the JSON `status` field carries
//! `"OK"` or `"ERROR"`, so batch clients get one uniform envelope.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use homeprice_common::Result;

use crate::frame::Frame;
use crate::pipeline::{self, Mode};
use crate::AppState;

/// Raw prediction request: one array of cell values per listing
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub data: Vec<Vec<serde_json::Value>>,
}

/// In-band response envelope
#[derive(Debug, Serialize)]
#[serde(tag = "status")]
pub enum PredictResponse {
    #[serde(rename = "OK")]
    Ok { predictions: Vec<f64> },
    #[serde(rename = "ERROR")]
    Error { error: String },
}

/// GET /
pub async fn index() -> &'static str {
    "Use POST method to send data to /predict URI"
}

/// POST /predict
///
/// The request is taken as a rejection-capturing `Result` so malformed
/// bodies and missing content types also come back as the in-band
/// envelope instead of a transport-level 4xx.
pub async fn predict(
    State(state): State<AppState>,
    request: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Json<PredictResponse> {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            error!("Prediction request rejected: {}", rejection);
            return Json(PredictResponse::Error {
                error: rejection.body_text(),
            });
        }
    };
    match run_predict(&state, &request).await {
        Ok(predictions) => {
            info!(rows = predictions.len(), "Prediction batch served");
            Json(PredictResponse::Ok { predictions })
        }
        Err(e) => {
            error!("Prediction batch failed: {}", e);
            Json(PredictResponse::Error {
                error: e.to_string(),
            })
        }
    }
}

async fn run_predict(state: &AppState, request: &PredictRequest) -> Result<Vec<f64>> {
    if request.data.is_empty() {
        return Ok(Vec::new());
    }

    let mut frame = Frame::from_rows(&request.data)?;

    let mut store = state.store.write().await;
    pipeline::run(&mut frame, Mode::Replay, &mut store, &state.refs)?;
    drop(store);

    let matrix = frame.to_matrix()?;
    state.model.predict(&matrix)
}

/// Build prediction routes
pub fn predict_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
}
