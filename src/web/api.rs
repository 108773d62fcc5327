use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error};

use super::AppState;
use crate::types::Record;

/// `POST /predict`: score one record.
///
/// A body that is not a JSON object is scored as an empty record. Encoding
/// failures come back as a plain-text 500.
pub async fn predict(State(state): State<AppState>, body: Bytes) -> Response {
    let record = Record::from_body(&body);

    match state.artifacts.predict(&record) {
        Ok(prediction) => {
            debug!(
                "Prediction: p={:.4} label={} reasons={:?}",
                prediction.fraud_probability, prediction.label, prediction.reasons
            );
            Json(prediction).into_response()
        }
        Err(e) => {
            error!("Prediction failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
