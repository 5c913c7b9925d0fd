use crate::{
    detection::{DetectionRequest, DetectionResult},
    detector::DetectorError,
    server::SharedState,
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

const ROUTE: &str = "/predict";
const FILE_FIELD: &str = "file";

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Failed to parse form")]
    ParseForm,
    #[error("No file uploaded")]
    NoFile,
    #[error("Failed to read file")]
    ReadFile,
    #[error("Detection failed: {0}")]
    Detection(#[from] DetectorError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = match self {
            PredictError::ParseForm | PredictError::NoFile => StatusCode::BAD_REQUEST,
            PredictError::ReadFile | PredictError::Detection(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Pulls the `file` part out of the form. Other parts are skipped.
async fn read_upload(mut multipart: Multipart) -> Result<DetectionRequest, PredictError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(PredictError::NoFile),
            Err(e) => {
                tracing::warn!("Invalid multipart body: {}", e);
                return Err(PredictError::ParseForm);
            }
        };

        // Only file parts count, a plain `file` value is skipped.
        let filename = match (field.name(), field.file_name()) {
            (Some(FILE_FIELD), Some(filename)) => filename.to_string(),
            _ => continue,
        };
        let image_data = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read uploaded file: {}", e);
            PredictError::ReadFile
        })?;

        return Ok(DetectionRequest {
            image_data,
            filename,
        });
    }
}

#[instrument(skip(state, multipart))]
pub async fn predict(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResult>, PredictError> {
    state.metrics.record_request(ROUTE);

    let multipart = multipart.map_err(|e| {
        tracing::warn!("Rejected upload: {}", e);
        PredictError::ParseForm
    })?;
    let request = read_upload(multipart).await?;

    let started = Instant::now();
    let result = state.detector.detect(request).await;
    state
        .metrics
        .record_prediction_duration(started.elapsed().as_millis() as u64, ROUTE);

    match result {
        Ok(result) => {
            state.metrics.record_detections(&result.detections);
            tracing::info!(
                success = result.success,
                detections = result.detections.len(),
                "Prediction served"
            );
            Ok(Json(result))
        }
        Err(e) => {
            state.metrics.record_backend_failure(ROUTE);
            tracing::error!(
                backend_status = ?e.backend().status(),
                "Detection failed: {}",
                e
            );
            Err(e.into())
        }
    }
}
