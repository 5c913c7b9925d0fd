use crate::detection::{DetectionRequest, DetectionResult};
use detection_client::{BackendError, BoundingBox, InferenceBackend};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Boxes at or below this confidence are never returned.
pub const CONFIDENCE_THRESHOLD: f32 = 0.3;

pub const NO_IMAGE_MESSAGE: &str = "No image data provided";

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model prediction failed: {0}")]
    Prediction(#[source] BackendError),
    #[error("inference service health check failed: {0}")]
    Health(#[source] BackendError),
}

impl DetectorError {
    pub fn backend(&self) -> &BackendError {
        match self {
            DetectorError::Prediction(e) | DetectorError::Health(e) => e,
        }
    }
}

pub fn filter_confident(detections: Vec<BoundingBox>) -> Vec<BoundingBox> {
    detections
        .into_iter()
        .filter(|bbox| bbox.confidence > CONFIDENCE_THRESHOLD)
        .collect()
}

/// Turns raw backend detections into caller-facing results.
#[derive(Clone)]
pub struct Detector {
    backend: Arc<dyn InferenceBackend>,
}

impl Detector {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self { backend }
    }

    #[instrument(skip(self, request), fields(filename = %request.filename, image_bytes = request.image_data.len()))]
    pub async fn detect(&self, request: DetectionRequest) -> Result<DetectionResult, DetectorError> {
        if request.image_data.is_empty() {
            return Ok(DetectionResult::rejected(NO_IMAGE_MESSAGE));
        }

        let detections = self
            .backend
            .predict(request.image_data)
            .await
            .map_err(DetectorError::Prediction)?;

        let received = detections.len();
        let filtered = filter_confident(detections);
        tracing::debug!(
            "Kept {} of {} detections above {}",
            filtered.len(),
            received,
            CONFIDENCE_THRESHOLD
        );

        Ok(DetectionResult::found(filtered))
    }

    pub async fn check_health(&self) -> Result<(), DetectorError> {
        self.backend
            .check_health()
            .await
            .map_err(DetectorError::Health)
    }
}
