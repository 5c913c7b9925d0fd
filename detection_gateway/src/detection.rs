use bytes::Bytes;
use detection_client::BoundingBox;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub image_data: Bytes,
    /// Name the caller uploaded the image under. Only used for logging.
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub detections: Vec<BoundingBox>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DetectionResult {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            detections: Vec::new(),
            success: false,
            message: Some(message.into()),
        }
    }

    pub fn found(detections: Vec<BoundingBox>) -> Self {
        let message = format!("Found {} objects", detections.len());
        Self {
            detections,
            success: true,
            message: Some(message),
        }
    }
}
