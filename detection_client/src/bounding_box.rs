use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// One of `qr`, `signature` or `stamp` for the stock model.
    #[serde(rename = "class")]
    pub class_label: String,
    pub confidence: f32,
}

/// Body returned by `POST <inference_url>`. Fields other than `detections` are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct PredictionBatch {
    pub detections: Vec<BoundingBox>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reference_backend_payload() {
        let body = r#"{
            "success": true,
            "detections": [
                {"x": 12, "y": 40, "width": 100, "height": 80, "class": "stamp", "confidence": 0.874}
            ],
            "total_count": 1,
            "statistics": {"stamp": 1},
            "message": "Found 1 objects"
        }"#;

        let batch: PredictionBatch = serde_json::from_str(body).unwrap();

        assert_eq!(batch.detections.len(), 1);
        let bbox = &batch.detections[0];
        assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (12, 40, 100, 80));
        assert_eq!(bbox.class_label, "stamp");
        assert!((bbox.confidence - 0.874).abs() < f32::EPSILON);
    }

    #[test]
    fn test_serialize_uses_class_key() {
        let bbox = BoundingBox {
            x: 1,
            y: 2,
            width: 3,
            height: 4,
            class_label: "qr".into(),
            confidence: 0.5,
        };

        let value = serde_json::to_value(&bbox).unwrap();

        assert_eq!(value["class"], "qr");
        assert!(value.get("class_label").is_none());
    }

    #[test]
    fn test_missing_detections_is_rejected() {
        let body = r#"{"success": false, "error": "No file provided"}"#;
        assert!(serde_json::from_str::<PredictionBatch>(body).is_err());
    }
}
