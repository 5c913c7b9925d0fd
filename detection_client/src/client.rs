use crate::{
    backend::InferenceBackend,
    bounding_box::{BoundingBox, PredictionBatch},
    error::BackendError,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode,
};
use std::time::Duration;
use tracing::instrument;

/// Field name the backend reads the upload from.
const FILE_FIELD: &str = "file";
/// The caller's file name is never forwarded.
const UPLOAD_FILENAME: &str = "image.jpg";
const UPLOAD_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub inference_url: String,
    pub model_path: String,
    /// `None` keeps the HTTP client's default behavior.
    pub timeout: Option<Duration>,
}

/// HTTP adapter for the external inference service.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    inference_url: String,
    health_url: String,
    model_path: String,
}

impl BackendClient {
    pub fn new(settings: &BackendSettings) -> Result<Self, BackendError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(BackendError::Request)?;

        let health_url = format!("{}/health", settings.inference_url.trim_end_matches('/'));

        Ok(Self {
            client,
            inference_url: settings.inference_url.clone(),
            health_url,
            model_path: settings.model_path.clone(),
        })
    }

    pub fn inference_url(&self) -> &str {
        &self.inference_url
    }

    pub fn health_url(&self) -> &str {
        &self.health_url
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    fn build_form(image_data: Bytes) -> Result<Form, BackendError> {
        let part = Part::bytes(image_data.to_vec())
            .file_name(UPLOAD_FILENAME)
            .mime_str(UPLOAD_CONTENT_TYPE)
            .map_err(BackendError::Request)?;

        Ok(Form::new().part(FILE_FIELD, part))
    }
}

#[async_trait]
impl InferenceBackend for BackendClient {
    #[instrument(skip(self, image_data), fields(image_bytes = image_data.len(), url = %self.inference_url))]
    async fn predict(&self, image_data: Bytes) -> Result<Vec<BoundingBox>, BackendError> {
        let form = Self::build_form(image_data)?;

        let request = self
            .client
            .post(&self.inference_url)
            .multipart(form)
            .build()
            .map_err(BackendError::Request)?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(BackendError::Send)?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!("Inference backend answered {}", status);
            return Err(BackendError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(BackendError::Body)?;
        let batch: PredictionBatch = serde_json::from_slice(&body)?;

        tracing::debug!("Backend returned {} detections", batch.detections.len());

        Ok(batch.detections)
    }

    #[instrument(skip(self), fields(url = %self.health_url))]
    async fn check_health(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(BackendError::Send)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(BackendError::Unhealthy(status.as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Multipart,
        http::StatusCode as AxumStatus,
        response::IntoResponse,
        routing::{get, post},
        Router,
    };
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn spawn_backend(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn client_for(addr: SocketAddr) -> BackendClient {
        BackendClient::new(&BackendSettings {
            inference_url: format!("http://{}/predict", addr),
            model_path: "./models/best.pt".into(),
            timeout: Some(Duration::from_secs(5)),
        })
        .unwrap()
    }

    /// Plays the backend: checks the upload shape and echoes it back as one detection.
    async fn echo_upload(mut multipart: Multipart) -> impl IntoResponse {
        let mut fields = Vec::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let data = field.bytes().await.unwrap();
            fields.push((name, file_name, content_type, data));
        }

        let ok = fields.len() == 1
            && fields[0].0 == "file"
            && fields[0].1 == "image.jpg"
            && fields[0].2 == "image/jpeg";
        if !ok {
            return (AxumStatus::BAD_REQUEST, "unexpected upload").into_response();
        }

        axum::Json(serde_json::json!({
            "success": true,
            "detections": [
                {"x": 1, "y": 2, "width": fields[0].3.len(), "height": 4, "class": "qr", "confidence": 0.91},
                {"x": 5, "y": 6, "width": 7, "height": 8, "class": "stamp", "confidence": 0.12}
            ],
            "total_count": 2
        }))
        .into_response()
    }

    #[tokio::test]
    async fn test_predict_sends_single_file_part() {
        let addr = spawn_backend(Router::new().route("/predict", post(echo_upload))).await;
        let client = client_for(addr);

        let detections = client
            .predict(Bytes::from_static(b"\xff\xd8\xff\xe0fake-jpeg"))
            .await
            .unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].class_label, "qr");
        assert_eq!(detections[0].width, 13);
        // No filtering at this layer.
        assert_eq!(detections[1].class_label, "stamp");
        assert!((detections[1].confidence - 0.12).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_predict_non_200_carries_status() {
        let router = Router::new().route(
            "/predict",
            post(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "model loading") }),
        );
        let addr = spawn_backend(router).await;

        let err = client_for(addr)
            .predict(Bytes::from_static(b"img"))
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::Status(503)));
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_predict_malformed_json_is_decode_error() {
        let router = Router::new().route("/predict", post(|| async { "not json at all" }));
        let addr = spawn_backend(router).await;

        let err = client_for(addr)
            .predict(Bytes::from_static(b"img"))
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[tokio::test]
    async fn test_predict_wrong_shape_is_decode_error() {
        let router = Router::new().route(
            "/predict",
            post(|| async { axum::Json(serde_json::json!({"detections": [{"x": "left"}]})) }),
        );
        let addr = spawn_backend(router).await;

        let err = client_for(addr)
            .predict(Bytes::from_static(b"img"))
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[tokio::test]
    async fn test_predict_unreachable_backend_is_send_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(addr)
            .predict(Bytes::from_static(b"img"))
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::Send(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_health_url_appends_suffix() {
        let router = Router::new().route("/predict/health", get(|| async { "ok" }));
        let addr = spawn_backend(router).await;
        let client = client_for(addr);

        assert_eq!(client.health_url(), format!("http://{}/predict/health", addr));
        assert!(client.check_health().await.is_ok());
    }

    #[tokio::test]
    async fn test_health_non_200_is_unhealthy() {
        let addr = spawn_backend(Router::new()).await;

        let err = client_for(addr).check_health().await.unwrap_err();

        assert!(matches!(err, BackendError::Unhealthy(404)));
    }

    #[test]
    fn test_trailing_slash_is_trimmed_for_health() {
        let client = BackendClient::new(&BackendSettings {
            inference_url: "http://localhost:5000/".into(),
            model_path: String::new(),
            timeout: None,
        })
        .unwrap();

        assert_eq!(client.health_url(), "http://localhost:5000/health");
        assert_eq!(client.inference_url(), "http://localhost:5000/");
    }
}
