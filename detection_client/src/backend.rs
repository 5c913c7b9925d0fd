use crate::{bounding_box::BoundingBox, error::BackendError};
use async_trait::async_trait;
use bytes::Bytes;

/// Wire-level access to an inference backend.
///
/// Implementations hold only immutable configuration so a single instance can be
/// shared across concurrent requests.
#[async_trait]
pub trait InferenceBackend: Send + Sync + 'static {
    /// Sends one image and returns the boxes exactly as the backend emitted them.
    async fn predict(&self, image_data: Bytes) -> Result<Vec<BoundingBox>, BackendError>;

    async fn check_health(&self) -> Result<(), BackendError>;
}
