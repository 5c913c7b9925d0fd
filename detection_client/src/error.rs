use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to build inference request: {0}")]
    Request(#[source] reqwest::Error),
    #[error("failed to send inference request: {0}")]
    Send(#[source] reqwest::Error),
    #[error("inference failed with status: {0}")]
    Status(u16),
    #[error("failed to read inference response: {0}")]
    Body(#[source] reqwest::Error),
    #[error("failed to decode inference response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("inference service unhealthy: {0}")]
    Unhealthy(u16),
}

impl BackendError {
    /// HTTP status returned by the backend, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status(code) | BackendError::Unhealthy(code) => Some(*code),
            _ => None,
        }
    }
}
