mod routes;
mod telemetry;

pub mod app;
pub mod config;
pub mod detection;
pub mod detector;
pub mod server;

pub use app::start_app;
pub use detection::{DetectionRequest, DetectionResult};
pub use detector::{Detector, DetectorError, CONFIDENCE_THRESHOLD};
pub use routes::PredictError;
pub use telemetry::Metrics;
