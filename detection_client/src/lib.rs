mod backend;
mod bounding_box;
mod client;
mod error;

pub use backend::InferenceBackend;
pub use bounding_box::BoundingBox;
pub use client::{BackendClient, BackendSettings};
pub use error::BackendError;
