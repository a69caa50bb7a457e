pub mod encode;
pub mod overlay;
pub mod service;
pub mod source;
pub mod state;

pub use service::{CaptureConfig, CaptureService};
pub use source::{MjpegSource, StreamError};
pub use state::{LatestPrediction, PredictionCell};
