pub mod actions;
pub mod backend;
pub mod classifier;
pub mod error;
pub mod labels;
pub mod preprocessing;

// Re-export commonly used types for convenience
pub use actions::Action;
pub use backend::{InferenceBackend, OrtBackend};
pub use classifier::{FrameClassifier, Prediction};
pub use error::ClassifierError;
pub use labels::LabelTable;
