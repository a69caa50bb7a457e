use crate::error::ClassifierError;
use ndarray::{Array, IxDyn};

pub mod ort;

pub use ort::OrtBackend;

/// A single forward pass: fixed-shape image tensor in, score vector out.
///
/// Implementations are not reentrant. The `&mut self` receiver plus an
/// external mutex serialize access between the capture loop and request
/// handlers sharing one engine instance.
pub trait InferenceBackend: Send {
    fn infer(&mut self, input: &Array<f32, IxDyn>) -> Result<Vec<f32>, ClassifierError>;
}
