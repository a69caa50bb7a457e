use super::InferenceBackend;
use crate::error::ClassifierError;
use ndarray::{Array, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

pub struct OrtBackend {
    session: Session,
    input_name: String,
    output_name: String,
}

impl OrtBackend {
    /// Load the model artifact and capture its input/output names.
    ///
    /// A load failure is not fatal to the process: callers keep serving
    /// health queries and fail classification requests fast instead.
    pub fn load_model(path: &str) -> Result<Self, ClassifierError> {
        let session = build_session(path)
            .map_err(|e| ClassifierError::ModelLoad(format!("{path}: {e}")))?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| ClassifierError::ModelLoad(format!("{path}: model has no inputs")))?;
        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| ClassifierError::ModelLoad(format!("{path}: model has no outputs")))?;

        tracing::info!(path, input = %input_name, output = %output_name, "model loaded");

        Ok(Self {
            session,
            input_name,
            output_name,
        })
    }
}

fn build_session(path: &str) -> Result<Session, ort::Error> {
    // Initialize ORT environment (idempotent)
    let _ = ort::init().commit();

    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(2)?
        .commit_from_file(path)
}

impl InferenceBackend for OrtBackend {
    fn infer(&mut self, input: &Array<f32, IxDyn>) -> Result<Vec<f32>, ClassifierError> {
        let tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let scores = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        // Output shape is [1, N]; flatten the batch dimension away.
        Ok(scores.iter().copied().collect())
    }
}
