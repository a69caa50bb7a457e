use crate::backend::InferenceBackend;
use crate::error::ClassifierError;
use crate::labels::LabelTable;
use crate::preprocessing;
use image::RgbImage;
use serde::Serialize;
use std::collections::BTreeMap;

/// Sentinel label used when the model predicts an index outside the table.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Structured top-1 result of a single forward pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    #[serde(rename = "materialType")]
    pub material_type: String,
    pub confidence: f32,
    #[serde(rename = "allPredictions")]
    pub all_predictions: BTreeMap<String, f32>,
    #[serde(skip)]
    pub class_index: usize,
}

/// Pure frame-to-prediction pipeline: normalize, run the backend,
/// interpret the score vector.
pub struct FrameClassifier {
    backend: Box<dyn InferenceBackend>,
    labels: LabelTable,
}

impl FrameClassifier {
    pub fn new(backend: Box<dyn InferenceBackend>, labels: LabelTable) -> Self {
        Self { backend, labels }
    }

    pub fn classify(&mut self, image: &RgbImage) -> Result<Prediction, ClassifierError> {
        let input = preprocessing::to_tensor(image);
        let scores = self.backend.infer(&input)?;
        Ok(self.interpret(&scores))
    }

    /// Decode an image payload and classify it in one call.
    pub fn classify_bytes(&mut self, bytes: &[u8]) -> Result<Prediction, ClassifierError> {
        let image = preprocessing::decode_image(bytes)?;
        self.classify(&image)
    }

    fn interpret(&self, scores: &[f32]) -> Prediction {
        let (class_index, confidence) = argmax(scores);

        let material_type = self
            .labels
            .get(class_index)
            .unwrap_or(UNKNOWN_LABEL)
            .to_string();

        // Labels beyond the vector length, or scores beyond the label
        // count, are simply not represented; lengths are expected to match.
        let all_predictions = self
            .labels
            .iter()
            .zip(scores.iter())
            .map(|(label, score)| (label.to_string(), *score))
            .collect();

        Prediction {
            material_type,
            confidence,
            all_predictions,
            class_index,
        }
    }
}

/// Index and value of the maximum element, ties broken by lowest index.
fn argmax(scores: &[f32]) -> (usize, f32) {
    let mut best_index = 0;
    let mut best_score = f32::NEG_INFINITY;
    for (i, &score) in scores.iter().enumerate() {
        if score > best_score {
            best_index = i;
            best_score = score;
        }
    }

    if scores.is_empty() {
        (0, 0.0)
    } else {
        (best_index, best_score)
    }
}
