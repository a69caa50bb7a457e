use inference::Prediction;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Latest capture-loop result shared with HTTP readers.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestPrediction {
    pub material_type: String,
    pub confidence: f32,
    pub all_predictions: BTreeMap<String, f32>,
    pub frame_count: u64,
    /// Annotated JPEG of the frame the prediction was made on (or the
    /// most recent pass-through frame). Excluded from JSON snapshots.
    pub frame_jpeg: Option<Vec<u8>>,
}

impl Default for LatestPrediction {
    fn default() -> Self {
        Self {
            material_type: "None".to_string(),
            confidence: 0.0,
            all_predictions: BTreeMap::new(),
            frame_count: 0,
            frame_jpeg: None,
        }
    }
}

/// Single-writer, many-reader cell for the most recent prediction.
///
/// The capture loop is the only writer; request handlers take the lock
/// just long enough to snapshot-copy. All fields are replaced together
/// so a reader never sees a prediction paired with a mismatched frame.
#[derive(Clone, Default)]
pub struct PredictionCell {
    inner: Arc<Mutex<LatestPrediction>>,
}

impl PredictionCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> LatestPrediction {
        self.lock().clone()
    }

    pub fn frame_jpeg(&self) -> Option<Vec<u8>> {
        self.lock().frame_jpeg.clone()
    }

    /// Publish a freshly classified frame.
    pub fn publish(&self, prediction: &Prediction, frame_count: u64, frame_jpeg: Vec<u8>) {
        let mut state = self.lock();
        *state = LatestPrediction {
            material_type: prediction.material_type.clone(),
            confidence: prediction.confidence,
            all_predictions: prediction.all_predictions.clone(),
            frame_count,
            frame_jpeg: Some(frame_jpeg),
        };
    }

    /// Publish a pass-through frame, retaining the prior prediction.
    pub fn publish_frame(&self, frame_count: u64, frame_jpeg: Vec<u8>) {
        let mut state = self.lock();
        state.frame_count = frame_count;
        state.frame_jpeg = Some(frame_jpeg);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LatestPrediction> {
        // a poisoned lock only means a writer panicked mid-update;
        // the data is still a coherent snapshot
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
