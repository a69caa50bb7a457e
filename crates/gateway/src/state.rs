use capture::PredictionCell;
use inference::{FrameClassifier, LabelTable};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Application context built once at startup and injected into every
/// handler and the capture thread. Replaces the original system's
/// module-level globals.
#[derive(Clone)]
pub struct AppState {
    pub labels: Arc<LabelTable>,
    /// Absent when the model failed to load; the service still answers
    /// health queries and fails classification requests fast.
    pub classifier: Option<Arc<Mutex<FrameClassifier>>>,
    pub latest: PredictionCell,
    pub stream_url: String,
    pub save_images: bool,
    pub images_dir: PathBuf,
    /// Set at shutdown; doubles as the capture loop's stop signal.
    pub stop: Arc<AtomicBool>,
}

impl AppState {
    pub fn model_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn monitoring_active(&self) -> bool {
        !self.stop.load(Ordering::Relaxed)
    }
}

pub fn lock_classifier(classifier: &Mutex<FrameClassifier>) -> MutexGuard<'_, FrameClassifier> {
    classifier.lock().unwrap_or_else(|e| e.into_inner())
}
