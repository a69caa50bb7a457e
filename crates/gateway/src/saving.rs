use chrono::Local;
use inference::Prediction;
use std::fs;
use std::path::{Path, PathBuf};

/// Best-effort audit copy of a classified upload; failures are logged
/// and never surfaced to the client.
pub fn save_classified(dir: &Path, jpeg: &[u8], prediction: &Prediction) {
    match try_save(dir, jpeg, prediction) {
        Ok(path) => tracing::info!(path = %path.display(), "saved classified image"),
        Err(e) => tracing::warn!(error = %e, "failed to save classified image"),
    }
}

fn try_save(dir: &Path, jpeg: &[u8], prediction: &Prediction) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S_%f");
    let label = prediction.material_type.replace(' ', "_");
    let confidence_pct = (prediction.confidence * 100.0) as u32;
    let path = dir.join(format!("{timestamp}_{label}_{confidence_pct}pct.jpg"));

    fs::write(&path, jpeg)?;
    Ok(path)
}
