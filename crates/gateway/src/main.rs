use anyhow::Context;
use capture::{CaptureConfig, CaptureService, PredictionCell};
use common::Environment;
use gateway::{config::get_configuration, routes, state::AppState};
use inference::{FrameClassifier, LabelTable, OrtBackend};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration().context("failed to load configuration")?;
    common::setup_logging(Environment::from_env());

    tracing::info!(config = ?config, "loaded configuration");

    // A bad label file is the one startup error that aborts the process.
    let labels = Arc::new(
        LabelTable::load(&config.labels_path)
            .with_context(|| format!("failed to load label table from {}", config.labels_path))?,
    );
    tracing::info!(count = labels.len(), labels = ?labels.as_slice(), "labels loaded");

    // A missing model is not: keep serving health checks in degraded mode.
    let classifier = match OrtBackend::load_model(&config.model_path) {
        Ok(backend) => Some(Arc::new(Mutex::new(FrameClassifier::new(
            Box::new(backend),
            (*labels).clone(),
        )))),
        Err(e) => {
            tracing::error!(error = %e, "model failed to load, serving without classification");
            None
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    let latest = PredictionCell::new();

    let capture_service = CaptureService::new(
        CaptureConfig {
            stream_url: config.stream_url.clone(),
            frame_skip: config.frame_skip,
        },
        classifier.clone(),
        latest.clone(),
        Arc::clone(&stop),
    );
    let capture_thread = std::thread::Builder::new()
        .name("capture-loop".to_string())
        .spawn(move || capture_service.run())
        .context("failed to spawn capture thread")?;

    let state = AppState {
        labels,
        classifier,
        latest,
        stream_url: config.stream_url.clone(),
        save_images: config.save_images,
        images_dir: PathBuf::from(&config.images_dir),
        stop: Arc::clone(&stop),
    };

    let app = routes::router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(addr = %addr, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    stop.store(true, Ordering::Relaxed);
    if capture_thread.join().is_err() {
        tracing::error!("capture thread panicked");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
