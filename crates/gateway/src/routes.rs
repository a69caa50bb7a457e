use crate::saving;
use crate::state::{AppState, lock_classifier};
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use inference::{Action, ClassifierError, Prediction, preprocessing};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tower_http::cors::CorsLayer;

const STREAM_FRAME_INTERVAL: Duration = Duration::from_millis(33); // ~30 fps

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/identify/test", get(identify_test))
        .route("/identify/material", post(identify_material))
        .route("/video_feed", get(video_feed))
        .route("/prediction", get(prediction))
        .route("/bin/update", post(bin_update))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "model_loaded": state.model_loaded(),
        "labels": state.labels.as_slice(),
        "stream_url": state.stream_url,
        "monitoring_active": state.monitoring_active(),
    }))
}

async fn identify_test(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "Backend server is running",
        "model_loaded": state.model_loaded(),
        "labels_available": state.labels.as_slice(),
        "stream_url": state.stream_url,
    }))
}

/// The two accepted upload encodings. Anything without a recognized
/// content type is treated as raw image bytes, as the original clients
/// (ESP32 boards) often omit the header.
enum ImagePayload {
    RawJpeg(Bytes),
    Base64Json(Bytes),
}

#[derive(Deserialize)]
struct Base64Body {
    image: String,
}

fn payload_kind(headers: &HeaderMap, body: Bytes) -> ImagePayload {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if content_type.contains("application/json") {
        ImagePayload::Base64Json(body)
    } else {
        ImagePayload::RawJpeg(body)
    }
}

async fn identify_material(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(classifier) = state.classifier.clone() else {
        let err = ClassifierError::ModelNotLoaded;
        return error_response(status_for(&err), &err.to_string());
    };

    let image_bytes = match payload_kind(&headers, body) {
        ImagePayload::RawJpeg(bytes) => bytes.to_vec(),
        ImagePayload::Base64Json(bytes) => {
            let parsed: Base64Body = match serde_json::from_slice(&bytes) {
                Ok(parsed) => parsed,
                Err(_) => {
                    return error_response(StatusCode::BAD_REQUEST, "No image data in JSON");
                }
            };
            match BASE64.decode(parsed.image.as_bytes()) {
                Ok(decoded) => decoded,
                Err(_) => {
                    return error_response(StatusCode::BAD_REQUEST, "Invalid base64 image data");
                }
            }
        }
    };

    if image_bytes.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No image data received");
    }

    // Classification runs on the blocking pool; the engine mutex
    // serializes it against the capture loop.
    let task = tokio::task::spawn_blocking(move || -> Result<(Prediction, Vec<u8>), ClassifierError> {
        let image = preprocessing::decode_image(&image_bytes)?;
        let prediction = lock_classifier(&classifier).classify(&image)?;
        Ok((prediction, image_bytes))
    });

    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "classification task failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "classification task failed",
            );
        }
    };

    match outcome {
        Ok((prediction, raw)) => {
            let action = Action::for_label(&prediction.material_type);
            tracing::info!(
                material = %prediction.material_type,
                confidence = prediction.confidence,
                action = action.as_str(),
                "image classified"
            );

            if state.save_images {
                saving::save_classified(&state.images_dir, &raw, &prediction);
            }

            Json(json!({
                "success": true,
                "materialType": prediction.material_type,
                "confidence": round2(prediction.confidence),
                "action": action,
                "allPredictions": prediction.all_predictions,
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "classification failed");
            error_response(status_for(&e), &e.to_string())
        }
    }
}

async fn video_feed(State(state): State<AppState>) -> Response {
    let latest = state.latest.clone();
    let placeholder = capture::encode::placeholder_jpeg(640, 480).unwrap_or_default();

    let stream = async_stream::stream! {
        let mut interval = tokio::time::interval(STREAM_FRAME_INTERVAL);
        loop {
            interval.tick().await;

            let jpeg = latest.frame_jpeg().unwrap_or_else(|| placeholder.clone());

            let mut part = Vec::with_capacity(jpeg.len() + 64);
            part.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
            part.extend_from_slice(&jpeg);
            part.extend_from_slice(b"\r\n");
            yield Ok::<Bytes, Infallible>(Bytes::from(part));
        }
    };

    (
        [
            (
                header::CONTENT_TYPE,
                "multipart/x-mixed-replace; boundary=frame",
            ),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

/// Latest capture-loop result, frame payload excluded.
async fn prediction(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.latest.snapshot();
    Json(json!({
        "materialType": snapshot.material_type,
        "confidence": snapshot.confidence,
        "allPredictions": snapshot.all_predictions,
        "frame_count": snapshot.frame_count,
    }))
}

async fn bin_update(body: Bytes) -> Response {
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(data) if !data.is_null() => {
            tracing::info!(update = %data, "bin update received");
            Json(json!({
                "success": true,
                "message": "Bin update received",
            }))
            .into_response()
        }
        _ => error_response(StatusCode::BAD_REQUEST, "No data received"),
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": message,
        })),
    )
        .into_response()
}

fn status_for(error: &ClassifierError) -> StatusCode {
    match error {
        ClassifierError::ImageDecode { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Confidence is reported to clients rounded to two decimals.
fn round2(value: f32) -> f64 {
    (value as f64 * 100.0).round() / 100.0
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Waste Sorter Live Monitoring</title>
    <style>
        body { font-family: Arial, sans-serif; text-align: center; background: #1a1a1a; color: #fff; }
        img { max-width: 100%; border: 2px solid #00ff00; border-radius: 10px; }
        .info { margin-top: 20px; padding: 10px; background: #2a2a2a; border-radius: 5px; }
    </style>
</head>
<body>
    <h1>Waste Sorter Live Monitoring</h1>
    <img src="/video_feed" alt="Video Feed">
    <div class="info">
        <p>Latest Prediction: <span id="prediction">Loading...</span></p>
        <p>Confidence: <span id="confidence">-</span></p>
    </div>
    <script>
        setInterval(async () => {
            try {
                const response = await fetch('/prediction');
                const data = await response.json();
                document.getElementById('prediction').textContent = data.materialType || 'None';
                document.getElementById('confidence').textContent =
                    data.confidence ? (data.confidence * 100).toFixed(2) + '%' : '-';
            } catch (e) {
                console.error('Error fetching prediction:', e);
            }
        }, 1000);
    </script>
</body>
</html>
"#;
