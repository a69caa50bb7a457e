use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use capture::PredictionCell;
use gateway::{routes, state::AppState};
use http_body_util::BodyExt;
use inference::{ClassifierError, FrameClassifier, InferenceBackend, LabelTable, Prediction};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

struct StubBackend {
    scores: Vec<f32>,
}

impl InferenceBackend for StubBackend {
    fn infer(
        &mut self,
        _input: &ndarray::Array<f32, ndarray::IxDyn>,
    ) -> Result<Vec<f32>, ClassifierError> {
        Ok(self.scores.clone())
    }
}

fn test_state(scores: Option<Vec<f32>>) -> AppState {
    let labels = Arc::new(LabelTable::parse("0 Plastic Bottle\n1 Tin Can\n2 Other\n").unwrap());
    let classifier = scores.map(|scores| {
        Arc::new(Mutex::new(FrameClassifier::new(
            Box::new(StubBackend { scores }),
            (*labels).clone(),
        )))
    });

    AppState {
        labels,
        classifier,
        latest: PredictionCell::new(),
        stream_url: "http://camera.local:81/stream".to_string(),
        save_images: false,
        images_dir: PathBuf::from("saved_images"),
        stop: Arc::new(AtomicBool::new(false)),
    }
}

fn tiny_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([120, 30, 200]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Jpeg).unwrap();
    bytes.into_inner()
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = routes::router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ========== Health & diagnostics ==========

#[tokio::test]
async fn health_reports_degraded_mode_without_model() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(test_state(None), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model_loaded"], false);
    assert_eq!(json["labels"][1], "Tin Can");
    assert_eq!(json["monitoring_active"], true);
}

#[tokio::test]
async fn health_reports_model_loaded() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(test_state(Some(vec![0.3, 0.3, 0.4])), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["model_loaded"], true);
}

#[tokio::test]
async fn identify_test_echoes_labels() {
    let request = Request::builder()
        .uri("/identify/test")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(test_state(None), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["labels_available"][0], "Plastic Bottle");
}

// ========== POST /identify/material ==========

#[tokio::test]
async fn identify_without_model_is_a_server_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/identify/material")
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::from(tiny_jpeg()))
        .unwrap();
    let (status, json) = send(test_state(None), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Model not loaded");
}

#[tokio::test]
async fn empty_json_post_is_a_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/identify/material")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(test_state(Some(vec![0.1, 0.7, 0.2])), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn empty_raw_post_is_a_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/identify/material")
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(test_state(Some(vec![0.1, 0.7, 0.2])), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "No image data received");
}

#[tokio::test]
async fn raw_jpeg_upload_classifies() {
    let request = Request::builder()
        .method("POST")
        .uri("/identify/material")
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::from(tiny_jpeg()))
        .unwrap();
    let (status, json) = send(test_state(Some(vec![0.1, 0.7, 0.2])), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["materialType"], "Tin Can");
    assert_eq!(json["confidence"], 0.7);
    assert_eq!(json["action"], "sort_tin_can");
    assert_eq!(json["allPredictions"].as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn base64_json_upload_classifies() {
    let payload = serde_json::json!({ "image": BASE64.encode(tiny_jpeg()) });
    let request = Request::builder()
        .method("POST")
        .uri("/identify/material")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, json) = send(test_state(Some(vec![0.8, 0.1, 0.1])), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["materialType"], "Plastic Bottle");
    assert_eq!(json["action"], "sort_plastic");
}

#[tokio::test]
async fn json_without_image_field_is_a_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/identify/material")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"picture": "abc"}"#))
        .unwrap();
    let (status, json) = send(test_state(Some(vec![0.1, 0.7, 0.2])), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No image data in JSON");
}

#[tokio::test]
async fn undecodable_payload_is_a_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/identify/material")
        .header(header::CONTENT_TYPE, "image/jpeg")
        .body(Body::from(vec![0xde, 0xad, 0xbe, 0xef]))
        .unwrap();
    let (status, json) = send(test_state(Some(vec![0.1, 0.7, 0.2])), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[test]
fn base64_round_trips_byte_identical() {
    let original = tiny_jpeg();
    let encoded = BASE64.encode(&original);
    let decoded = BASE64.decode(encoded.as_bytes()).unwrap();
    assert_eq!(decoded, original);
}

// ========== Streaming-variant endpoints ==========

#[tokio::test]
async fn prediction_excludes_the_frame_payload() {
    let state = test_state(None);
    state.latest.publish(
        &Prediction {
            material_type: "Tin Can".to_string(),
            confidence: 0.7,
            all_predictions: BTreeMap::from([("Tin Can".to_string(), 0.7)]),
            class_index: 1,
        },
        42,
        vec![0xFF, 0xD8, 0xFF, 0xD9],
    );

    let request = Request::builder()
        .uri("/prediction")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(state, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["materialType"], "Tin Can");
    assert_eq!(json["frame_count"], 42);
    assert!(json.get("frame").is_none());
    assert!(json.get("frame_jpeg").is_none());
}

#[tokio::test]
async fn prediction_starts_at_the_sentinel() {
    let request = Request::builder()
        .uri("/prediction")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(test_state(None), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["materialType"], "None");
    assert_eq!(json["frame_count"], 0);
}

#[tokio::test]
async fn video_feed_advertises_the_multipart_boundary() {
    let request = Request::builder()
        .uri("/video_feed")
        .body(Body::empty())
        .unwrap();
    let response = routes::router(test_state(None)).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "multipart/x-mixed-replace; boundary=frame"
    );
}

#[tokio::test]
async fn bin_update_acknowledges_json() {
    let request = Request::builder()
        .method("POST")
        .uri("/bin/update")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"level": 80}"#))
        .unwrap();
    let (status, json) = send(test_state(None), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn bin_update_rejects_an_empty_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/bin/update")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(test_state(None), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}
