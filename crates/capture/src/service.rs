use crate::encode;
use crate::overlay;
use crate::source::{MjpegSource, StreamError};
use crate::state::PredictionCell;
use inference::{FrameClassifier, preprocessing};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

const RECONNECT_DELAY: Duration = Duration::from_secs(3);
const STALL_TIMEOUT: Duration = Duration::from_secs(10);
const TRANSIENT_READ_DELAY: Duration = Duration::from_millis(100);

pub struct CaptureConfig {
    pub stream_url: String,
    pub frame_skip: u32,
}

/// Long-running capture loop: pulls frames from the camera stream,
/// classifies every Kth frame, and keeps the shared prediction cell
/// current. Owns all reconnect and timeout recovery; no error here
/// terminates the process.
pub struct CaptureService {
    config: CaptureConfig,
    classifier: Option<Arc<Mutex<FrameClassifier>>>,
    latest: PredictionCell,
    stop: Arc<AtomicBool>,
}

impl CaptureService {
    pub fn new(
        config: CaptureConfig,
        classifier: Option<Arc<Mutex<FrameClassifier>>>,
        latest: PredictionCell,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            classifier,
            latest,
            stop,
        }
    }

    /// Run until the stop flag is set. Intended for a dedicated thread.
    pub fn run(self) {
        tracing::info!(
            url = %self.config.stream_url,
            frame_skip = self.config.frame_skip,
            "capture loop starting"
        );

        let mut frame_counter: u64 = 0;
        let mut skipper = FrameSkipper::new(self.config.frame_skip);

        while !self.stopped() {
            let mut source = match MjpegSource::connect(&self.config.stream_url) {
                Ok(source) => {
                    tracing::info!("camera stream connected");
                    source
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        delay_s = RECONNECT_DELAY.as_secs(),
                        "camera stream connect failed, retrying"
                    );
                    self.sleep_interruptible(RECONNECT_DELAY);
                    continue;
                }
            };

            let mut stall = StallDetector::new(STALL_TIMEOUT, Instant::now());

            while !self.stopped() {
                if stall.is_stalled(Instant::now()) {
                    tracing::warn!(
                        timeout_s = STALL_TIMEOUT.as_secs(),
                        "camera stream stalled, reconnecting"
                    );
                    break;
                }

                let jpeg = match source.next_frame() {
                    Ok(frame) => frame,
                    Err(StreamError::Timeout) if source.is_open() => {
                        // transient: connection still open, retry shortly
                        thread::sleep(TRANSIENT_READ_DELAY);
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "camera stream read failed, reconnecting");
                        break;
                    }
                };

                stall.record_frame(Instant::now());
                frame_counter += 1;

                self.handle_frame(&jpeg, frame_counter, skipper.should_classify());
            }
            // source dropped here, releasing the connection before reconnecting
        }

        tracing::info!("capture loop stopped");
    }

    fn handle_frame(&self, jpeg: &[u8], frame_counter: u64, classify: bool) {
        let image = match preprocessing::decode_image(jpeg) {
            Ok(image) => image,
            Err(e) => {
                tracing::debug!(error = %e, "discarding undecodable frame");
                return;
            }
        };

        if classify && let Some(classifier) = &self.classifier {
            let result = lock_classifier(classifier).classify(&image);
            match result {
                Ok(prediction) => {
                    let mut annotated = image;
                    overlay::annotate(
                        &mut annotated,
                        &prediction.material_type,
                        prediction.confidence,
                    );
                    match encode::to_jpeg(&annotated) {
                        Ok(bytes) => self.latest.publish(&prediction, frame_counter, bytes),
                        Err(e) => tracing::error!(error = %e, "failed to encode annotated frame"),
                    }
                    tracing::debug!(
                        frame = frame_counter,
                        material = %prediction.material_type,
                        confidence = prediction.confidence,
                        "frame classified"
                    );
                    return;
                }
                Err(e) => tracing::error!(error = %e, "frame classification failed"),
            }
        }

        // pass-through frame: redraw the prior prediction for viewers
        let snapshot = self.latest.snapshot();
        let mut annotated = image;
        if snapshot.frame_count > 0 {
            overlay::annotate(&mut annotated, &snapshot.material_type, snapshot.confidence);
        }
        match encode::to_jpeg(&annotated) {
            Ok(bytes) => self.latest.publish_frame(frame_counter, bytes),
            Err(e) => tracing::error!(error = %e, "failed to encode frame"),
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn sleep_interruptible(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while !self.stopped() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(100));
        }
    }
}

fn lock_classifier(classifier: &Mutex<FrameClassifier>) -> MutexGuard<'_, FrameClassifier> {
    classifier.lock().unwrap_or_else(|e| e.into_inner())
}

/// Decides which frames get a full classification pass.
pub struct FrameSkipper {
    every: u32,
    counter: u32,
}

impl FrameSkipper {
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            counter: 0,
        }
    }

    pub fn should_classify(&mut self) -> bool {
        self.counter = self.counter.wrapping_add(1);
        self.counter % self.every == 0
    }
}

/// Detects a silently stalled source: one that stays open but stops
/// delivering frames.
pub struct StallDetector {
    timeout: Duration,
    last_frame: Instant,
}

impl StallDetector {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_frame: now,
        }
    }

    pub fn record_frame(&mut self, now: Instant) {
        self.last_frame = now;
    }

    pub fn is_stalled(&self, now: Instant) -> bool {
        now.duration_since(self.last_frame) > self.timeout
    }
}
