//! Stream supervisor - per-camera control loop
//!
//! ## Responsibilities
//!
//! - Capture lifecycle with reconnect-and-backoff against an unreliable
//!   network source
//! - Frame cadence (decimation, fps accounting)
//! - Driving detection, the tracker and the zone alert engine in capture
//!   order
//! - Fire-and-forget reporting of detection events and alerts
//!
//! Status machine: `stopped -> connecting -> running -> (error -> connecting
//! | stopped)`. Transient stream faults never escape this module; exhausting
//! the reconnect budget parks the camera in `error` until an explicit
//! restart. All state is owned by the supervisor task; status queries read
//! atomics and locks without blocking the loop.

use crate::backend_client::{Report, Reporter};
use crate::capture::{CaptureBackend, Frame, FrameSource};
use crate::config::Settings;
use crate::detector::Detector;
use crate::error::{Error, Result};
use crate::models::{
    CameraConfig, CameraInfo, CameraStatus, Detection, DetectionEvent, NonScanAlert, ZonePolygon,
};
use crate::tracker::{iou, IouTracker};
use crate::zone_alert::ZoneAlertEngine;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Minimum IoU for labeling an outbound detection with a track id
const TRACK_LABEL_IOU: f32 = 0.5;

/// Supervisor for one camera stream
pub struct StreamSupervisor {
    inner: Arc<Inner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    camera_id: String,
    location_id: String,
    config: RwLock<CameraConfig>,
    settings: Settings,
    detector: Arc<dyn Detector>,
    capture: Arc<dyn CaptureBackend>,
    reporter: Reporter,

    tracker: Mutex<IouTracker>,
    zone_engine: Mutex<ZoneAlertEngine>,

    status: RwLock<CameraStatus>,
    stop: AtomicBool,
    frame_count: AtomicU64,
    detection_count: AtomicU64,
    reconnect_attempts: AtomicU32,
    fps: RwLock<f32>,
    last_detection: RwLock<Option<String>>,
}

impl StreamSupervisor {
    pub fn new(
        config: CameraConfig,
        settings: Settings,
        detector: Arc<dyn Detector>,
        capture: Arc<dyn CaptureBackend>,
        reporter: Reporter,
    ) -> Self {
        let tracker = IouTracker::from_settings(&settings);
        let zone_engine = ZoneAlertEngine::from_settings(&settings);

        Self {
            inner: Arc::new(Inner {
                camera_id: config.camera_id.clone(),
                location_id: config.location_id.clone(),
                config: RwLock::new(config),
                settings,
                detector,
                capture,
                reporter,
                tracker: Mutex::new(tracker),
                zone_engine: Mutex::new(zone_engine),
                status: RwLock::new(CameraStatus::Stopped),
                stop: AtomicBool::new(false),
                frame_count: AtomicU64::new(0),
                detection_count: AtomicU64::new(0),
                reconnect_attempts: AtomicU32::new(0),
                fps: RwLock::new(0.0),
                last_detection: RwLock::new(None),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start the control loop. No-op with a warning when already running.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                tracing::warn!(camera_id = %self.inner.camera_id, "Stream already running");
                return;
            }
        }

        self.inner.stop.store(false, Ordering::Relaxed);
        let inner = self.inner.clone();
        *task = Some(tokio::spawn(async move {
            run_control_loop(inner).await;
        }));

        tracing::info!(camera_id = %self.inner.camera_id, "Stream supervisor started");
    }

    /// Stop the control loop. Idempotent; after this returns no further
    /// frame processing occurs.
    pub async fn stop(&self) {
        self.inner.stop.store(true, Ordering::Relaxed);

        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }

        *self.inner.status.write().await = CameraStatus::Stopped;
        tracing::info!(camera_id = %self.inner.camera_id, "Stream supervisor stopped");
    }

    /// Stop, clear tracker and zone-alert state, start again
    pub async fn restart(&self) {
        self.stop().await;
        self.inner.tracker.lock().await.reset();
        self.inner.zone_engine.lock().await.reset();
        self.start().await;
    }

    /// Replace the scan/exit polygons without restarting the stream
    pub async fn update_zones(&self, scan_zone: Option<ZonePolygon>, exit_zone: Option<ZonePolygon>) {
        let mut config = self.inner.config.write().await;
        config.scan_zone = scan_zone;
        config.exit_zone = exit_zone;
        tracing::info!(camera_id = %self.inner.camera_id, "Zones updated");
    }

    /// Read-only status snapshot
    pub async fn get_info(&self) -> CameraInfo {
        CameraInfo {
            camera_id: self.inner.camera_id.clone(),
            location_id: self.inner.location_id.clone(),
            status: *self.inner.status.read().await,
            fps: *self.inner.fps.read().await,
            frame_count: self.inner.frame_count.load(Ordering::Relaxed),
            detection_count: self.inner.detection_count.load(Ordering::Relaxed),
            reconnect_attempts: self.inner.reconnect_attempts.load(Ordering::Relaxed),
            last_detection: self.inner.last_detection.read().await.clone(),
        }
    }

    /// Current connection status
    pub async fn status(&self) -> CameraStatus {
        *self.inner.status.read().await
    }
}

/// Outer connect/reconnect loop
async fn run_control_loop(inner: Arc<Inner>) {
    let mut attempt: u32 = 0;
    let max_attempts = inner.settings.max_reconnect_attempts;
    let reconnect_delay = Duration::from_secs(inner.settings.reconnect_delay_secs);

    while !inner.stop.load(Ordering::Relaxed) && attempt < max_attempts {
        *inner.status.write().await = CameraStatus::Connecting;
        let url = inner.config.read().await.rtsp_url.clone();
        tracing::info!(
            camera_id = %inner.camera_id,
            url = %url,
            attempt = attempt + 1,
            "Connecting to stream"
        );

        let capture = inner.capture.clone();
        let opened =
            tokio::task::spawn_blocking(move || capture.open(&url))
                .await
                .unwrap_or_else(|e| Err(Error::Internal(format!("capture open task failed: {e}"))));

        let source = match opened {
            Ok(source) => source,
            Err(e) => {
                *inner.status.write().await = CameraStatus::Error;
                attempt += 1;
                inner.reconnect_attempts.store(attempt, Ordering::Relaxed);
                tracing::error!(
                    camera_id = %inner.camera_id,
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_secs = inner.settings.reconnect_delay_secs,
                    "Stream connect failed, reconnecting"
                );
                if inner.stop.load(Ordering::Relaxed) {
                    break;
                }
                tokio::time::sleep(reconnect_delay).await;
                continue;
            }
        };

        *inner.status.write().await = CameraStatus::Running;
        attempt = 0;
        inner.reconnect_attempts.store(0, Ordering::Relaxed);
        tracing::info!(camera_id = %inner.camera_id, "Connected");

        match process_stream(&inner, source).await {
            Ok(()) => break, // stop requested
            Err(e) => {
                *inner.status.write().await = CameraStatus::Error;
                attempt += 1;
                inner.reconnect_attempts.store(attempt, Ordering::Relaxed);
                tracing::error!(
                    camera_id = %inner.camera_id,
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_secs = inner.settings.reconnect_delay_secs,
                    "Stream lost, reconnecting"
                );
                if inner.stop.load(Ordering::Relaxed) {
                    break;
                }
                tokio::time::sleep(reconnect_delay).await;
            }
        }
    }

    if attempt >= max_attempts {
        tracing::error!(
            camera_id = %inner.camera_id,
            max_attempts,
            "Max reconnect attempts reached, giving up"
        );
        *inner.status.write().await = CameraStatus::Error;
    }
}

/// Inner frame loop for one open connection. `Ok(())` means stop was
/// requested; a stream error bubbles to the reconnect path.
async fn process_stream(inner: &Arc<Inner>, mut source: Box<dyn FrameSource>) -> Result<()> {
    let frame_skip = inner.settings.frame_skip.max(1);
    let mut raw_index: u64 = 0;
    let mut fps_window = Instant::now();
    let mut fps_frames: u32 = 0;

    loop {
        if inner.stop.load(Ordering::Relaxed) {
            return Ok(());
        }

        // Blocking read on the blocking pool; the source handle round-trips
        // through the closure
        let (returned, frame) = tokio::task::spawn_blocking(move || {
            let frame = source.read();
            (source, frame)
        })
        .await
        .map_err(|e| Error::Internal(format!("capture read task failed: {e}")))?;
        source = returned;

        let Some(frame) = frame else {
            return Err(Error::Stream("lost connection to video stream".to_string()));
        };

        raw_index += 1;
        if raw_index % frame_skip != 0 {
            continue;
        }

        let frame_number = inner.frame_count.fetch_add(1, Ordering::Relaxed) + 1;
        fps_frames += 1;

        let elapsed = fps_window.elapsed();
        if elapsed >= Duration::from_secs(1) {
            let fps = fps_frames as f32 / elapsed.as_secs_f32();
            *inner.fps.write().await = (fps * 10.0).round() / 10.0;
            fps_frames = 0;
            fps_window = Instant::now();
        }

        // Inference on the blocking pool
        let detector = inner.detector.clone();
        let (frame, detections) = tokio::task::spawn_blocking(move || {
            let detections = detector.detect(&frame);
            (frame, detections)
        })
        .await
        .map_err(|e| Error::Internal(format!("detection task failed: {e}")))?;

        if detections.is_empty() {
            // Still update the tracker so stale tracks age out
            inner.tracker.lock().await.update(&[]);
            continue;
        }

        inner
            .detection_count
            .fetch_add(detections.len() as u64, Ordering::Relaxed);
        let now_iso = Utc::now().to_rfc3339();
        *inner.last_detection.write().await = Some(now_iso.clone());

        let tracks = inner.tracker.lock().await.update(&detections);

        // Best-effort track labels for the outbound event
        let labeled: Vec<Detection> = detections
            .iter()
            .map(|det| {
                let track_id = tracks
                    .iter()
                    .find(|t| iou(&det.bbox, &t.bbox) > TRACK_LABEL_IOU)
                    .map(|t| t.track_id);
                Detection {
                    track_id,
                    ..det.clone()
                }
            })
            .collect();

        let snapshot_b64 = encode_snapshot(&frame);

        inner.reporter.dispatch(Report::Detection(DetectionEvent {
            camera_id: inner.camera_id.clone(),
            location_id: inner.location_id.clone(),
            timestamp: now_iso.clone(),
            frame_number,
            detections: labeled,
            snapshot_b64: snapshot_b64.clone(),
        }));

        let (scan_zone, exit_zone) = {
            let config = inner.config.read().await;
            (config.scan_zone.clone(), config.exit_zone.clone())
        };

        let alerts = inner.zone_engine.lock().await.update(
            &tracks,
            scan_zone.as_ref(),
            exit_zone.as_ref(),
        );

        for item in alerts {
            let description = format!(
                "Tracked item '{}' (track {}) exited scan zone without scan event after {} frames.",
                item.class_name, item.track_id, item.total_frames
            );
            tracing::warn!(
                camera_id = %inner.camera_id,
                track_id = item.track_id,
                class_name = %item.class_name,
                total_frames = item.total_frames,
                "Non-scan alert raised"
            );
            inner.reporter.dispatch(Report::Alert(NonScanAlert {
                camera_id: inner.camera_id.clone(),
                location_id: inner.location_id.clone(),
                timestamp: now_iso.clone(),
                track_id: item.track_id,
                class_name: item.class_name,
                confidence: item.last_confidence,
                bbox: item.last_bbox,
                snapshot_b64: snapshot_b64.clone(),
                description,
            }));
        }
    }
}

fn encode_snapshot(frame: &Frame) -> Option<String> {
    if frame.data.is_empty() {
        return None;
    }
    Some(BASE64.encode(&frame.data))
}
