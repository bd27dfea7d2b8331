//! Object detection boundary
//!
//! The detection model is an external collaborator: an opaque, concurrently
//! callable function from frame to detections. Inference is CPU-bound and
//! runs on the blocking pool.

use crate::capture::Frame;
use crate::models::Detection;

/// Frame-to-detections model boundary
pub trait Detector: Send + Sync + 'static {
    /// Run detection on one frame. Blocking; may return empty; no ordering
    /// guarantee. Must be callable concurrently from multiple camera
    /// pipelines.
    fn detect(&self, frame: &Frame) -> Vec<Detection>;

    /// Whether the model is ready. Registering a camera against an unloaded
    /// detector is a precondition violation, not a retryable fault.
    fn is_loaded(&self) -> bool {
        true
    }
}

/// Pass-through detector for wiring the engine without a model. Streams are
/// supervised and tracked (empty updates still age tracks) but nothing is
/// ever detected.
#[derive(Debug, Clone, Default)]
pub struct NoopDetector;

impl Detector for NoopDetector {
    fn detect(&self, _frame: &Frame) -> Vec<Detection> {
        Vec::new()
    }
}
