//! Video capture boundary
//!
//! The engine treats capture as an opaque source of encoded frames:
//! `open(url)` yields a handle, blocking `read()` yields frames until the
//! stream ends. Release happens on drop. The bundled [`FfmpegCapture`]
//! backend decodes RTSP via an ffmpeg subprocess; tests inject scripted
//! sources through the same traits.

mod ffmpeg;

pub use ffmpeg::FfmpegCapture;

use crate::error::Result;

/// One encoded (JPEG) frame pulled from a stream
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw frame index within the current connection
    pub index: u64,
    /// Encoded image payload
    pub data: Vec<u8>,
}

/// An open capture connection. `read` blocks until a frame is available;
/// `None` means the stream ended or the connection was lost. Resources are
/// released on drop.
pub trait FrameSource: Send {
    fn read(&mut self) -> Option<Frame>;
}

/// Factory for capture connections, shared across camera pipelines
pub trait CaptureBackend: Send + Sync + 'static {
    /// Open the source. Blocking; runs on the blocking pool.
    fn open(&self, url: &str) -> Result<Box<dyn FrameSource>>;
}
