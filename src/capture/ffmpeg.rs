//! RTSP capture via an ffmpeg subprocess
//!
//! ffmpeg handles the RTSP session and decoding and emits an MJPEG stream
//! on stdout; frames are split on the JPEG SOI/EOI markers. Keeps the
//! engine free of native video dependencies.

use super::{CaptureBackend, Frame, FrameSource};
use crate::error::{Error, Result};
use std::io::Read;
use std::process::{Child, Command, Stdio};

/// JPEG start-of-image marker
const SOI: [u8; 2] = [0xFF, 0xD8];
/// JPEG end-of-image marker
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Capture backend shelling out to ffmpeg
#[derive(Debug, Clone, Default)]
pub struct FfmpegCapture;

impl FfmpegCapture {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for FfmpegCapture {
    fn open(&self, url: &str) -> Result<Box<dyn FrameSource>> {
        let mut child = Command::new("ffmpeg")
            .args([
                "-rtsp_transport",
                "tcp",
                "-i",
                url,
                "-f",
                "image2pipe",
                "-vcodec",
                "mjpeg",
                "-q:v",
                "5",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Stream(format!("failed to spawn ffmpeg for {url}: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Stream("ffmpeg stdout not captured".to_string()))?;

        Ok(Box::new(FfmpegSource {
            child,
            stdout,
            buffer: Vec::with_capacity(64 * 1024),
            index: 0,
        }))
    }
}

struct FfmpegSource {
    child: Child,
    stdout: std::process::ChildStdout,
    buffer: Vec<u8>,
    index: u64,
}

impl FfmpegSource {
    /// Pull the next complete SOI..EOI span out of the buffer, reading more
    /// from the pipe as needed. `None` once the pipe closes.
    fn next_jpeg(&mut self) -> Option<Vec<u8>> {
        let mut chunk = [0u8; 16 * 1024];
        loop {
            if let Some(frame) = extract_jpeg(&mut self.buffer) {
                return Some(frame);
            }
            match self.stdout.read(&mut chunk) {
                Ok(0) => return None,
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    tracing::debug!(error = %e, "ffmpeg pipe read failed");
                    return None;
                }
            }
        }
    }
}

impl FrameSource for FfmpegSource {
    fn read(&mut self) -> Option<Frame> {
        let data = self.next_jpeg()?;
        self.index += 1;
        Some(Frame {
            index: self.index,
            data,
        })
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Remove and return the first complete JPEG from `buffer`, discarding any
/// garbage before the SOI marker
fn extract_jpeg(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let start = find_marker(buffer, &SOI)?;
    if start > 0 {
        buffer.drain(..start);
    }
    let end = find_marker(&buffer[2..], &EOI)? + 2;
    let frame: Vec<u8> = buffer.drain(..end + 2).collect();
    Some(frame)
}

fn find_marker(haystack: &[u8], marker: &[u8; 2]) -> Option<usize> {
    haystack
        .windows(2)
        .position(|w| w == marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(payload: &[u8]) -> Vec<u8> {
        let mut v = SOI.to_vec();
        v.extend_from_slice(payload);
        v.extend_from_slice(&EOI);
        v
    }

    #[test]
    fn test_extract_single_frame() {
        let mut buf = jpeg(&[1, 2, 3]);
        let frame = extract_jpeg(&mut buf).unwrap();
        assert_eq!(frame, jpeg(&[1, 2, 3]));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_extract_skips_leading_garbage() {
        let mut buf = vec![0, 0, 0];
        buf.extend(jpeg(&[9]));
        let frame = extract_jpeg(&mut buf).unwrap();
        assert_eq!(frame, jpeg(&[9]));
    }

    #[test]
    fn test_incomplete_frame_waits_for_more_data() {
        let mut buf = SOI.to_vec();
        buf.extend_from_slice(&[1, 2, 3]);
        assert!(extract_jpeg(&mut buf).is_none());
        assert_eq!(buf.len(), 5, "partial frame stays buffered");
    }

    #[test]
    fn test_two_frames_extracted_in_order() {
        let mut buf = jpeg(&[1]);
        buf.extend(jpeg(&[2]));
        assert_eq!(extract_jpeg(&mut buf).unwrap(), jpeg(&[1]));
        assert_eq!(extract_jpeg(&mut buf).unwrap(), jpeg(&[2]));
    }
}
