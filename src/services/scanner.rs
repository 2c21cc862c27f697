//! Verification scanner: frame sampling loop and QR decoding
//!
//! A scanner owns a frame source (the stand-in for a camera stream) for as
//! long as it is open. The sampling loop pulls at most one frame per tick,
//! decodes it, and stops on the first accepted payload. Failed decodes are
//! retried on the next frame with no limit. The source is released when the
//! loop exits, whichever way it exits.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::{
    sync::mpsc,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::ScanConfig,
    error::{AppError, AppResult},
    models::checkout::{FrameAck, FrameUpload},
};

/// Raw camera frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    /// Greyscale (1 byte/pixel) or RGBA (4 bytes/pixel), row-major
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> AppResult<Self> {
        let area = width * height;
        if pixels.len() != area && pixels.len() != area * 4 {
            return Err(AppError::Validation(format!(
                "Frame of {}x{} needs {} (greyscale) or {} (RGBA) bytes, got {}",
                width,
                height,
                area,
                area * 4,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_upload(upload: &FrameUpload) -> AppResult<Self> {
        let pixels = STANDARD
            .decode(upload.pixels.as_bytes())
            .map_err(|e| AppError::BadRequest(format!("Invalid pixel data: {}", e)))?;
        Self::new(upload.width as usize, upload.height as usize, pixels)
    }

    /// Luma of the pixel at (x, y)
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        let idx = y * self.width + x;
        if self.pixels.len() == self.width * self.height {
            return self.pixels[idx];
        }
        let px = &self.pixels[idx * 4..idx * 4 + 3];
        ((u32::from(px[0]) * 299 + u32::from(px[1]) * 587 + u32::from(px[2]) * 114) / 1000) as u8
    }
}

/// 2D barcode decode primitive
pub trait ScanDecoder: Send + Sync {
    /// Decoded payload, or `None` when no code is found in the frame
    fn decode(&self, frame: &Frame) -> Option<String>;
}

/// QR decoder backed by rqrr
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl ScanDecoder for QrDecoder {
    fn decode(&self, frame: &Frame) -> Option<String> {
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(frame.width, frame.height, |x, y| {
                frame.luma(x, y)
            });
        prepared
            .detect_grids()
            .into_iter()
            .find_map(|grid| grid.decode().ok().map(|(_, content)| content))
    }
}

/// Something that yields camera frames
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` once the source is gone
    async fn next_frame(&mut self) -> Option<Frame>;
}

/// Frames pushed over a bounded channel
pub struct ChannelFrameSource {
    frames: mpsc::Receiver<Frame>,
}

#[async_trait]
impl FrameSource for ChannelFrameSource {
    async fn next_frame(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }
}

impl Drop for ChannelFrameSource {
    fn drop(&mut self) {
        tracing::debug!("Scanner frame source released");
    }
}

/// Whether a decoded payload verified the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanVerdict {
    Accepted,
    /// Keep sampling
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Verified(String),
    Cancelled,
    SourceClosed,
}

/// Sample `source` until a payload is accepted, the token is cancelled or the
/// source closes. The source is dropped on return.
pub async fn run_scan_loop<S, F, Fut>(
    mut source: S,
    decoder: Arc<dyn ScanDecoder>,
    period: Duration,
    cancel: CancellationToken,
    mut on_payload: F,
) -> ScanOutcome
where
    S: FrameSource,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = ScanVerdict>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return ScanOutcome::Cancelled,
            frame = async {
                ticker.tick().await;
                source.next_frame().await
            } => frame,
        };

        let Some(frame) = frame else {
            return ScanOutcome::SourceClosed;
        };

        let decoder = decoder.clone();
        let decoded = match tokio::task::spawn_blocking(move || decoder.decode(&frame)).await {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("Frame decode task failed: {}", e);
                None
            }
        };

        let Some(payload) = decoded else {
            tracing::debug!("No code found in frame, sampling next frame");
            continue;
        };

        if cancel.is_cancelled() {
            return ScanOutcome::Cancelled;
        }

        match on_payload(payload.clone()).await {
            ScanVerdict::Accepted => return ScanOutcome::Verified(payload),
            ScanVerdict::Rejected => continue,
        }
    }
}

/// Handle to an open scanner. Dropping it stops the sampling loop, which in
/// turn releases the frame source.
#[derive(Debug)]
pub struct ScannerHandle {
    frames: mpsc::Sender<Frame>,
    cancel: CancellationToken,
}

impl ScannerHandle {
    /// Open a scanner and start its sampling loop
    pub fn open<F, Fut>(config: &ScanConfig, decoder: Arc<dyn ScanDecoder>, on_payload: F) -> Self
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = ScanVerdict> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(config.frame_buffer.max(1));
        let cancel = CancellationToken::new();
        let period = Duration::from_millis(config.frame_interval_ms.max(1));

        let source = ChannelFrameSource { frames: rx };
        let token = cancel.clone();
        tokio::spawn(async move {
            let outcome = run_scan_loop(source, decoder, period, token, on_payload).await;
            tracing::debug!("Scanner loop finished: {:?}", outcome);
        });

        Self { frames: tx, cancel }
    }

    /// Queue a frame for sampling; frames are dropped while the loop is busy
    pub fn push_frame(&self, frame: Frame) -> FrameAck {
        match self.frames.try_send(frame) {
            Ok(()) => FrameAck::Queued,
            Err(_) => FrameAck::Dropped,
        }
    }
}

impl Drop for ScannerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    /// Treats the first pixel value as the number of a fake code: 0 means none
    struct ByteDecoder;

    impl ScanDecoder for ByteDecoder {
        fn decode(&self, frame: &Frame) -> Option<String> {
            match frame.pixels.first() {
                Some(0) | None => None,
                Some(n) => Some(format!("CODE-{}", n)),
            }
        }
    }

    struct VecSource {
        frames: Vec<Frame>,
        released: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FrameSource for VecSource {
        async fn next_frame(&mut self) -> Option<Frame> {
            if self.frames.is_empty() {
                None
            } else {
                Some(self.frames.remove(0))
            }
        }
    }

    impl Drop for VecSource {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn frame(first: u8) -> Frame {
        Frame::new(1, 1, vec![first]).unwrap()
    }

    #[test]
    fn test_frame_size_checked() {
        assert!(Frame::new(2, 2, vec![0; 4]).is_ok());
        assert!(Frame::new(2, 2, vec![0; 16]).is_ok());
        assert!(Frame::new(2, 2, vec![0; 5]).is_err());
    }

    #[test]
    fn test_rgba_luma() {
        let frame = Frame::new(1, 1, vec![255, 255, 255, 255]).unwrap();
        assert_eq!(frame.luma(0, 0), 255);
        let frame = Frame::new(1, 1, vec![0, 0, 0, 255]).unwrap();
        assert_eq!(frame.luma(0, 0), 0);
    }

    #[test]
    fn test_blank_frame_has_no_code() {
        let frame = Frame::new(64, 64, vec![255; 64 * 64]).unwrap();
        assert_eq!(QrDecoder.decode(&frame), None);
    }

    #[tokio::test]
    async fn test_retries_until_decoded() {
        let released = Arc::new(AtomicUsize::new(0));
        let source = VecSource {
            frames: vec![frame(0), frame(0), frame(7), frame(9)],
            released: released.clone(),
        };

        let outcome = run_scan_loop(
            source,
            Arc::new(ByteDecoder),
            Duration::from_millis(1),
            CancellationToken::new(),
            |_| async { ScanVerdict::Accepted },
        )
        .await;

        assert_eq!(outcome, ScanOutcome::Verified("CODE-7".to_string()));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_payload_keeps_sampling() {
        let released = Arc::new(AtomicUsize::new(0));
        let source = VecSource {
            frames: vec![frame(3), frame(4)],
            released: released.clone(),
        };

        let outcome = run_scan_loop(
            source,
            Arc::new(ByteDecoder),
            Duration::from_millis(1),
            CancellationToken::new(),
            |payload| async move {
                if payload == "CODE-4" {
                    ScanVerdict::Accepted
                } else {
                    ScanVerdict::Rejected
                }
            },
        )
        .await;

        assert_eq!(outcome, ScanOutcome::Verified("CODE-4".to_string()));
    }

    #[tokio::test]
    async fn test_cancel_releases_source() {
        let released = Arc::new(AtomicUsize::new(0));
        let source = VecSource {
            frames: vec![frame(0); 3],
            released: released.clone(),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = run_scan_loop(
            source,
            Arc::new(ByteDecoder),
            Duration::from_millis(1),
            cancel,
            |_| async { ScanVerdict::Accepted },
        )
        .await;

        assert_eq!(outcome, ScanOutcome::Cancelled);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_source() {
        let source = VecSource {
            frames: vec![frame(0)],
            released: Arc::new(AtomicUsize::new(0)),
        };
        let outcome = run_scan_loop(
            source,
            Arc::new(ByteDecoder),
            Duration::from_millis(1),
            CancellationToken::new(),
            |_| async { ScanVerdict::Accepted },
        )
        .await;
        assert_eq!(outcome, ScanOutcome::SourceClosed);
    }

    #[tokio::test]
    async fn test_handle_delivers_payload() {
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        let config = ScanConfig {
            frame_interval_ms: 1,
            frame_buffer: 4,
        };
        let handle = ScannerHandle::open(&config, Arc::new(ByteDecoder), move |payload| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(payload);
            }
            async { ScanVerdict::Accepted }
        });

        assert_eq!(handle.push_frame(frame(0)), FrameAck::Queued);
        assert_eq!(handle.push_frame(frame(5)), FrameAck::Queued);

        let payload = tokio::time::timeout(Duration::from_secs(2), rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, "CODE-5");
    }
}
