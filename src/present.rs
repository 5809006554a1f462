//! Handoff of processed frames to the presentation surface.
//!
//! The capture worker never waits on the UI. [`channel`] builds a presenter
//! and a receiver joined by a single-slot channel; when the UI has not picked
//! up the previous image yet, the new one is dropped.

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::time::Duration;

use crate::error::PresentationError;
use crate::frame::{PixelBuffer, PixelFormat};

/// An owned snapshot of a processed frame, safe to send to another thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderableImage {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub format: PixelFormat,
    /// Sequence number of the source frame
    pub sequence: u64,
}

impl RenderableImage {
    /// Copy a packed buffer so the worker can reuse it immediately.
    pub fn snapshot(buffer: &PixelBuffer, sequence: u64) -> Self {
        Self {
            data: buffer.plane(0).to_vec(),
            width: buffer.width(),
            height: buffer.height(),
            stride: buffer.stride(0),
            format: buffer.format(),
            sequence,
        }
    }

    /// Pixel at (x, y) as `[r, g, b, a]` for 4-channel formats.
    pub fn rgba_at(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        let layout = self.format.channel_layout()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y * self.stride + x * 4;
        let px = self.data.get(start..start + 4)?;
        Some(layout.offsets().map(|offset| px[offset]))
    }

    /// Average of the red, green and blue channels over the image, 0..=255.
    pub fn mean_intensity(&self) -> f64 {
        let pixels = self.width * self.height;
        if pixels == 0 {
            return 0.0;
        }
        let mut sum = 0u64;
        for y in 0..self.height {
            for x in 0..self.width {
                if let Some([r, g, b, _]) = self.rgba_at(x, y) {
                    sum += r as u64 + g as u64 + b as u64;
                }
            }
        }
        sum as f64 / (pixels * 3) as f64
    }
}

/// Receives processed frames on behalf of a display surface.
///
/// Implementations must not block the caller for longer than it takes to
/// hand the image over.
pub trait Presenter {
    fn present(&mut self, image: RenderableImage) -> Result<(), PresentationError>;
}

impl<F> Presenter for F
where
    F: FnMut(RenderableImage) -> Result<(), PresentationError>,
{
    fn present(&mut self, image: RenderableImage) -> Result<(), PresentationError> {
        self(image)
    }
}

/// Worker side of a presentation channel.
#[derive(Debug, Clone)]
pub struct ChannelPresenter {
    tx: SyncSender<RenderableImage>,
}

impl Presenter for ChannelPresenter {
    fn present(&mut self, image: RenderableImage) -> Result<(), PresentationError> {
        self.tx.try_send(image).map_err(|e| match e {
            TrySendError::Full(_) => PresentationError::Busy,
            TrySendError::Disconnected(_) => PresentationError::Disconnected,
        })
    }
}

/// UI side of a presentation channel.
#[derive(Debug)]
pub struct PresentationReceiver {
    rx: Receiver<RenderableImage>,
}

impl PresentationReceiver {
    /// Wait up to `timeout` for the next image.
    ///
    /// Returns `Ok(None)` on timeout and `Err` once every presenter is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<RenderableImage>, PresentationError> {
        match self.rx.recv_timeout(timeout) {
            Ok(image) => Ok(Some(image)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(PresentationError::Disconnected),
        }
    }

    /// Take the pending image, if any, without waiting.
    pub fn try_recv(&self) -> Result<Option<RenderableImage>, PresentationError> {
        match self.rx.try_recv() {
            Ok(image) => Ok(Some(image)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PresentationError::Disconnected),
        }
    }
}

/// Create a presenter/receiver pair holding at most one image in flight.
pub fn channel() -> (ChannelPresenter, PresentationReceiver) {
    let (tx, rx) = mpsc::sync_channel(1);
    (ChannelPresenter { tx }, PresentationReceiver { rx })
}

/// Encode a 4-channel image as binary PPM (P6), dropping alpha.
pub fn encode_ppm(image: &RenderableImage) -> Option<Vec<u8>> {
    image.format.channel_layout()?;
    let mut out = format!("P6\n{} {}\n255\n", image.width, image.height).into_bytes();
    out.reserve(image.width * image.height * 3);
    for y in 0..image.height {
        for x in 0..image.width {
            let [r, g, b, _] = image.rgba_at(x, y)?;
            out.extend_from_slice(&[r, g, b]);
        }
    }
    Some(out)
}
