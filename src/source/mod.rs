//! Frame acquisition adapters.
//!
//! A [`FrameSource`] lends each raw frame to a callback for the duration of
//! one call and never keeps it afterwards. Sources are driven from the
//! capture worker thread; a camera handle is not `Send`, so sources are
//! opened on the thread that uses them.

#[cfg(feature = "camera")]
mod camera;
mod synthetic;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use synthetic::SyntheticSource;

use std::fmt;

use crate::error::AcquisitionError;
use crate::frame::FrameView;

/// Information about an available camera device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Device index for selection
    pub index: u32,
    /// Human-readable device name
    pub name: String,
    pub description: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// Requested capture size; the device may pick the closest it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Settings for opening a camera.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub device_index: u32,
    pub resolution: Resolution,
    /// Target FPS (actual may vary)
    pub fps: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            resolution: Resolution::default(),
            fps: 30,
        }
    }
}

/// A producer of raw frames.
pub trait FrameSource {
    /// Short description for log messages.
    fn describe(&self) -> String;

    /// Acquire the next frame and lend it to `on_frame`.
    ///
    /// Returns `Ok(false)` once the source has no more frames. A frame the
    /// source itself could not read is skipped without calling `on_frame`.
    fn next_frame(&mut self, on_frame: &mut dyn FnMut(&FrameView<'_>)) -> Result<bool, AcquisitionError>;
}

/// Enumerate cameras attached to the system.
///
/// An empty list is not an error.
pub fn list_devices() -> Result<Vec<DeviceInfo>, AcquisitionError> {
    #[cfg(feature = "camera")]
    {
        camera::list_devices()
    }
    #[cfg(not(feature = "camera"))]
    {
        Err(AcquisitionError::CameraFeatureDisabled)
    }
}

/// Open the camera described by `settings`.
pub fn open_camera(settings: &SourceSettings) -> Result<Box<dyn FrameSource>, AcquisitionError> {
    #[cfg(feature = "camera")]
    {
        Ok(Box::new(CameraSource::open(settings)?))
    }
    #[cfg(not(feature = "camera"))]
    {
        let _ = settings;
        Err(AcquisitionError::CameraFeatureDisabled)
    }
}
