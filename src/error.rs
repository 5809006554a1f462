//! Error types for acquisition, conversion, equalization and presentation.
//!
//! Only [`AcquisitionError`] is fatal. The per-frame kinds are collected in
//! [`FrameError`] and cause the pipeline to drop the frame and carry on.

use crate::frame::PixelFormat;

/// Errors raised while opening or reading a frame source.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("No cameras found")]
    NoDevices,

    #[error("Camera device {0} not found. Run 'frame-equalizer list-devices' to see available devices")]
    DeviceNotFound(u32),

    #[error(
        "Camera permission denied. On macOS, grant access in System Settings > Privacy & Security > Camera"
    )]
    PermissionDenied,

    #[error("Failed to query cameras: {0}")]
    QueryFailed(String),

    #[error("Failed to open camera: {0}")]
    OpenFailed(String),

    #[error("Failed to start camera stream: {0}")]
    StreamFailed(String),

    #[error("Camera delivers {0}, which has no converter (try a camera that offers NV12, YUYV or RGB)")]
    UnsupportedDeviceFormat(String),

    #[error("Camera support not compiled in. Rebuild with `--features camera`")]
    CameraFeatureDisabled,

    #[error("Invalid source geometry {width}x{height}")]
    InvalidGeometry { width: usize, height: usize },

    #[error("Cannot prepare source frames: {0}")]
    FrameSetup(#[source] ConversionError),
}

/// Errors raised by the pixel format converter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("Frame has zero area ({width}x{height})")]
    EmptyFrame { width: usize, height: usize },

    #[error("{format} frames need an even width, got {width}")]
    OddWidth { format: PixelFormat, width: usize },

    #[error("{format} expects {expected} plane(s), got {found}")]
    PlaneCount {
        format: PixelFormat,
        expected: usize,
        found: usize,
    },

    #[error("Plane {plane} stride {stride} is smaller than its row of {row_bytes} bytes")]
    StrideTooSmall {
        plane: usize,
        stride: usize,
        row_bytes: usize,
    },

    #[error("Plane {plane} holds {len} bytes, needs at least {required}")]
    PlaneTooShort {
        plane: usize,
        len: usize,
        required: usize,
    },

    #[error(
        "Destination is {dst_width}x{dst_height} {dst_format}, frame needs {width}x{height} {expected_format}"
    )]
    DestinationMismatch {
        width: usize,
        height: usize,
        expected_format: PixelFormat,
        dst_width: usize,
        dst_height: usize,
        dst_format: PixelFormat,
    },

    #[error("Conversion context was built for a different frame layout")]
    ContextMismatch,

    #[error("Color matrix coefficients out of range (kr={kr}, kb={kb})")]
    ColorMatrix { kr: f32, kb: f32 },
}

/// Errors raised while building histograms or equalization tables.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EqualizationError {
    #[error("Buffer has zero area ({width}x{height})")]
    EmptyBuffer { width: usize, height: usize },

    #[error("{0} is not a 4-channel packed format")]
    UnsupportedFormat(PixelFormat),

    #[error("Histogram bin count must be between 1 and 256, got {0}")]
    InvalidBinCount(usize),

    #[error("Histogram has {found} channel(s), expected {expected}")]
    ChannelMismatch { expected: usize, found: usize },

    #[error("Histogram channel {channel} has {found} bins, expected {expected}")]
    BinMismatch {
        channel: usize,
        expected: usize,
        found: usize,
    },

    #[error("Histogram sampled {histogram} pixels but the buffer has {buffer}")]
    SampleCountMismatch { histogram: u64, buffer: u64 },
}

/// Errors raised when handing a frame to the presentation surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresentationError {
    #[error("Presentation surface is busy with the previous frame")]
    Busy,

    #[error("Presentation surface is gone")]
    Disconnected,
}

/// Any error that drops a single frame without stopping capture.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("equalization failed: {0}")]
    Equalization(#[from] EqualizationError),

    #[error("presentation failed: {0}")]
    Presentation(#[from] PresentationError),
}
