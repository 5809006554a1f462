//! Live webcam capture through nokhwa.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::{query, Camera};

use super::{DeviceInfo, FrameSource, SourceSettings};
use crate::error::AcquisitionError;
use crate::frame::{FrameView, Plane, PixelFormat};

/// List all camera devices nokhwa can see.
pub fn list_devices() -> Result<Vec<DeviceInfo>, AcquisitionError> {
    let devices = query(ApiBackend::Auto).map_err(|e| AcquisitionError::QueryFailed(e.to_string()))?;

    Ok(devices
        .into_iter()
        .map(|d| DeviceInfo {
            index: d.index().as_index().unwrap_or(0),
            name: d.human_name(),
            description: d.description().to_string(),
        })
        .collect())
}

/// An open camera stream.
///
/// NV12 and YUYV frames are handed to the pipeline as they come off the
/// device. Anything else (MJPEG, raw RGB, grayscale) is decoded to RGB by
/// nokhwa first.
///
/// Not `Send`: open it on the thread that captures.
pub struct CameraSource {
    camera: Camera,
    description: String,
    delivered: bool,
}

impl CameraSource {
    pub fn open(settings: &SourceSettings) -> Result<Self, AcquisitionError> {
        if list_devices()?.is_empty() {
            return Err(AcquisitionError::NoDevices);
        }
        let index = CameraIndex::Index(settings.device_index);
        let mut camera = open_camera_with_fallback(&index, settings)?;
        camera
            .open_stream()
            .map_err(|e| AcquisitionError::StreamFailed(e.to_string()))?;

        let format = camera.camera_format();
        let description = format!(
            "camera {} {}x{} {:?} @ {}fps",
            settings.device_index,
            format.width(),
            format.height(),
            format.format(),
            format.frame_rate()
        );
        log::info!("Opened {}", description);
        Ok(Self {
            camera,
            description,
            delivered: false,
        })
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        let _ = self.camera.stop_stream();
    }
}

impl FrameSource for CameraSource {
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn next_frame(&mut self, on_frame: &mut dyn FnMut(&FrameView<'_>)) -> Result<bool, AcquisitionError> {
        let raw = self
            .camera
            .frame()
            .map_err(|e| AcquisitionError::StreamFailed(e.to_string()))?;
        let resolution = raw.resolution();
        let width = resolution.width() as usize;
        let height = resolution.height() as usize;
        let data = raw.buffer();

        match raw.source_frame_format() {
            NokhwaFrameFormat::NV12 => {
                // Tightly packed: full luma plane followed by interleaved CbCr
                let split = (width * height).min(data.len());
                let (luma, chroma) = data.split_at(split);
                let view = FrameView::new(
                    PixelFormat::Nv12,
                    width,
                    height,
                    &[Plane::new(luma, width), Plane::new(chroma, width.div_ceil(2) * 2)],
                );
                on_frame(&view);
            }
            NokhwaFrameFormat::YUYV => {
                on_frame(&FrameView::packed(PixelFormat::Yuyv, width, height, data, width * 2));
            }
            other => match raw.decode_image::<RgbFormat>() {
                Ok(decoded) => {
                    let rgb = decoded.into_raw();
                    on_frame(&FrameView::packed(PixelFormat::Rgb8, width, height, &rgb, width * 3));
                }
                // A stream that never decodes is unusable; later failures are
                // one-off corrupt frames
                Err(e) if !self.delivered => {
                    return Err(AcquisitionError::UnsupportedDeviceFormat(format!("{:?} ({})", other, e)))
                }
                Err(e) => {
                    log::warn!("Skipping undecodable {:?} frame: {}", other, e);
                    return Ok(true);
                }
            },
        }
        self.delivered = true;
        Ok(true)
    }
}

/// Try to open a camera with multiple format fallback strategies.
fn open_camera_with_fallback(
    index: &CameraIndex,
    settings: &SourceSettings,
) -> Result<Camera, AcquisitionError> {
    let resolution = nokhwa::utils::Resolution::new(settings.resolution.width, settings.resolution.height);
    // Native YCbCr first so frames skip the decoder, then MJPEG, then
    // whatever the camera offers at its highest resolution
    let format_attempts = [
        NokhwaFrameFormat::NV12,
        NokhwaFrameFormat::YUYV,
        NokhwaFrameFormat::MJPEG,
    ]
    .into_iter()
    .map(|format| {
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            resolution,
            format,
            settings.fps,
        )))
    })
    .chain(std::iter::once(RequestedFormat::new::<RgbFormat>(
        RequestedFormatType::AbsoluteHighestResolution,
    )));

    let mut last_error = None;
    for requested in format_attempts {
        match Camera::new(index.clone(), requested) {
            Ok(cam) => return Ok(cam),
            Err(e) => {
                log::debug!("Camera rejected requested format: {}", e);
                last_error = Some(e);
            }
        }
    }

    let Some(e) = last_error else {
        return Err(AcquisitionError::DeviceNotFound(settings.device_index));
    };
    let msg = e.to_string().to_lowercase();
    if msg.contains("permission")
        || msg.contains("denied")
        || msg.contains("authorization")
        || msg.contains("access")
    {
        Err(AcquisitionError::PermissionDenied)
    } else {
        Err(AcquisitionError::OpenFailed(e.to_string()))
    }
}
