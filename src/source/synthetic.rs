//! Generated test-pattern frames.

use super::FrameSource;
use crate::convert::{ConversionContext, ConversionKey, ConversionOptions};
use crate::error::{AcquisitionError, ConversionError};
use crate::frame::{FrameView, PixelBuffer, PixelFormat};

/// Lowest and highest intensity of the generated pattern.
///
/// Kept narrow so the equalizer has visible work to do.
const PATTERN_LOW: usize = 80;
const PATTERN_SPAN: usize = 80;

/// A low-contrast gradient that drifts one pixel per frame.
///
/// Frames are rendered as RGBA and encoded into the source format with the
/// same converter the pipeline uses, so a camera delivering NV12, I420 or
/// YUYV can be stood in for without hardware.
#[derive(Debug)]
pub struct SyntheticSource {
    format: PixelFormat,
    options: ConversionOptions,
    limit: Option<u64>,
    produced: u64,
    rgba: PixelBuffer,
    frame: PixelBuffer,
    context: ConversionContext,
}

impl SyntheticSource {
    /// An NV12 source of the given size.
    pub fn new(width: usize, height: usize) -> Result<Self, AcquisitionError> {
        Self::with_format(PixelFormat::Nv12, width, height, ConversionOptions::default())
    }

    pub fn with_format(
        format: PixelFormat,
        width: usize,
        height: usize,
        options: ConversionOptions,
    ) -> Result<Self, AcquisitionError> {
        let (rgba, frame, context) = allocate(format, width, height, options)?;
        Ok(Self {
            format,
            options,
            limit: None,
            produced: 0,
            rgba,
            frame,
            context,
        })
    }

    /// Stop after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Change the frame size from the next frame on.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), AcquisitionError> {
        let (rgba, frame, context) = allocate(self.format, width, height, self.options)?;
        self.rgba = rgba;
        self.frame = frame;
        self.context = context;
        Ok(())
    }

    fn render(&mut self) -> Result<(), AcquisitionError> {
        let width = self.rgba.width();
        let height = self.rgba.height();
        let shift = self.produced as usize;
        for y in 0..height {
            let row = self.rgba.row_mut(0, y);
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let drift = (x + shift) % width;
                px[0] = (PATTERN_LOW + drift * PATTERN_SPAN / width) as u8;
                px[1] = (PATTERN_LOW + y * PATTERN_SPAN / height) as u8;
                px[2] = (PATTERN_LOW + (x + y + shift) % PATTERN_SPAN) as u8;
                px[3] = 255;
            }
        }
        self.context
            .convert(&self.rgba.view(), &mut self.frame)
            .map_err(|e| AcquisitionError::StreamFailed(e.to_string()))
    }
}

fn allocate(
    format: PixelFormat,
    width: usize,
    height: usize,
    options: ConversionOptions,
) -> Result<(PixelBuffer, PixelBuffer, ConversionContext), AcquisitionError> {
    let key = ConversionKey {
        source: PixelFormat::Rgba8,
        destination: format,
        width,
        height,
    };
    let context = ConversionContext::new(key, options).map_err(|e| match e {
        ConversionError::EmptyFrame { .. } | ConversionError::OddWidth { .. } => {
            AcquisitionError::InvalidGeometry { width, height }
        }
        e => AcquisitionError::FrameSetup(e),
    })?;
    let rgba = PixelBuffer::with_alignment(PixelFormat::Rgba8, width, height, 1);
    let frame = context.allocate_destination(64);
    Ok((rgba, frame, context))
}

impl FrameSource for SyntheticSource {
    fn describe(&self) -> String {
        format!(
            "synthetic {}x{} {}",
            self.frame.width(),
            self.frame.height(),
            self.format
        )
    }

    fn next_frame(&mut self, on_frame: &mut dyn FnMut(&FrameView<'_>)) -> Result<bool, AcquisitionError> {
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            return Ok(false);
        }
        self.render()?;
        self.produced += 1;
        on_frame(&self.frame.view());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ColorMatrix;

    #[test]
    fn test_limit_ends_stream() {
        let mut source = SyntheticSource::new(8, 4).unwrap().with_limit(2);
        let mut seen = 0;
        while source.next_frame(&mut |_| seen += 1).unwrap() {}
        assert_eq!(seen, 2);
        assert_eq!(source.produced(), 2);
    }

    #[test]
    fn test_frames_are_valid_views() {
        for format in [PixelFormat::Nv12, PixelFormat::I420, PixelFormat::Yuyv, PixelFormat::Bgra8] {
            let mut source =
                SyntheticSource::with_format(format, 6, 4, ConversionOptions::default()).unwrap();
            source
                .next_frame(&mut |frame| {
                    assert_eq!(frame.format(), format);
                    assert_eq!((frame.width(), frame.height()), (6, 4));
                    assert!(frame.validate().is_ok());
                })
                .unwrap();
        }
    }

    #[test]
    fn test_resize_changes_frame_size() {
        let mut source = SyntheticSource::new(4, 4).unwrap();
        source.resize(8, 2).unwrap();
        source
            .next_frame(&mut |frame| assert_eq!((frame.width(), frame.height()), (8, 2)))
            .unwrap();
    }

    #[test]
    fn test_rejects_bad_geometry() {
        assert!(matches!(
            SyntheticSource::new(0, 4),
            Err(AcquisitionError::InvalidGeometry { width: 0, height: 4 })
        ));
        assert!(matches!(
            SyntheticSource::with_format(PixelFormat::Yuyv, 3, 2, ConversionOptions::default()),
            Err(AcquisitionError::InvalidGeometry { width: 3, height: 2 })
        ));
    }

    #[test]
    fn test_bad_color_matrix_is_not_a_geometry_error() {
        let options = ConversionOptions {
            matrix: ColorMatrix::Custom { kr: 0.7, kb: 0.7 },
            ..ConversionOptions::default()
        };
        let result = SyntheticSource::with_format(PixelFormat::Nv12, 640, 480, options);
        assert!(matches!(
            result,
            Err(AcquisitionError::FrameSetup(ConversionError::ColorMatrix { .. }))
        ));
        assert!(result.unwrap_err().to_string().contains("0.7"));
    }

    #[test]
    fn test_pattern_drifts_between_frames() {
        let mut source =
            SyntheticSource::with_format(PixelFormat::Rgba8, 8, 2, ConversionOptions::default()).unwrap();
        let mut first = Vec::new();
        source.next_frame(&mut |f| first = f.row(0, 0).to_vec()).unwrap();
        let mut second = Vec::new();
        source.next_frame(&mut |f| second = f.row(0, 0).to_vec()).unwrap();
        assert_ne!(first, second);
    }
}
