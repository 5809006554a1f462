//! Pixel format conversion.
//!
//! Any supported source format converts to any supported destination
//! format by decoding each row to RGBA and re-encoding it. YCbCr planes are
//! read and written with their own strides, 4:2:0 chroma is center-sited and
//! averaged over 2x2 blocks when encoding.
//!
//! [`ConversionContext`] is the cached plan for one [`ConversionKey`];
//! [`Converter`] wraps one and rebuilds it whenever the key changes.

mod context;
mod matrix;

pub use context::{ConversionContext, ConversionKey, ConversionOptions};
pub use matrix::{ColorMatrix, ColorRange, YCbCrCoefficients};

use crate::error::ConversionError;
use crate::frame::{FrameView, PixelBuffer};

/// Stand-alone converter that caches its context across calls.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConversionOptions,
    context: Option<ConversionContext>,
    builds: u64,
}

impl Converter {
    pub fn new(options: ConversionOptions) -> Self {
        Self {
            options,
            context: None,
            builds: 0,
        }
    }

    /// The cached context, if a frame has been converted.
    pub fn context(&self) -> Option<&ConversionContext> {
        self.context.as_ref()
    }

    /// How many times a context has been built.
    pub fn builds(&self) -> u64 {
        self.builds
    }

    /// Convert `src` into `dst`, whose format selects the destination layout.
    ///
    /// The caller sizes `dst`; a mismatch with the frame is an error rather
    /// than a silent reallocation.
    pub fn convert(&mut self, src: &FrameView<'_>, dst: &mut PixelBuffer) -> Result<(), ConversionError> {
        let key = ConversionKey::for_frame(src, dst.format());
        let context = match self.context.take() {
            Some(context) if context.key() == key => context,
            _ => {
                let context = ConversionContext::new(key, self.options)?;
                self.builds += 1;
                log::debug!(
                    "Built conversion context {} -> {} at {}x{}",
                    key.source,
                    key.destination,
                    key.width,
                    key.height
                );
                context
            }
        };
        let context = self.context.insert(context);
        context.convert(src, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    #[test]
    fn test_converter_reuses_context_for_same_key() {
        let mut converter = Converter::default();
        let src = PixelBuffer::new(PixelFormat::Rgba8, 4, 4);
        let mut dst = PixelBuffer::new(PixelFormat::Bgra8, 4, 4);
        converter.convert(&src.view(), &mut dst).unwrap();
        converter.convert(&src.view(), &mut dst).unwrap();
        assert_eq!(converter.builds(), 1);
    }

    #[test]
    fn test_converter_rebuilds_on_resize() {
        let mut converter = Converter::default();
        let mut dst = PixelBuffer::new(PixelFormat::Bgra8, 4, 4);
        converter
            .convert(&PixelBuffer::new(PixelFormat::Rgba8, 4, 4).view(), &mut dst)
            .unwrap();

        let mut dst = PixelBuffer::new(PixelFormat::Bgra8, 8, 2);
        converter
            .convert(&PixelBuffer::new(PixelFormat::Rgba8, 8, 2).view(), &mut dst)
            .unwrap();
        assert_eq!(converter.builds(), 2);
        assert_eq!(converter.context().unwrap().key().width, 8);
    }

    #[test]
    fn test_converter_rejects_zero_area() {
        let mut converter = Converter::default();
        let src = PixelBuffer::new(PixelFormat::Rgba8, 0, 0);
        let mut dst = PixelBuffer::new(PixelFormat::Rgba8, 0, 0);
        assert!(matches!(
            converter.convert(&src.view(), &mut dst),
            Err(ConversionError::EmptyFrame { .. })
        ));
        assert!(converter.context().is_none());
    }
}
