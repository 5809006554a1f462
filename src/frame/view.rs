//! Borrowed frame descriptors handed over by acquisition adapters.

use super::format::{PixelFormat, MAX_PLANES};
use crate::error::ConversionError;

/// One memory plane of a frame: its bytes and the distance between rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    pub stride: usize,
}

impl<'a> Plane<'a> {
    pub fn new(data: &'a [u8], stride: usize) -> Self {
        Self { data, stride }
    }
}

/// A raw frame as delivered by a source.
///
/// The view borrows the source's memory and is only valid for the duration
/// of the callback it was passed to. Call [`FrameView::validate`] (the
/// converter does) before reading rows.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    format: PixelFormat,
    width: usize,
    height: usize,
    planes: [Plane<'a>; MAX_PLANES],
    plane_count: usize,
}

impl<'a> FrameView<'a> {
    /// Describe a frame from its planes, in format order (luma first).
    pub fn new(format: PixelFormat, width: usize, height: usize, planes: &[Plane<'a>]) -> Self {
        let mut slots = [Plane::default(); MAX_PLANES];
        for (slot, plane) in slots.iter_mut().zip(planes) {
            *slot = *plane;
        }
        Self {
            format,
            width,
            height,
            planes: slots,
            plane_count: planes.len(),
        }
    }

    /// Describe a single-plane frame.
    pub fn packed(
        format: PixelFormat,
        width: usize,
        height: usize,
        data: &'a [u8],
        stride: usize,
    ) -> Self {
        Self::new(format, width, height, &[Plane::new(data, stride)])
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn plane_count(&self) -> usize {
        self.plane_count
    }

    pub fn plane(&self, index: usize) -> &Plane<'a> {
        &self.planes[index]
    }

    /// Check the view against its declared format and dimensions.
    ///
    /// The last row of each plane may omit its stride padding, as capture
    /// drivers commonly hand out buffers trimmed that way.
    pub fn validate(&self) -> Result<(), ConversionError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConversionError::EmptyFrame {
                width: self.width,
                height: self.height,
            });
        }
        if self.format == PixelFormat::Yuyv && self.width % 2 != 0 {
            return Err(ConversionError::OddWidth {
                format: self.format,
                width: self.width,
            });
        }
        let expected = self.format.plane_count();
        if self.plane_count != expected {
            return Err(ConversionError::PlaneCount {
                format: self.format,
                expected,
                found: self.plane_count,
            });
        }
        for (index, plane) in self.planes[..expected].iter().enumerate() {
            let row_bytes = self.format.min_row_bytes(index, self.width);
            if plane.stride < row_bytes {
                return Err(ConversionError::StrideTooSmall {
                    plane: index,
                    stride: plane.stride,
                    row_bytes,
                });
            }
            let (_, rows) = self.format.plane_dimensions(index, self.width, self.height);
            // Overflow saturates so a corrupt stride reads as a short plane
            let required = plane
                .stride
                .checked_mul(rows - 1)
                .and_then(|bytes| bytes.checked_add(row_bytes))
                .unwrap_or(usize::MAX);
            if plane.data.len() < required {
                return Err(ConversionError::PlaneTooShort {
                    plane: index,
                    len: plane.data.len(),
                    required,
                });
            }
        }
        Ok(())
    }

    /// Bytes of row `y` of plane `index`, without stride padding.
    ///
    /// Panics if the view has not passed [`FrameView::validate`].
    pub fn row(&self, index: usize, y: usize) -> &'a [u8] {
        let plane = self.planes[index];
        let start = y * plane.stride;
        let len = self.format.min_row_bytes(index, self.width);
        &plane.data[start..start + len]
    }
}
