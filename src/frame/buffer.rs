//! Owned, reusable pixel storage.

use super::format::{PixelFormat, MAX_PLANES};
use super::view::{FrameView, Plane};

/// Default row alignment in bytes for newly allocated buffers.
pub const DEFAULT_ROW_ALIGNMENT: usize = 16;

/// A frame-sized pixel buffer that owns its memory.
///
/// All planes live in one contiguous allocation. Every plane satisfies
/// `stride >= row bytes` and occupies `stride * rows` bytes, so the buffer can
/// be reused frame after frame without reallocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    format: PixelFormat,
    width: usize,
    height: usize,
    strides: [usize; MAX_PLANES],
    offsets: [usize; MAX_PLANES],
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a zeroed buffer with rows padded to [`DEFAULT_ROW_ALIGNMENT`].
    pub fn new(format: PixelFormat, width: usize, height: usize) -> Self {
        Self::with_alignment(format, width, height, DEFAULT_ROW_ALIGNMENT)
    }

    /// Allocate a zeroed buffer with rows padded to a multiple of `alignment`.
    ///
    /// An alignment of 0 or 1 packs rows tightly.
    pub fn with_alignment(format: PixelFormat, width: usize, height: usize, alignment: usize) -> Self {
        let alignment = alignment.max(1);
        let mut strides = [0; MAX_PLANES];
        let mut offsets = [0; MAX_PLANES];
        let mut total = 0;
        for index in 0..format.plane_count() {
            let row_bytes = format.min_row_bytes(index, width);
            let (_, rows) = format.plane_dimensions(index, width, height);
            strides[index] = row_bytes.div_ceil(alignment) * alignment;
            offsets[index] = total;
            total += strides[index] * rows;
        }
        Self {
            format,
            width,
            height,
            strides,
            offsets,
            data: vec![0; total],
        }
    }

    /// Build a tightly packed 4-channel buffer from `[r, g, b, a]` pixels in
    /// row-major order.
    pub fn from_rgba_pixels(
        format: PixelFormat,
        width: usize,
        height: usize,
        pixels: &[[u8; 4]],
    ) -> Option<Self> {
        let layout = format.channel_layout()?;
        if pixels.len() != width * height {
            return None;
        }
        let mut buffer = Self::with_alignment(format, width, height, 1);
        for (dst, px) in buffer.data.chunks_exact_mut(4).zip(pixels) {
            for (offset, value) in layout.offsets().into_iter().zip(px) {
                dst[offset] = *value;
            }
        }
        Some(buffer)
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

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Row stride of plane `index` in bytes.
    pub fn stride(&self, index: usize) -> usize {
        self.strides[index]
    }

    /// True when the buffer already has the given layout and size.
    pub fn matches(&self, format: PixelFormat, width: usize, height: usize) -> bool {
        self.format == format && self.width == width && self.height == height
    }

    /// The whole backing allocation, padding included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn plane_range(&self, index: usize) -> std::ops::Range<usize> {
        let (_, rows) = self.format.plane_dimensions(index, self.width, self.height);
        let start = self.offsets[index];
        start..start + self.strides[index] * rows
    }

    /// Bytes of plane `index`, padding included.
    pub fn plane(&self, index: usize) -> &[u8] {
        &self.data[self.plane_range(index)]
    }

    pub fn plane_mut(&mut self, index: usize) -> &mut [u8] {
        let range = self.plane_range(index);
        &mut self.data[range]
    }

    /// Row `y` of plane `index`, without padding.
    pub fn row(&self, index: usize, y: usize) -> &[u8] {
        let start = self.offsets[index] + y * self.strides[index];
        let len = self.format.min_row_bytes(index, self.width);
        &self.data[start..start + len]
    }

    pub fn row_mut(&mut self, index: usize, y: usize) -> &mut [u8] {
        let start = self.offsets[index] + y * self.strides[index];
        let len = self.format.min_row_bytes(index, self.width);
        &mut self.data[start..start + len]
    }

    /// Read the pixel at (x, y) as `[r, g, b, a]`.
    ///
    /// Returns `None` for formats without a 4-channel layout or coordinates
    /// outside the buffer.
    pub fn rgba_at(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        let layout = self.format.channel_layout()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let px = &self.row(0, y)[x * 4..x * 4 + 4];
        Some(layout.offsets().map(|offset| px[offset]))
    }

    /// Borrow the buffer as a frame view, e.g. to feed it back into the
    /// converter.
    pub fn view(&self) -> FrameView<'_> {
        let count = self.format.plane_count();
        let mut planes = [Plane::default(); MAX_PLANES];
        for (index, plane) in planes.iter_mut().enumerate().take(count) {
            *plane = Plane::new(self.plane(index), self.strides[index]);
        }
        FrameView::new(self.format, self.width, self.height, &planes[..count])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pads_rows_to_alignment() {
        let buf = PixelBuffer::new(PixelFormat::Rgba8, 3, 2);
        // 12 bytes of pixels padded to 16
        assert_eq!(buf.stride(0), 16);
        assert_eq!(buf.as_bytes().len(), 32);
        assert_eq!(buf.row(0, 1).len(), 12);
    }

    #[test]
    fn test_nv12_planes_are_contiguous() {
        let buf = PixelBuffer::with_alignment(PixelFormat::Nv12, 4, 4, 1);
        assert_eq!(buf.plane(0).len(), 16);
        assert_eq!(buf.plane(1).len(), 8);
        assert_eq!(buf.as_bytes().len(), 24);
        assert!(buf.view().validate().is_ok());
    }

    #[test]
    fn test_from_rgba_pixels_respects_channel_order() {
        let buf =
            PixelBuffer::from_rgba_pixels(PixelFormat::Argb8, 1, 1, &[[10, 20, 30, 40]]).unwrap();
        assert_eq!(buf.as_bytes(), &[40, 10, 20, 30]);
        assert_eq!(buf.rgba_at(0, 0), Some([10, 20, 30, 40]));
        assert_eq!(buf.rgba_at(1, 0), None);
    }

    #[test]
    fn test_zero_area_buffer_is_empty() {
        let buf = PixelBuffer::new(PixelFormat::Rgba8, 0, 0);
        assert!(buf.is_empty());
        assert_eq!(buf.pixel_count(), 0);
        assert!(buf.as_bytes().is_empty());
    }
}
