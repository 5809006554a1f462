//! Cached conversion plans and the row kernels that execute them.

use super::matrix::{ColorMatrix, ColorRange, YCbCrCoefficients};
use crate::error::ConversionError;
use crate::frame::{FrameView, PixelBuffer, PixelFormat};

/// User-facing knobs for YCbCr conversion.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConversionOptions {
    pub matrix: ColorMatrix,
    pub range: ColorRange,
}

/// Fingerprint of a conversion: both formats plus the frame size.
///
/// A context is only valid for frames whose key equals the one it was built
/// for; comparing keys is the cheap per-frame check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversionKey {
    pub source: PixelFormat,
    pub destination: PixelFormat,
    pub width: usize,
    pub height: usize,
}

impl ConversionKey {
    pub fn for_frame(frame: &FrameView<'_>, destination: PixelFormat) -> Self {
        Self {
            source: frame.format(),
            destination,
            width: frame.width(),
            height: frame.height(),
        }
    }
}

/// A conversion plan built once per key and reused for every frame.
///
/// Holds the color matrix factors and two rows of RGBA scratch space, which
/// is all the per-frame path needs; converting never allocates.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    key: ConversionKey,
    coefficients: YCbCrCoefficients,
    scratch: Vec<[u8; 4]>,
}

impl ConversionContext {
    pub fn new(key: ConversionKey, options: ConversionOptions) -> Result<Self, ConversionError> {
        if key.width == 0 || key.height == 0 {
            return Err(ConversionError::EmptyFrame {
                width: key.width,
                height: key.height,
            });
        }
        for format in [key.source, key.destination] {
            if format == PixelFormat::Yuyv && key.width % 2 != 0 {
                return Err(ConversionError::OddWidth {
                    format,
                    width: key.width,
                });
            }
        }
        let coefficients = YCbCrCoefficients::new(options.matrix, options.range)?;
        Ok(Self {
            key,
            coefficients,
            scratch: vec![[0, 0, 0, 255]; key.width * 2],
        })
    }

    pub fn key(&self) -> ConversionKey {
        self.key
    }

    /// Allocate a destination buffer sized for this context.
    pub fn allocate_destination(&self, alignment: usize) -> PixelBuffer {
        PixelBuffer::with_alignment(
            self.key.destination,
            self.key.width,
            self.key.height,
            alignment,
        )
    }

    /// Convert `src` into `dst`.
    ///
    /// Rows are processed in pairs so 4:2:0 destinations can average each
    /// 2x2 chroma block.
    pub fn convert(&mut self, src: &FrameView<'_>, dst: &mut PixelBuffer) -> Result<(), ConversionError> {
        src.validate()?;
        if ConversionKey::for_frame(src, self.key.destination) != self.key {
            return Err(ConversionError::ContextMismatch);
        }
        let ConversionKey {
            destination,
            width,
            height,
            ..
        } = self.key;
        if !dst.matches(destination, width, height) {
            return Err(ConversionError::DestinationMismatch {
                width,
                height,
                expected_format: destination,
                dst_width: dst.width(),
                dst_height: dst.height(),
                dst_format: dst.format(),
            });
        }

        for y0 in (0..height).step_by(2) {
            let rows = (height - y0).min(2);
            for r in 0..rows {
                let out = &mut self.scratch[r * width..(r + 1) * width];
                decode_row(src, y0 + r, out, &self.coefficients);
            }
            encode_rows(dst, y0, &self.scratch[..rows * width], width, &self.coefficients);
        }
        Ok(())
    }
}

/// Decode row `y` of any source format into RGBA pixels.
fn decode_row(src: &FrameView<'_>, y: usize, out: &mut [[u8; 4]], c: &YCbCrCoefficients) {
    let format = src.format();
    match format {
        PixelFormat::Rgba8 | PixelFormat::Bgra8 | PixelFormat::Argb8 => {
            if let Some(layout) = format.channel_layout() {
                let offsets = layout.offsets();
                for (px, chunk) in out.iter_mut().zip(src.row(0, y).chunks_exact(4)) {
                    *px = offsets.map(|o| chunk[o]);
                }
            }
        }
        PixelFormat::Rgb8 => {
            for (px, chunk) in out.iter_mut().zip(src.row(0, y).chunks_exact(3)) {
                *px = [chunk[0], chunk[1], chunk[2], 255];
            }
        }
        PixelFormat::Nv12 => {
            let luma = src.row(0, y);
            let chroma = src.row(1, y / 2);
            for (x, px) in out.iter_mut().enumerate() {
                let pair = (x / 2) * 2;
                let [r, g, b] = c.decode(luma[x], chroma[pair], chroma[pair + 1]);
                *px = [r, g, b, 255];
            }
        }
        PixelFormat::I420 => {
            let luma = src.row(0, y);
            let cb = src.row(1, y / 2);
            let cr = src.row(2, y / 2);
            for (x, px) in out.iter_mut().enumerate() {
                let [r, g, b] = c.decode(luma[x], cb[x / 2], cr[x / 2]);
                *px = [r, g, b, 255];
            }
        }
        PixelFormat::Yuyv => {
            let row = src.row(0, y);
            for (x, px) in out.iter_mut().enumerate() {
                let macro_px = &row[(x / 2) * 4..(x / 2) * 4 + 4];
                let luma = macro_px[(x % 2) * 2];
                let [r, g, b] = c.decode(luma, macro_px[1], macro_px[3]);
                *px = [r, g, b, 255];
            }
        }
    }
}

/// Encode one or two RGBA rows into `dst` starting at row `y0`.
fn encode_rows(dst: &mut PixelBuffer, y0: usize, rows: &[[u8; 4]], width: usize, c: &YCbCrCoefficients) {
    let format = dst.format();
    match format {
        PixelFormat::Rgba8 | PixelFormat::Bgra8 | PixelFormat::Argb8 => {
            if let Some(layout) = format.channel_layout() {
                let offsets = layout.offsets();
                for (r, src_row) in rows.chunks_exact(width).enumerate() {
                    let out = dst.row_mut(0, y0 + r);
                    for (chunk, px) in out.chunks_exact_mut(4).zip(src_row) {
                        for (offset, value) in offsets.iter().zip(px) {
                            chunk[*offset] = *value;
                        }
                    }
                }
            }
        }
        PixelFormat::Rgb8 => {
            for (r, src_row) in rows.chunks_exact(width).enumerate() {
                let out = dst.row_mut(0, y0 + r);
                for (chunk, px) in out.chunks_exact_mut(3).zip(src_row) {
                    chunk.copy_from_slice(&px[..3]);
                }
            }
        }
        PixelFormat::Yuyv => {
            for (r, src_row) in rows.chunks_exact(width).enumerate() {
                let out = dst.row_mut(0, y0 + r);
                for (chunk, pair) in out.chunks_exact_mut(4).zip(src_row.chunks_exact(2)) {
                    let (y_a, cb_a, cr_a) = c.encode(pair[0][0], pair[0][1], pair[0][2]);
                    let (y_b, cb_b, cr_b) = c.encode(pair[1][0], pair[1][1], pair[1][2]);
                    chunk[0] = c.quantize_luma(y_a);
                    chunk[1] = c.quantize_chroma((cb_a + cb_b) * 0.5);
                    chunk[2] = c.quantize_luma(y_b);
                    chunk[3] = c.quantize_chroma((cr_a + cr_b) * 0.5);
                }
            }
        }
        PixelFormat::Nv12 | PixelFormat::I420 => {
            for (r, src_row) in rows.chunks_exact(width).enumerate() {
                let out = dst.row_mut(0, y0 + r);
                for (luma, px) in out.iter_mut().zip(src_row) {
                    *luma = c.quantize_luma(c.encode(px[0], px[1], px[2]).0);
                }
            }
            let chroma_y = y0 / 2;
            let chroma_width = width.div_ceil(2);
            for cx in 0..chroma_width {
                let (cb, cr) = average_chroma(rows, width, cx, c);
                let (cb, cr) = (c.quantize_chroma(cb), c.quantize_chroma(cr));
                if format == PixelFormat::Nv12 {
                    let out = dst.row_mut(1, chroma_y);
                    out[cx * 2] = cb;
                    out[cx * 2 + 1] = cr;
                } else {
                    dst.row_mut(1, chroma_y)[cx] = cb;
                    dst.row_mut(2, chroma_y)[cx] = cr;
                }
            }
        }
    }
}

/// Mean chroma of the up-to-2x2 block whose top-left column is `2 * cx`.
fn average_chroma(rows: &[[u8; 4]], width: usize, cx: usize, c: &YCbCrCoefficients) -> (f32, f32) {
    let x_end = (cx * 2 + 2).min(width);
    let mut cb_sum = 0.0;
    let mut cr_sum = 0.0;
    let mut count = 0.0;
    for row in rows.chunks_exact(width) {
        for px in &row[cx * 2..x_end] {
            let (_, cb, cr) = c.encode(px[0], px[1], px[2]);
            cb_sum += cb;
            cr_sum += cr;
            count += 1.0;
        }
    }
    (cb_sum / count, cr_sum / count)
}
