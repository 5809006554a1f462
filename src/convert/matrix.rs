//! YCbCr color matrices and quantization ranges.

use crate::error::ConversionError;

/// Luma coefficients used to derive R'G'B' <-> Y'CbCr.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ColorMatrix {
    /// ITU-R BT.601 (SD cameras, most webcams)
    #[default]
    Bt601,
    /// ITU-R BT.709 (HD)
    Bt709,
    /// Explicit red and blue luma weights
    Custom { kr: f32, kb: f32 },
}

impl ColorMatrix {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bt601" | "601" | "bt.601" => Some(Self::Bt601),
            "bt709" | "709" | "bt.709" => Some(Self::Bt709),
            _ => None,
        }
    }

    /// Red and blue luma weights `(kr, kb)`.
    pub fn weights(self) -> (f32, f32) {
        match self {
            Self::Bt601 => (0.299, 0.114),
            Self::Bt709 => (0.2126, 0.0722),
            Self::Custom { kr, kb } => (kr, kb),
        }
    }
}

/// Quantization range of the Y'CbCr samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorRange {
    /// Y in 16..=235, Cb/Cr in 16..=240
    #[default]
    Video,
    /// All components use 0..=255
    Full,
}

impl ColorRange {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "video" | "limited" | "tv" => Some(Self::Video),
            "full" | "pc" => Some(Self::Full),
            _ => None,
        }
    }
}

/// Precomputed conversion factors for one matrix and range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YCbCrCoefficients {
    kr: f32,
    kg: f32,
    kb: f32,
    cr_to_r: f32,
    cb_to_g: f32,
    cr_to_g: f32,
    cb_to_b: f32,
    range: ColorRange,
}

const VIDEO_Y_OFFSET: f32 = 16.0;
const VIDEO_Y_SPAN: f32 = 219.0;
const VIDEO_C_SPAN: f32 = 224.0;
const CHROMA_ZERO: f32 = 128.0;

impl YCbCrCoefficients {
    /// Derive the coefficients, rejecting weights that would not describe a
    /// valid color space.
    pub fn new(matrix: ColorMatrix, range: ColorRange) -> Result<Self, ConversionError> {
        let (kr, kb) = matrix.weights();
        let valid = kr.is_finite()
            && kb.is_finite()
            && kr > 0.0
            && kb > 0.0
            && kr + kb < 1.0;
        if !valid {
            return Err(ConversionError::ColorMatrix { kr, kb });
        }
        let kg = 1.0 - kr - kb;
        Ok(Self {
            kr,
            kg,
            kb,
            cr_to_r: 2.0 * (1.0 - kr),
            cb_to_g: 2.0 * kb * (1.0 - kb) / kg,
            cr_to_g: 2.0 * kr * (1.0 - kr) / kg,
            cb_to_b: 2.0 * (1.0 - kb),
            range,
        })
    }

    /// Convert one quantized Y'CbCr sample to R'G'B'.
    #[inline]
    pub fn decode(&self, y: u8, cb: u8, cr: u8) -> [u8; 3] {
        let (y, cb, cr) = match self.range {
            ColorRange::Video => (
                (y as f32 - VIDEO_Y_OFFSET) * (255.0 / VIDEO_Y_SPAN),
                (cb as f32 - CHROMA_ZERO) * (255.0 / VIDEO_C_SPAN),
                (cr as f32 - CHROMA_ZERO) * (255.0 / VIDEO_C_SPAN),
            ),
            ColorRange::Full => (y as f32, cb as f32 - CHROMA_ZERO, cr as f32 - CHROMA_ZERO),
        };
        let r = y + self.cr_to_r * cr;
        let g = y - self.cb_to_g * cb - self.cr_to_g * cr;
        let b = y + self.cb_to_b * cb;
        [quantize(r), quantize(g), quantize(b)]
    }

    /// Convert R'G'B' to unquantized `(y, cb, cr)`: y in 0..=255 and chroma
    /// centered on zero. Chroma stays unquantized so 2x2 blocks can be
    /// averaged before [`YCbCrCoefficients::quantize_chroma`].
    #[inline]
    pub fn encode(&self, r: u8, g: u8, b: u8) -> (f32, f32, f32) {
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let y = self.kr * r + self.kg * g + self.kb * b;
        let cb = (b - y) / self.cb_to_b;
        let cr = (r - y) / self.cr_to_r;
        (y, cb, cr)
    }

    #[inline]
    pub fn quantize_luma(&self, y: f32) -> u8 {
        match self.range {
            ColorRange::Video => quantize(y * (VIDEO_Y_SPAN / 255.0) + VIDEO_Y_OFFSET),
            ColorRange::Full => quantize(y),
        }
    }

    #[inline]
    pub fn quantize_chroma(&self, c: f32) -> u8 {
        match self.range {
            ColorRange::Video => quantize(c * (VIDEO_C_SPAN / 255.0) + CHROMA_ZERO),
            ColorRange::Full => quantize(c + CHROMA_ZERO),
        }
    }
}

#[inline]
fn quantize(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
