//! Pixel format tags and their memory layouts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of planes any supported format uses.
pub const MAX_PLANES: usize = 3;

/// Pixel layout of a frame or buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Packed R, G, B, A (4 bytes per pixel)
    Rgba8,
    /// Packed B, G, R, A (4 bytes per pixel)
    Bgra8,
    /// Packed A, R, G, B (4 bytes per pixel)
    Argb8,
    /// Packed R, G, B without alpha (3 bytes per pixel)
    Rgb8,
    /// Bi-planar 4:2:0 YCbCr: full-size luma plane, half-size interleaved CbCr plane
    Nv12,
    /// Tri-planar 4:2:0 YCbCr: luma, Cb and Cr in separate planes
    I420,
    /// Packed 4:2:2 YCbCr, two pixels per 4 bytes (Y0 Cb Y1 Cr)
    Yuyv,
}

/// Byte offsets of each channel inside a 4-byte packed pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    pub red: usize,
    pub green: usize,
    pub blue: usize,
    pub alpha: usize,
}

impl ChannelLayout {
    /// Offsets in histogram channel order (red, green, blue, alpha).
    pub fn offsets(self) -> [usize; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }
}

impl PixelFormat {
    /// Parse a format name as used on the command line and in config files.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rgba" | "rgba8" => Some(Self::Rgba8),
            "bgra" | "bgra8" => Some(Self::Bgra8),
            "argb" | "argb8" | "xrgb" => Some(Self::Argb8),
            "rgb" | "rgb8" => Some(Self::Rgb8),
            "nv12" | "420v" | "420f" => Some(Self::Nv12),
            "i420" | "yuv420p" => Some(Self::I420),
            "yuyv" | "yuy2" => Some(Self::Yuyv),
            _ => None,
        }
    }

    /// Number of memory planes the format uses.
    pub fn plane_count(self) -> usize {
        match self {
            Self::Nv12 => 2,
            Self::I420 => 3,
            _ => 1,
        }
    }

    /// Channel offsets for 4-channel packed formats, `None` otherwise.
    pub fn channel_layout(self) -> Option<ChannelLayout> {
        match self {
            Self::Rgba8 => Some(ChannelLayout {
                red: 0,
                green: 1,
                blue: 2,
                alpha: 3,
            }),
            Self::Bgra8 => Some(ChannelLayout {
                red: 2,
                green: 1,
                blue: 0,
                alpha: 3,
            }),
            Self::Argb8 => Some(ChannelLayout {
                red: 1,
                green: 2,
                blue: 3,
                alpha: 0,
            }),
            _ => None,
        }
    }

    /// Pixel dimensions of plane `index` for a frame of `width` x `height`.
    ///
    /// Chroma planes of 4:2:0 formats round up so odd sizes keep their last
    /// row and column of chroma.
    pub fn plane_dimensions(self, index: usize, width: usize, height: usize) -> (usize, usize) {
        match (self, index) {
            (Self::Nv12 | Self::I420, 1..) => (width.div_ceil(2), height.div_ceil(2)),
            (Self::Yuyv, _) => (width.div_ceil(2), height),
            _ => (width, height),
        }
    }

    /// Bytes occupied by one element of plane `index`.
    ///
    /// An element is a pixel for packed RGB formats, a sample for luma and
    /// I420 chroma planes, a CbCr pair for the NV12 chroma plane and a
    /// two-pixel macropixel for YUYV.
    pub fn bytes_per_element(self, index: usize) -> usize {
        match (self, index) {
            (Self::Rgba8 | Self::Bgra8 | Self::Argb8, _) => 4,
            (Self::Rgb8, _) => 3,
            (Self::Nv12, 1) => 2,
            (Self::Yuyv, _) => 4,
            _ => 1,
        }
    }

    /// Minimum number of bytes in one row of plane `index`.
    pub fn min_row_bytes(self, index: usize, width: usize) -> usize {
        let (elements, _) = self.plane_dimensions(index, width, 1);
        elements.saturating_mul(self.bytes_per_element(index))
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rgba8 => "rgba8",
            Self::Bgra8 => "bgra8",
            Self::Argb8 => "argb8",
            Self::Rgb8 => "rgb8",
            Self::Nv12 => "nv12",
            Self::I420 => "i420",
            Self::Yuyv => "yuyv",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_aliases() {
        assert_eq!(PixelFormat::from_str("RGBA"), Some(PixelFormat::Rgba8));
        assert_eq!(PixelFormat::from_str("xrgb"), Some(PixelFormat::Argb8));
        assert_eq!(PixelFormat::from_str("420v"), Some(PixelFormat::Nv12));
        assert_eq!(PixelFormat::from_str("yuy2"), Some(PixelFormat::Yuyv));
        assert_eq!(PixelFormat::from_str("cmyk"), None);
    }

    #[test]
    fn test_plane_counts() {
        assert_eq!(PixelFormat::Rgba8.plane_count(), 1);
        assert_eq!(PixelFormat::Nv12.plane_count(), 2);
        assert_eq!(PixelFormat::I420.plane_count(), 3);
        assert_eq!(PixelFormat::Yuyv.plane_count(), 1);
    }

    #[test]
    fn test_nv12_plane_geometry() {
        let f = PixelFormat::Nv12;
        assert_eq!(f.plane_dimensions(0, 640, 480), (640, 480));
        assert_eq!(f.plane_dimensions(1, 640, 480), (320, 240));
        // Odd sizes keep their trailing chroma sample
        assert_eq!(f.plane_dimensions(1, 5, 3), (3, 2));
        assert_eq!(f.min_row_bytes(1, 5), 6);
    }

    #[test]
    fn test_yuyv_row_bytes() {
        assert_eq!(PixelFormat::Yuyv.min_row_bytes(0, 4), 8);
    }

    #[test]
    fn test_channel_layouts() {
        assert_eq!(PixelFormat::Argb8.channel_layout().unwrap().offsets(), [1, 2, 3, 0]);
        assert_eq!(PixelFormat::Bgra8.channel_layout().unwrap().offsets(), [2, 1, 0, 3]);
        assert!(PixelFormat::Rgb8.channel_layout().is_none());
        assert!(PixelFormat::Nv12.channel_layout().is_none());
    }
}
