//! CLI enum types and value parsers.

use clap::ValueEnum;

use crate::convert::{ColorMatrix, ColorRange};
use crate::equalize::AlphaPolicy;
use crate::frame::PixelFormat;

/// Where frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SourceKind {
    /// Generated test pattern, no hardware needed
    #[default]
    Synthetic,
    /// Live webcam (requires the `camera` feature)
    Camera,
}

/// Parse a presentable (4-channel) output format.
pub fn parse_output_format(s: &str) -> Result<PixelFormat, String> {
    PixelFormat::from_str(s)
        .filter(|f| f.channel_layout().is_some())
        .ok_or_else(|| format!("Unknown output format '{}'. Available formats: rgba, bgra, argb", s))
}

/// Parse any frame format the converter accepts.
pub fn parse_source_format(s: &str) -> Result<PixelFormat, String> {
    PixelFormat::from_str(s).ok_or_else(|| {
        format!(
            "Unknown pixel format '{}'. Available formats: nv12, i420, yuyv, rgb, rgba, bgra, argb",
            s
        )
    })
}

pub fn parse_alpha(s: &str) -> Result<AlphaPolicy, String> {
    AlphaPolicy::from_str(s)
        .ok_or_else(|| format!("Unknown alpha policy '{}'. Use preserve or remap", s))
}

pub fn parse_matrix(s: &str) -> Result<ColorMatrix, String> {
    ColorMatrix::from_str(s).ok_or_else(|| format!("Unknown color matrix '{}'. Use bt601 or bt709", s))
}

pub fn parse_range(s: &str) -> Result<ColorRange, String> {
    ColorRange::from_str(s).ok_or_else(|| format!("Unknown color range '{}'. Use video or full", s))
}

/// Parse and validate a histogram bin count (1-256).
pub fn parse_bins(s: &str) -> Result<usize, String> {
    let bins: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(1..=256).contains(&bins) {
        return Err(format!("Bin count must be between 1 and 256, got {}", bins));
    }
    Ok(bins)
}
