//! Histogram equalization for contrast enhancement.
//!
//! The lookup table for each channel is the normalized cumulative
//! distribution of that channel:
//!
//! ```text
//! lut[v] = round((cdf[bin(v)] - cdf_min) / (total - cdf_min) * 255)
//! ```
//!
//! where `cdf_min` is the first non-zero cumulative count. The table is
//! monotonic by construction and stays inside 0..=255. A channel whose whole
//! mass sits in one bin has nothing to stretch and maps through unchanged.

use crate::error::EqualizationError;
use crate::frame::PixelBuffer;
use crate::histogram::{Histogram, CHANNELS, MAX_BINS};

/// What to do with the alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaPolicy {
    /// Leave alpha untouched
    #[default]
    Preserve,
    /// Equalize alpha like the color channels
    Remap,
}

impl AlphaPolicy {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "preserve" | "keep" => Some(Self::Preserve),
            "remap" | "equalize" => Some(Self::Remap),
            _ => None,
        }
    }
}

/// One 256-entry lookup table per channel (red, green, blue, alpha).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualizationTable {
    luts: [[u8; 256]; CHANNELS],
}

impl Default for EqualizationTable {
    fn default() -> Self {
        Self::identity()
    }
}

impl EqualizationTable {
    /// Tables that map every value to itself.
    pub fn identity() -> Self {
        let mut lut = [0u8; 256];
        for (v, out) in lut.iter_mut().enumerate() {
            *out = v as u8;
        }
        Self {
            luts: [lut; CHANNELS],
        }
    }

    /// Build tables from a histogram of any bin count.
    pub fn from_histogram(histogram: &Histogram) -> Result<Self, EqualizationError> {
        if histogram.channel_count() != CHANNELS {
            return Err(EqualizationError::ChannelMismatch {
                expected: CHANNELS,
                found: histogram.channel_count(),
            });
        }
        let bins = histogram.bins();
        if bins == 0 || bins > MAX_BINS {
            return Err(EqualizationError::InvalidBinCount(bins));
        }
        let mut table = Self::identity();
        for (index, lut) in table.luts.iter_mut().enumerate() {
            let counts = histogram.channel(index);
            if counts.len() != bins {
                return Err(EqualizationError::BinMismatch {
                    channel: index,
                    expected: bins,
                    found: counts.len(),
                });
            }
            build_lut(counts, lut);
        }
        Ok(table)
    }

    pub fn channel(&self, index: usize) -> &[u8; 256] {
        &self.luts[index]
    }

    /// True when every channel's table is non-decreasing.
    pub fn is_monotonic(&self) -> bool {
        self.luts
            .iter()
            .all(|lut| lut.windows(2).all(|w| w[0] <= w[1]))
    }

    /// Remap `buffer` in place through the tables.
    pub fn apply(&self, buffer: &mut PixelBuffer, alpha: AlphaPolicy) -> Result<(), EqualizationError> {
        let layout = buffer
            .format()
            .channel_layout()
            .ok_or(EqualizationError::UnsupportedFormat(buffer.format()))?;
        let channels = match alpha {
            AlphaPolicy::Preserve => CHANNELS - 1,
            AlphaPolicy::Remap => CHANNELS,
        };
        let offsets = layout.offsets();
        for y in 0..buffer.height() {
            for px in buffer.row_mut(0, y).chunks_exact_mut(4) {
                for (lut, &offset) in self.luts.iter().zip(&offsets).take(channels) {
                    px[offset] = lut[px[offset] as usize];
                }
            }
        }
        Ok(())
    }
}

/// Fill `lut` from one channel's bin counts; leaves it untouched (identity)
/// when the channel is empty or single-valued.
fn build_lut(counts: &[u64], lut: &mut [u8; 256]) {
    let bins = counts.len();
    let total: u64 = counts.iter().sum();
    let mut cdf = [0u64; MAX_BINS];
    let mut running = 0;
    for (slot, &count) in cdf.iter_mut().zip(counts) {
        running += count;
        *slot = running;
    }
    let cdf_min = cdf[..bins].iter().copied().find(|&c| c > 0).unwrap_or(0);
    if total <= cdf_min {
        return;
    }
    let span = (total - cdf_min) as f64;
    for (v, out) in lut.iter_mut().enumerate() {
        let cumulative = cdf[v * bins / 256].saturating_sub(cdf_min) as f64;
        *out = (cumulative / span * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

/// Equalizes buffers in place, deriving a 256-bin histogram from each one.
///
/// Owns the histogram and table storage so repeated frames reuse them.
#[derive(Debug, Clone)]
pub struct Equalizer {
    alpha: AlphaPolicy,
    histogram: Histogram,
    table: EqualizationTable,
}

impl Equalizer {
    pub fn new(alpha: AlphaPolicy) -> Self {
        Self {
            alpha,
            histogram: Histogram::from_counts(MAX_BINS, vec![vec![0; MAX_BINS]; CHANNELS]),
            table: EqualizationTable::identity(),
        }
    }

    /// Equalize `buffer` using its own full-resolution histogram.
    pub fn equalize(&mut self, buffer: &mut PixelBuffer) -> Result<&EqualizationTable, EqualizationError> {
        ensure_not_empty(buffer)?;
        self.histogram.clear();
        self.histogram.accumulate(buffer)?;
        self.table = EqualizationTable::from_histogram(&self.histogram)?;
        self.table.apply(buffer, self.alpha)?;
        Ok(&self.table)
    }

    /// Equalize `buffer` using a histogram computed elsewhere.
    ///
    /// The histogram must have sampled exactly the buffer's pixels.
    pub fn equalize_with(
        &mut self,
        buffer: &mut PixelBuffer,
        histogram: &Histogram,
    ) -> Result<&EqualizationTable, EqualizationError> {
        ensure_not_empty(buffer)?;
        let table = EqualizationTable::from_histogram(histogram)?;
        let expected = buffer.pixel_count() as u64;
        if let Some((found, _)) = (0..CHANNELS)
            .map(|c| (histogram.channel(c).iter().sum::<u64>(), c))
            .find(|(sum, _)| *sum != expected)
        {
            return Err(EqualizationError::SampleCountMismatch {
                histogram: found,
                buffer: expected,
            });
        }
        table.apply(buffer, self.alpha)?;
        self.table = table;
        Ok(&self.table)
    }
}

fn ensure_not_empty(buffer: &PixelBuffer) -> Result<(), EqualizationError> {
    if buffer.is_empty() {
        return Err(EqualizationError::EmptyBuffer {
            width: buffer.width(),
            height: buffer.height(),
        });
    }
    Ok(())
}
