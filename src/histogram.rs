//! Per-channel color histograms of converted frames.

use serde::Serialize;

use crate::error::EqualizationError;
use crate::frame::PixelBuffer;

/// Default number of bins for diagnostic histograms.
pub const DEFAULT_BINS: usize = 32;

/// Largest supported bin count: one bin per 8-bit intensity.
pub const MAX_BINS: usize = 256;

/// Number of channels tracked: red, green, blue, alpha.
pub const CHANNELS: usize = 4;

/// Channel names in histogram order.
pub const CHANNEL_NAMES: [&str; CHANNELS] = ["red", "green", "blue", "alpha"];

/// Bin counts per channel, in red, green, blue, alpha order.
///
/// Each channel splits 0..=255 into `bins` equal-width buckets. Every
/// channel's counts sum to the number of pixels accumulated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    bins: usize,
    channels: Vec<Vec<u64>>,
}

impl Histogram {
    /// An empty four-channel histogram.
    pub fn new(bins: usize) -> Result<Self, EqualizationError> {
        if bins == 0 || bins > MAX_BINS {
            return Err(EqualizationError::InvalidBinCount(bins));
        }
        Ok(Self {
            bins,
            channels: vec![vec![0; bins]; CHANNELS],
        })
    }

    /// Build a histogram from raw counts.
    ///
    /// No shape checks happen here; anything consuming the histogram (see
    /// [`crate::equalize::EqualizationTable::from_histogram`]) validates it.
    pub fn from_counts(bins: usize, channels: Vec<Vec<u64>>) -> Self {
        Self { bins, channels }
    }

    /// Accumulate `buffer` into a fresh histogram.
    pub fn from_buffer(buffer: &PixelBuffer, bins: usize) -> Result<Self, EqualizationError> {
        let mut histogram = Self::new(bins)?;
        histogram.accumulate(buffer)?;
        Ok(histogram)
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Counts of channel `index` (0 = red .. 3 = alpha).
    pub fn channel(&self, index: usize) -> &[u64] {
        &self.channels[index]
    }

    pub fn red(&self) -> &[u64] {
        self.channel(0)
    }

    pub fn green(&self) -> &[u64] {
        self.channel(1)
    }

    pub fn blue(&self) -> &[u64] {
        self.channel(2)
    }

    pub fn alpha(&self) -> &[u64] {
        self.channel(3)
    }

    /// Number of pixels counted, taken from the first channel.
    pub fn total(&self) -> u64 {
        self.channels.first().map(|c| c.iter().sum()).unwrap_or(0)
    }

    /// Bin that an 8-bit value falls into.
    #[inline]
    pub fn bin_of(&self, value: u8) -> usize {
        value as usize * self.bins / 256
    }

    /// Zero every bin, keeping the allocation.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0);
        }
    }

    /// Add every pixel of `buffer` to the counts.
    ///
    /// The buffer is only read. A zero-area buffer adds nothing.
    pub fn accumulate(&mut self, buffer: &PixelBuffer) -> Result<(), EqualizationError> {
        let layout = buffer
            .format()
            .channel_layout()
            .ok_or(EqualizationError::UnsupportedFormat(buffer.format()))?;
        if self.channels.len() != CHANNELS {
            return Err(EqualizationError::ChannelMismatch {
                expected: CHANNELS,
                found: self.channels.len(),
            });
        }
        if buffer.is_empty() {
            return Ok(());
        }

        // Count per exact value first, then fold into bins
        let mut exact = [[0u64; 256]; CHANNELS];
        let offsets = layout.offsets();
        for y in 0..buffer.height() {
            for px in buffer.row(0, y).chunks_exact(4) {
                for (counts, offset) in exact.iter_mut().zip(offsets) {
                    counts[px[offset] as usize] += 1;
                }
            }
        }
        for (channel, counts) in self.channels.iter_mut().zip(&exact) {
            for (value, count) in counts.iter().enumerate() {
                channel[value * self.bins / 256] += count;
            }
        }
        Ok(())
    }
}
