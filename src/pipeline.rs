//! Per-frame orchestration: convert, measure, equalize, present.
//!
//! [`FramePipeline`] is a small state machine. It starts `Uninitialized`
//! and moves to `Ready` on the first frame, when the conversion context and
//! the reusable destination buffer are built for that frame's layout. Each
//! frame then passes through the converting, equalizing and presenting
//! stages and the pipeline returns to `Ready`. A frame with a new layout
//! rebuilds both context and buffer. A failing frame is dropped; there is no
//! terminal state.

use std::time::Instant;

use crate::convert::{ConversionContext, ConversionKey, ConversionOptions, YCbCrCoefficients};
use crate::equalize::{AlphaPolicy, Equalizer};
use crate::error::{ConversionError, EqualizationError, FrameError, PresentationError};
use crate::frame::{FrameView, PixelBuffer, PixelFormat, DEFAULT_ROW_ALIGNMENT};
use crate::histogram::{Histogram, CHANNEL_NAMES, DEFAULT_BINS};
use crate::present::{Presenter, RenderableImage};

/// Tunables for one pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// Layout of the buffer handed to the presenter (must be 4-channel)
    pub destination: PixelFormat,
    pub conversion: ConversionOptions,
    /// Bin count of the diagnostic histogram
    pub histogram_bins: usize,
    pub alpha: AlphaPolicy,
    /// Row alignment of the destination buffer in bytes
    pub row_alignment: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            destination: PixelFormat::Rgba8,
            conversion: ConversionOptions::default(),
            histogram_bins: DEFAULT_BINS,
            alpha: AlphaPolicy::Preserve,
            row_alignment: DEFAULT_ROW_ALIGNMENT,
        }
    }
}

/// Coarse pipeline state between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Ready,
}

/// Stage a frame was in when it was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Converting,
    Equalizing,
    Presenting,
}

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Presented {
        sequence: u64,
    },
    Dropped {
        sequence: u64,
        stage: Stage,
        error: FrameError,
    },
}

impl FrameOutcome {
    pub fn is_presented(&self) -> bool {
        matches!(self, Self::Presented { .. })
    }

    pub fn sequence(&self) -> u64 {
        match self {
            Self::Presented { sequence } | Self::Dropped { sequence, .. } => *sequence,
        }
    }
}

/// Running counters since the pipeline was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames: u64,
    pub presented: u64,
    pub dropped_conversion: u64,
    pub dropped_equalization: u64,
    pub dropped_presentation: u64,
    /// Times the context and destination buffer were (re)built
    pub context_builds: u64,
}

impl PipelineStats {
    pub fn dropped(&self) -> u64 {
        self.dropped_conversion + self.dropped_equalization + self.dropped_presentation
    }
}

/// State owned while `Ready`: everything sized for the current layout.
#[derive(Debug)]
struct Prepared {
    context: ConversionContext,
    destination: PixelBuffer,
}

/// The frame pipeline; owns every buffer it touches.
///
/// All methods run on the capture worker. The only data that leaves is the
/// [`RenderableImage`] copy handed to the presenter.
#[derive(Debug)]
pub struct FramePipeline {
    settings: PipelineSettings,
    prepared: Option<Prepared>,
    histogram: Histogram,
    histogram_valid: bool,
    equalizer: Equalizer,
    stats: PipelineStats,
    sequence: u64,
}

impl FramePipeline {
    /// Create an `Uninitialized` pipeline.
    ///
    /// Fails if the histogram bin count, destination format or color matrix
    /// cannot work.
    pub fn new(settings: PipelineSettings) -> Result<Self, FrameError> {
        if settings.destination.channel_layout().is_none() {
            return Err(EqualizationError::UnsupportedFormat(settings.destination).into());
        }
        YCbCrCoefficients::new(settings.conversion.matrix, settings.conversion.range)?;
        let histogram = Histogram::new(settings.histogram_bins)?;
        Ok(Self {
            settings,
            prepared: None,
            histogram,
            histogram_valid: false,
            equalizer: Equalizer::new(settings.alpha),
            stats: PipelineStats::default(),
            sequence: 0,
        })
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn state(&self) -> PipelineState {
        if self.prepared.is_some() {
            PipelineState::Ready
        } else {
            PipelineState::Uninitialized
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Key of the current conversion context, if `Ready`.
    pub fn context_key(&self) -> Option<ConversionKey> {
        self.prepared.as_ref().map(|p| p.context.key())
    }

    /// Diagnostic histogram of the most recent frame, if it got past
    /// conversion.
    pub fn histogram(&self) -> Option<&Histogram> {
        self.histogram_valid.then_some(&self.histogram)
    }

    /// Destination buffer holding the last processed frame, if `Ready`.
    pub fn output(&self) -> Option<&PixelBuffer> {
        self.prepared.as_ref().map(|p| &p.destination)
    }

    /// Make the pipeline `Ready` for `frame`'s layout.
    ///
    /// Returns `Ok(true)` when the context and buffer were (re)built and
    /// `Ok(false)` when the existing ones already fit. On failure the
    /// previous state is kept.
    pub fn prepare(&mut self, frame: &FrameView<'_>) -> Result<bool, ConversionError> {
        frame.validate()?;
        let key = ConversionKey::for_frame(frame, self.settings.destination);
        if self.context_key() == Some(key) {
            return Ok(false);
        }

        let context = ConversionContext::new(key, self.settings.conversion)?;
        let destination = context.allocate_destination(self.settings.row_alignment);
        match self.context_key() {
            Some(old) => log::info!(
                "Frame layout changed from {}x{} {} to {}x{} {}, rebuilding conversion context",
                old.width,
                old.height,
                old.source,
                key.width,
                key.height,
                key.source
            ),
            None => log::info!(
                "Conversion context ready: {}x{} {} -> {}",
                key.width,
                key.height,
                key.source,
                key.destination
            ),
        }
        self.prepared = Some(Prepared {
            context,
            destination,
        });
        self.histogram_valid = false;
        self.stats.context_builds += 1;
        Ok(true)
    }

    /// Convert, measure and equalize one frame into the destination buffer.
    ///
    /// On error the frame is abandoned and the stage it failed in is
    /// returned alongside the error.
    pub fn process(&mut self, frame: &FrameView<'_>) -> Result<&PixelBuffer, (Stage, FrameError)> {
        self.histogram_valid = false;
        self.prepare(frame)
            .map_err(|e| (Stage::Converting, FrameError::from(e)))?;
        let prepared = self
            .prepared
            .as_mut()
            .ok_or((Stage::Converting, FrameError::from(ConversionError::ContextMismatch)))?;

        prepared
            .context
            .convert(frame, &mut prepared.destination)
            .map_err(|e| (Stage::Converting, FrameError::from(e)))?;

        self.histogram.clear();
        self.histogram
            .accumulate(&prepared.destination)
            .map_err(|e| (Stage::Equalizing, FrameError::from(e)))?;
        self.histogram_valid = true;
        if log::log_enabled!(log::Level::Trace) {
            for (index, name) in CHANNEL_NAMES.iter().enumerate() {
                log::trace!("{} {:?}", name, self.histogram.channel(index));
            }
        }

        self.equalizer
            .equalize(&mut prepared.destination)
            .map_err(|e| (Stage::Equalizing, FrameError::from(e)))?;
        Ok(&prepared.destination)
    }

    /// Run one frame through every stage and hand the result to `presenter`.
    ///
    /// Never fails: errors are logged, counted and reported in the outcome.
    pub fn run_frame<P>(&mut self, frame: &FrameView<'_>, presenter: &mut P) -> FrameOutcome
    where
        P: Presenter + ?Sized,
    {
        let started = Instant::now();
        self.sequence += 1;
        self.stats.frames += 1;
        let sequence = self.sequence;

        let snapshot = self
            .process(frame)
            .map(|buffer| RenderableImage::snapshot(buffer, sequence));
        let result = snapshot.and_then(|image| {
            presenter
                .present(image)
                .map_err(|e| (Stage::Presenting, FrameError::from(e)))
        });

        match result {
            Ok(()) => {
                self.stats.presented += 1;
                log::debug!("Frame {} presented in {:?}", sequence, started.elapsed());
                FrameOutcome::Presented { sequence }
            }
            Err((stage, error)) => {
                self.record_drop(sequence, stage, &error);
                FrameOutcome::Dropped {
                    sequence,
                    stage,
                    error,
                }
            }
        }
    }

    fn record_drop(&mut self, sequence: u64, stage: Stage, error: &FrameError) {
        match stage {
            Stage::Converting => self.stats.dropped_conversion += 1,
            Stage::Equalizing => self.stats.dropped_equalization += 1,
            Stage::Presenting => self.stats.dropped_presentation += 1,
        }
        match error {
            FrameError::Presentation(PresentationError::Busy) => {
                log::debug!("Frame {} dropped: presenter busy", sequence)
            }
            FrameError::Presentation(e) => log::debug!("Frame {} dropped: {}", sequence, e),
            e => log::warn!("Frame {} dropped: {}", sequence, e),
        }
    }
}
