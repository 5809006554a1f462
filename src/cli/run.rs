//! The `run` subcommand: capture worker plus presentation loop.
//!
//! The source and pipeline live on a dedicated capture thread. The calling
//! thread plays the display surface: it receives presented images over the
//! single-slot channel, keeps the latest one and prints histogram lines.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::args::RunArgs;
use super::enums::SourceKind;
use crate::config::{Config, ConfigError};
use crate::convert::ConversionOptions;
use crate::error::{AcquisitionError, FrameError, PresentationError};
use crate::frame::PixelFormat;
use crate::histogram::Histogram;
use crate::pipeline::{FramePipeline, PipelineStats};
use crate::present::{self, RenderableImage};
use crate::source::{self, FrameSource, SourceSettings, SyntheticSource};

/// How long the presentation loop waits before checking on the worker.
const PRESENT_POLL: Duration = Duration::from_millis(50);

/// Errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid pipeline settings: {0}")]
    Settings(#[from] FrameError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error("Failed to write snapshot '{}': {source}", path.display())]
    Snapshot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No frame was presented, nothing to write to '{}'", path.display())]
    NothingToSnapshot { path: PathBuf },

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Failed to encode histogram: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Capture thread panicked")]
    WorkerPanicked,
}

/// One line of `--histogram` output.
#[derive(Debug, Serialize)]
struct HistogramLine {
    sequence: u64,
    presented: bool,
    histogram: Histogram,
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub stats: PipelineStats,
    /// Images the presentation side actually picked up
    pub received: u64,
    pub last_image: Option<RenderableImage>,
}

/// Process frames until the source ends, the frame limit is hit or `stop`
/// is raised.
///
/// Histogram lines go to `out`; diagnostics go through `log`.
pub fn run(
    args: &RunArgs,
    config: &Config,
    stop: Arc<AtomicBool>,
    out: &mut impl Write,
) -> Result<RunSummary, RunError> {
    let settings = args.pipeline_settings(config)?;
    let pipeline = FramePipeline::new(settings)?;
    let plan = SourcePlan {
        kind: args.source,
        format: args.source_format,
        conversion: settings.conversion,
        camera: args.source_settings(config),
    };

    let (presenter, receiver) = present::channel();
    let (histogram_tx, histogram_rx) = mpsc::channel::<HistogramLine>();
    let histogram_tx = args.histogram.then_some(histogram_tx);
    let limit = args.frames;

    let worker = thread::Builder::new()
        .name("capture".to_string())
        .spawn(move || capture(plan, pipeline, presenter, histogram_tx, limit, stop))
        .map_err(|e| AcquisitionError::StreamFailed(e.to_string()))?;

    let mut received = 0;
    let mut last_image = None;
    loop {
        let next = receiver.recv_timeout(PRESENT_POLL);
        for line in histogram_rx.try_iter() {
            serde_json::to_writer(&mut *out, &line)?;
            writeln!(out)?;
        }
        match next {
            Ok(Some(image)) => {
                received += 1;
                log::debug!(
                    "Displaying frame {} ({}x{}, mean {:.1})",
                    image.sequence,
                    image.width,
                    image.height,
                    image.mean_intensity()
                );
                last_image = Some(image);
            }
            Ok(None) => {}
            Err(PresentationError::Disconnected) | Err(PresentationError::Busy) => break,
        }
    }
    // Lines sent after the last image
    for line in histogram_rx.try_iter() {
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
    }

    let stats = worker.join().map_err(|_| RunError::WorkerPanicked)??;

    if let Some(path) = &args.snapshot {
        write_snapshot(path, last_image.as_ref())?;
        log::info!("Wrote snapshot to {}", path.display());
    }

    Ok(RunSummary {
        stats,
        received,
        last_image,
    })
}

/// Everything the worker needs to open its source.
#[derive(Debug, Clone)]
struct SourcePlan {
    kind: SourceKind,
    format: PixelFormat,
    conversion: ConversionOptions,
    camera: SourceSettings,
}

impl SourcePlan {
    fn open(&self) -> Result<Box<dyn FrameSource>, AcquisitionError> {
        match self.kind {
            SourceKind::Synthetic => {
                let source = SyntheticSource::with_format(
                    self.format,
                    self.camera.resolution.width as usize,
                    self.camera.resolution.height as usize,
                    self.conversion,
                )?;
                Ok(Box::new(source))
            }
            SourceKind::Camera => source::open_camera(&self.camera),
        }
    }
}

/// Body of the capture thread.
fn capture(
    plan: SourcePlan,
    mut pipeline: FramePipeline,
    mut presenter: present::ChannelPresenter,
    histograms: Option<mpsc::Sender<HistogramLine>>,
    limit: Option<u64>,
    stop: Arc<AtomicBool>,
) -> Result<PipelineStats, AcquisitionError> {
    let mut source = plan.open()?;
    log::info!(
        "Capturing from {} into {}",
        source.describe(),
        pipeline.settings().destination
    );

    while !stop.load(Ordering::Relaxed) {
        if limit.is_some_and(|n| pipeline.stats().frames >= n) {
            break;
        }
        let more = source.next_frame(&mut |frame| {
            let outcome = pipeline.run_frame(frame, &mut presenter);
            if let (Some(tx), Some(histogram)) = (&histograms, pipeline.histogram()) {
                let line = HistogramLine {
                    sequence: outcome.sequence(),
                    presented: outcome.is_presented(),
                    histogram: histogram.clone(),
                };
                // Receiver gone means the run is already ending
                let _ = tx.send(line);
            }
        })?;
        if !more {
            break;
        }
    }

    let stats = *pipeline.stats();
    log::info!(
        "Capture stopped after {} frames: {} presented, {} dropped",
        stats.frames,
        stats.presented,
        stats.dropped()
    );
    Ok(stats)
}

fn write_snapshot(path: &Path, image: Option<&RenderableImage>) -> Result<(), RunError> {
    let ppm = image
        .and_then(present::encode_ppm)
        .ok_or_else(|| RunError::NothingToSnapshot {
            path: path.to_path_buf(),
        })?;
    std::fs::write(path, ppm).map_err(|e| RunError::Snapshot {
        path: path.to_path_buf(),
        source: e,
    })
}
