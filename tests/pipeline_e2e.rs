//! End-to-end tests for the frame pipeline state machine.
//!
//! Frames come from the synthetic source and go through a real
//! presentation channel, the same wiring the `run` command uses.

use frame_equalizer::error::{ConversionError, FrameError, PresentationError};
use frame_equalizer::frame::{FrameView, PixelFormat};
use frame_equalizer::pipeline::{FrameOutcome, FramePipeline, PipelineSettings, PipelineState, Stage};
use frame_equalizer::present::{self, Presenter, RenderableImage};
use frame_equalizer::source::{FrameSource, SyntheticSource};

/// Pull one frame from `source` through `pipeline`.
fn step(source: &mut SyntheticSource, pipeline: &mut FramePipeline, presenter: &mut dyn Presenter) -> FrameOutcome {
    let mut outcome = None;
    source
        .next_frame(&mut |frame| outcome = Some(pipeline.run_frame(frame, &mut *presenter)))
        .unwrap();
    outcome.unwrap()
}

#[test]
fn test_initializes_once_for_a_steady_stream() {
    let mut source = SyntheticSource::new(32, 16).unwrap();
    let mut pipeline = FramePipeline::new(PipelineSettings::default()).unwrap();
    let (mut presenter, receiver) = present::channel();
    assert_eq!(pipeline.state(), PipelineState::Uninitialized);

    for _ in 0..5 {
        let outcome = step(&mut source, &mut pipeline, &mut presenter);
        assert!(outcome.is_presented());
        assert_eq!(pipeline.state(), PipelineState::Ready);
        let image = receiver.try_recv().unwrap().unwrap();
        assert_eq!(image.sequence, outcome.sequence());
        assert_eq!((image.width, image.height), (32, 16));
        assert_eq!(image.format, PixelFormat::Rgba8);
    }
    assert_eq!(pipeline.stats().context_builds, 1);
    assert_eq!(pipeline.stats().presented, 5);
}

#[test]
fn test_resolution_change_rebuilds_context_and_buffer() {
    let mut source = SyntheticSource::new(16, 8).unwrap();
    let mut pipeline = FramePipeline::new(PipelineSettings::default()).unwrap();
    let mut sink = |_: RenderableImage| Ok::<(), PresentationError>(());

    step(&mut source, &mut pipeline, &mut sink);
    source.resize(24, 12).unwrap();
    step(&mut source, &mut pipeline, &mut sink);
    step(&mut source, &mut pipeline, &mut sink);

    assert_eq!(pipeline.stats().context_builds, 2);
    let output = pipeline.output().unwrap();
    assert_eq!((output.width(), output.height()), (24, 12));
}

#[test]
fn test_busy_surface_drops_frames_without_blocking() {
    let mut source = SyntheticSource::new(16, 8).unwrap();
    let mut pipeline = FramePipeline::new(PipelineSettings::default()).unwrap();
    let (mut presenter, receiver) = present::channel();

    assert!(step(&mut source, &mut pipeline, &mut presenter).is_presented());
    for _ in 0..3 {
        let outcome = step(&mut source, &mut pipeline, &mut presenter);
        assert!(matches!(
            outcome,
            FrameOutcome::Dropped {
                stage: Stage::Presenting,
                error: FrameError::Presentation(PresentationError::Busy),
                ..
            }
        ));
        assert_eq!(pipeline.state(), PipelineState::Ready);
    }
    assert_eq!(pipeline.stats().dropped_presentation, 3);

    // The surface sees the first frame, then the next one gets through
    assert_eq!(receiver.try_recv().unwrap().unwrap().sequence, 1);
    assert!(step(&mut source, &mut pipeline, &mut presenter).is_presented());
    assert_eq!(receiver.try_recv().unwrap().unwrap().sequence, 5);
}

#[test]
fn test_presented_image_is_a_snapshot() {
    let mut source = SyntheticSource::new(16, 8).unwrap();
    let mut pipeline = FramePipeline::new(PipelineSettings::default()).unwrap();
    let (mut presenter, receiver) = present::channel();

    step(&mut source, &mut pipeline, &mut presenter);
    let first = pipeline.output().unwrap().plane(0).to_vec();
    // Busy: the pipeline rewrites its buffer with the next frame anyway
    step(&mut source, &mut pipeline, &mut presenter);
    assert_ne!(pipeline.output().unwrap().plane(0), &first[..]);

    let image = receiver.try_recv().unwrap().unwrap();
    assert_eq!(image.data, first);
}

#[test]
fn test_malformed_frame_is_dropped_and_stream_continues() {
    let mut source = SyntheticSource::new(8, 4).unwrap();
    let mut pipeline = FramePipeline::new(PipelineSettings::default()).unwrap();
    let mut sink = |_: RenderableImage| Ok::<(), PresentationError>(());
    step(&mut source, &mut pipeline, &mut sink);

    let luma = [0u8; 32];
    let bad = FrameView::packed(PixelFormat::Nv12, 8, 4, &luma, 8);
    let outcome = pipeline.run_frame(&bad, &mut sink);
    assert!(matches!(
        outcome,
        FrameOutcome::Dropped {
            stage: Stage::Converting,
            error: FrameError::Conversion(ConversionError::PlaneCount { .. }),
            ..
        }
    ));
    assert_eq!(pipeline.state(), PipelineState::Ready);
    assert!(pipeline.histogram().is_none());

    assert!(step(&mut source, &mut pipeline, &mut sink).is_presented());
    assert_eq!(pipeline.stats().context_builds, 1);
    assert_eq!(pipeline.stats().dropped_conversion, 1);
    assert_eq!(pipeline.stats().frames, 3);
}

#[test]
fn test_every_source_format_reaches_the_surface() {
    for format in [
        PixelFormat::Nv12,
        PixelFormat::I420,
        PixelFormat::Yuyv,
        PixelFormat::Rgb8,
        PixelFormat::Argb8,
    ] {
        let mut source =
            SyntheticSource::with_format(format, 12, 6, Default::default()).unwrap();
        let settings = PipelineSettings {
            destination: PixelFormat::Bgra8,
            ..PipelineSettings::default()
        };
        let mut pipeline = FramePipeline::new(settings).unwrap();
        let (mut presenter, receiver) = present::channel();
        assert!(step(&mut source, &mut pipeline, &mut presenter).is_presented(), "{format}");
        let image = receiver.try_recv().unwrap().unwrap();
        assert_eq!(image.format, PixelFormat::Bgra8);
        // Equalization stretches the low-contrast pattern
        let values: Vec<u8> = (0..12).map(|x| image.rgba_at(x, 0).unwrap()[0]).collect();
        assert!(values.iter().any(|&v| v < 64), "{format}: {values:?}");
        assert!(values.iter().any(|&v| v > 191), "{format}: {values:?}");
    }
}

#[test]
fn test_histogram_tracks_the_latest_frame() {
    let mut source = SyntheticSource::new(16, 8).unwrap();
    let settings = PipelineSettings {
        histogram_bins: 8,
        ..PipelineSettings::default()
    };
    let mut pipeline = FramePipeline::new(settings).unwrap();
    let mut sink = |_: RenderableImage| Ok::<(), PresentationError>(());
    step(&mut source, &mut pipeline, &mut sink);

    let histogram = pipeline.histogram().unwrap();
    assert_eq!(histogram.bins(), 8);
    assert_eq!(histogram.total(), 128);
    // The synthetic pattern is opaque
    assert_eq!(histogram.alpha()[7], 128);
}
