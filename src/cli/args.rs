//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{
    parse_alpha, parse_bins, parse_matrix, parse_output_format, parse_range, parse_source_format,
    SourceKind,
};
use crate::config::{Config, ConfigError};
use crate::convert::{ColorMatrix, ColorRange};
use crate::equalize::AlphaPolicy;
use crate::frame::PixelFormat;
use crate::pipeline::PipelineSettings;
use crate::source::SourceSettings;

/// Converts camera frames, measures their histograms and equalizes them
#[derive(Parser, Debug)]
#[command(name = "frame-equalizer")]
#[command(version, about = "Camera frame conversion and histogram equalization", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Process frames from a source
    Run(RunArgs),
    /// List available cameras
    ListDevices,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

/// Options for the `run` subcommand. Unset options fall back to the config
/// file, then to built-in defaults.
#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Frame source
    #[arg(long, default_value = "synthetic")]
    pub source: SourceKind,

    /// Stop after this many frames (default: until Ctrl+C)
    #[arg(long, short = 'n')]
    pub frames: Option<u64>,

    /// Frame width (requested from the camera, exact for synthetic frames)
    #[arg(long)]
    pub width: Option<u32>,

    /// Frame height
    #[arg(long)]
    pub height: Option<u32>,

    /// Camera device index (from list-devices)
    #[arg(long)]
    pub device: Option<u32>,

    /// Requested camera frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Pixel format of synthetic frames
    #[arg(long, default_value = "nv12", value_parser = parse_source_format)]
    pub source_format: PixelFormat,

    /// Histogram bins per channel (1-256)
    #[arg(long, value_parser = parse_bins)]
    pub bins: Option<usize>,

    /// Alpha handling: preserve, remap
    #[arg(long, value_parser = parse_alpha)]
    pub alpha: Option<AlphaPolicy>,

    /// Output pixel layout: rgba, bgra, argb
    #[arg(long, value_parser = parse_output_format)]
    pub format: Option<PixelFormat>,

    /// YCbCr matrix: bt601, bt709
    #[arg(long, value_parser = parse_matrix)]
    pub matrix: Option<ColorMatrix>,

    /// YCbCr range: video, full
    #[arg(long, value_parser = parse_range)]
    pub range: Option<ColorRange>,

    /// Print each frame's histogram as a JSON line on stdout
    #[arg(long)]
    pub histogram: bool,

    /// Write the last presented frame to this path as PPM
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

impl RunArgs {
    /// Pipeline settings with command-line overrides applied to `config`.
    pub fn pipeline_settings(&self, config: &Config) -> Result<PipelineSettings, ConfigError> {
        let mut settings = config.pipeline_settings()?;
        if let Some(bins) = self.bins {
            settings.histogram_bins = bins;
        }
        if let Some(alpha) = self.alpha {
            settings.alpha = alpha;
        }
        if let Some(format) = self.format {
            settings.destination = format;
        }
        if let Some(matrix) = self.matrix {
            settings.conversion.matrix = matrix;
        }
        if let Some(range) = self.range {
            settings.conversion.range = range;
        }
        Ok(settings)
    }

    /// Camera settings with command-line overrides applied to `config`.
    pub fn source_settings(&self, config: &Config) -> SourceSettings {
        let mut settings = config.source_settings();
        if let Some(device) = self.device {
            settings.device_index = device;
        }
        if let Some(width) = self.width {
            settings.resolution.width = width;
        }
        if let Some(height) = self.height {
            settings.resolution.height = height;
        }
        if let Some(fps) = self.fps {
            settings.fps = fps;
        }
        settings
    }
}
