//! Configuration file handling for frame-equalizer.
//!
//! Loads configuration from `<config dir>/frame-equalizer/config.toml` or a
//! custom path. Every key is optional; command-line flags override the file
//! and the file overrides built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::convert::{ColorMatrix, ColorRange, ConversionOptions};
use crate::equalize::AlphaPolicy;
use crate::frame::{PixelFormat, DEFAULT_ROW_ALIGNMENT};
use crate::histogram::{DEFAULT_BINS, MAX_BINS};
use crate::pipeline::PipelineSettings;
use crate::source::{Resolution, SourceSettings};

/// Template written by `config init`.
pub const DEFAULT_CONFIG: &str = r#"# frame-equalizer configuration

[histogram]
# Bins per channel for the diagnostic histogram (1-256)
bins = 32

[equalize]
# Alpha handling: preserve, remap
alpha = "preserve"

[output]
# Presented pixel layout: rgba, bgra, argb
format = "rgba"
# Row alignment of the output buffer in bytes
row_alignment = 16

[color]
# YCbCr matrix: bt601, bt709
matrix = "bt601"
# YCbCr range: video, full
range = "video"
# Custom luma weights (override matrix when both are set)
# kr = 0.299
# kb = 0.114

[camera]
# Camera device index
device = 0
width = 640
height = 480
fps = 30
"#;

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub histogram: HistogramConfig,
    #[serde(default)]
    pub equalize: EqualizeConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub color: ColorConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramConfig {
    pub bins: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EqualizeConfig {
    pub alpha: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: Option<String>,
    pub row_alignment: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorConfig {
    pub matrix: Option<String>,
    pub range: Option<String>,
    pub kr: Option<f32>,
    pub kb: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub device: u32,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
}

/// Errors that can occur when loading or resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to write config file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config file already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// Returns the default config if the file doesn't exist and an error if
    /// it exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        let config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolve the file's values, falling back to built-in defaults.
    pub fn pipeline_settings(&self) -> Result<PipelineSettings, ConfigError> {
        let bins = self.histogram.bins.unwrap_or(DEFAULT_BINS);
        if bins == 0 || bins > MAX_BINS {
            return Err(invalid("histogram.bins", bins));
        }
        let alpha = match &self.equalize.alpha {
            Some(s) => AlphaPolicy::from_str(s).ok_or_else(|| invalid("equalize.alpha", s))?,
            None => AlphaPolicy::default(),
        };
        let destination = match &self.output.format {
            Some(s) => PixelFormat::from_str(s)
                .filter(|f| f.channel_layout().is_some())
                .ok_or_else(|| invalid("output.format", s))?,
            None => PixelFormat::Rgba8,
        };
        Ok(PipelineSettings {
            destination,
            conversion: self.conversion_options()?,
            histogram_bins: bins,
            alpha,
            row_alignment: self.output.row_alignment.unwrap_or(DEFAULT_ROW_ALIGNMENT),
        })
    }

    fn conversion_options(&self) -> Result<ConversionOptions, ConfigError> {
        let matrix = match (&self.color.matrix, self.color.kr, self.color.kb) {
            (_, Some(kr), Some(kb)) => ColorMatrix::Custom { kr, kb },
            // A custom matrix needs both weights
            (_, Some(kr), None) => return Err(invalid("color.kr", kr)),
            (_, None, Some(kb)) => return Err(invalid("color.kb", kb)),
            (Some(s), _, _) => ColorMatrix::from_str(s).ok_or_else(|| invalid("color.matrix", s))?,
            (None, _, _) => ColorMatrix::default(),
        };
        let range = match &self.color.range {
            Some(s) => ColorRange::from_str(s).ok_or_else(|| invalid("color.range", s))?,
            None => ColorRange::default(),
        };
        Ok(ConversionOptions { matrix, range })
    }

    /// Camera settings from the `[camera]` section.
    pub fn source_settings(&self) -> SourceSettings {
        let defaults = SourceSettings::default();
        SourceSettings {
            device_index: self.camera.device,
            resolution: Resolution::new(
                self.camera.width.unwrap_or(defaults.resolution.width),
                self.camera.height.unwrap_or(defaults.resolution.height),
            ),
            fps: self.camera.fps.unwrap_or(defaults.fps),
        }
    }
}

/// Write [`DEFAULT_CONFIG`] to `path`, creating parent directories.
///
/// Refuses to overwrite an existing file.
pub fn write_default(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    let write_err = |e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, DEFAULT_CONFIG).map_err(write_err)
}

fn invalid(key: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("frame-equalizer").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/frame-equalizer/config.toml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.pipeline_settings().unwrap(), PipelineSettings::default());
    }

    #[test]
    fn test_default_template_parses_to_defaults() {
        let file = write_config(DEFAULT_CONFIG);
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.pipeline_settings().unwrap(), PipelineSettings::default());
        let source = config.source_settings();
        assert_eq!(source.resolution, Resolution::new(640, 480));
        assert_eq!(source.fps, 30);
    }

    #[test]
    fn test_partial_file() {
        let file = write_config("[histogram]\nbins = 64\n\n[equalize]\nalpha = \"remap\"\n");
        let settings = Config::load(Some(file.path())).unwrap().pipeline_settings().unwrap();
        assert_eq!(settings.histogram_bins, 64);
        assert_eq!(settings.alpha, AlphaPolicy::Remap);
        assert_eq!(settings.destination, PixelFormat::Rgba8);
    }

    #[test]
    fn test_custom_matrix_weights() {
        let file = write_config("[color]\nkr = 0.25\nkb = 0.1\nrange = \"full\"\n");
        let settings = Config::load(Some(file.path())).unwrap().pipeline_settings().unwrap();
        assert_eq!(settings.conversion.matrix, ColorMatrix::Custom { kr: 0.25, kb: 0.1 });
        assert_eq!(settings.conversion.range, ColorRange::Full);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let config = Config {
            output: OutputConfig {
                format: Some("nv12".to_string()),
                row_alignment: None,
            },
            ..Config::default()
        };
        assert!(matches!(
            config.pipeline_settings(),
            Err(ConfigError::InvalidValue { key: "output.format", .. })
        ));

        let config = Config {
            histogram: HistogramConfig { bins: Some(0) },
            ..Config::default()
        };
        assert!(matches!(
            config.pipeline_settings(),
            Err(ConfigError::InvalidValue { key: "histogram.bins", .. })
        ));
    }

    #[test]
    fn test_lone_custom_weight_is_reported() {
        let file = write_config("[color]\nkr = 0.3\n");
        let config = Config::load(Some(file.path())).unwrap();
        assert!(matches!(
            config.pipeline_settings(),
            Err(ConfigError::InvalidValue { key: "color.kr", .. })
        ));

        let file = write_config("[color]\nmatrix = \"bt709\"\nkb = 0.1\n");
        let config = Config::load(Some(file.path())).unwrap();
        assert!(matches!(
            config.pipeline_settings(),
            Err(ConfigError::InvalidValue { key: "color.kb", .. })
        ));
    }

    #[test]
    fn test_parse_error_names_path() {
        let file = write_config("[histogram\nbins = ");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        write_default(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
        assert!(matches!(
            write_default(&path),
            Err(ConfigError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_default_path_ends_with_app_dir() {
        let path = default_path();
        assert!(path.ends_with("frame-equalizer/config.toml"));
    }
}
