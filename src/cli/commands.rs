//! Subcommand handlers for list-devices and config actions.

use std::io::{self, Write};
use std::path::Path;

use super::args::ConfigAction;
use crate::config::{self, Config, ConfigError};
use crate::error::AcquisitionError;
use crate::source::{self, DeviceInfo};

/// List available cameras and print them to `out`.
pub fn list_devices(out: &mut impl Write) -> Result<(), AcquisitionError> {
    let devices = source::list_devices()?;
    if let Err(e) = print_devices(out, &devices) {
        log::warn!("Failed to print device list: {}", e);
    }
    Ok(())
}

fn print_devices(out: &mut impl Write, devices: &[DeviceInfo]) -> io::Result<()> {
    if devices.is_empty() {
        writeln!(out, "No cameras found.")?;
        writeln!(out)?;
        writeln!(out, "Make sure your camera is connected and permissions are granted.")?;
        return Ok(());
    }
    writeln!(out, "Available cameras:")?;
    for device in devices {
        writeln!(out, "  {}", device)?;
    }
    writeln!(out)?;
    writeln!(out, "Use `run --source camera --device <index>` to select a camera.")
}

/// Handle config subcommand actions.
///
/// `path` overrides the default config location.
pub fn handle_config_action(
    action: ConfigAction,
    path: Option<&Path>,
    out: &mut impl Write,
) -> Result<(), ConfigError> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(config::default_path);
    match action {
        ConfigAction::Show => {
            let config = Config::load(Some(config_path.as_path()))?;
            let settings = config.pipeline_settings()?;
            let camera = config.source_settings();
            let lines = [
                "Current configuration:".to_string(),
                format!("  Histogram bins: {}", settings.histogram_bins),
                format!("  Alpha: {:?}", settings.alpha),
                format!("  Output format: {}", settings.destination),
                format!("  Row alignment: {}", settings.row_alignment),
                format!("  Color matrix: {:?}", settings.conversion.matrix),
                format!("  Color range: {:?}", settings.conversion.range),
                format!(
                    "  Camera: {} at {} @ {}fps",
                    camera.device_index, camera.resolution, camera.fps
                ),
                String::new(),
                format!(
                    "Config file: {} ({})",
                    config_path.display(),
                    if config_path.exists() { "exists" } else { "not found" }
                ),
            ];
            for line in lines {
                if let Err(e) = writeln!(out, "{}", line) {
                    log::warn!("Failed to print configuration: {}", e);
                    break;
                }
            }
            Ok(())
        }
        ConfigAction::Init => {
            config::write_default(&config_path)?;
            log::info!("Created config file: {}", config_path.display());
            if let Err(e) = writeln!(out, "Created config file: {}", config_path.display()) {
                log::warn!("Failed to print config path: {}", e);
            }
            Ok(())
        }
    }
}
