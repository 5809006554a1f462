use clap::Parser;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use frame_equalizer::cli::{self, Args, Command, ConfigAction};
use frame_equalizer::config::Config;

/// Install the log subscriber. `RUST_LOG` overrides the default level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Also bridges `log` records from the library
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Raise `stop` on Ctrl+C so the capture loop can finish cleanly.
fn setup_ctrlc_handler(stop: Arc<AtomicBool>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, shutting down...");
    })
}

/// Load the config file. An explicitly named file must exist.
fn load_config(args: &Args) -> Config {
    if let Some(path) = &args.config {
        if !path.exists() {
            eprintln!("Error: config file not found: {}", path.display());
            std::process::exit(1);
        }
    }
    match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &args.command {
        Command::ListDevices => {
            if let Err(e) = cli::list_devices(&mut out) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Command::Config { action } => {
            let path = match action {
                ConfigAction::Init => args.config.as_deref(),
                ConfigAction::Show => {
                    load_config(&args);
                    args.config.as_deref()
                }
            };
            if let Err(e) = cli::handle_config_action(action.clone(), path, &mut out) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Command::Run(run_args) => {
            let config = load_config(&args);
            let stop = Arc::new(AtomicBool::new(false));
            if let Err(e) = setup_ctrlc_handler(stop.clone()) {
                log::warn!("Could not install Ctrl+C handler: {}", e);
            }

            match cli::run(run_args, &config, stop, &mut out) {
                Ok(summary) => {
                    let _ = out.flush();
                    let stats = summary.stats;
                    eprintln!(
                        "Processed {} frames: {} presented ({} displayed), {} dropped ({} conversion, {} equalization, {} presentation)",
                        stats.frames,
                        stats.presented,
                        summary.received,
                        stats.dropped(),
                        stats.dropped_conversion,
                        stats.dropped_equalization,
                        stats.dropped_presentation
                    );
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
