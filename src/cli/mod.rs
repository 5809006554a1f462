//! Command-line interface definitions and helpers.
//!
//! This module contains CLI argument parsing, value parsers, subcommand
//! handlers and the `run` driver.

mod args;
mod commands;
mod enums;
mod run;

pub use args::{Args, Command, ConfigAction, RunArgs};
pub use commands::{handle_config_action, list_devices};
pub use enums::SourceKind;
pub use run::{run, RunError, RunSummary};
