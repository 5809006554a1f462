//! frame-equalizer library crate.
//!
//! Converts raw camera frames to packed RGBA, accumulates per-channel
//! histograms and equalizes each frame before handing an owned snapshot to a
//! presentation surface. The binary in `main.rs` wires these components to a
//! frame source and the command line; integration tests use them directly.

pub mod cli;
pub mod config;
pub mod convert;
pub mod equalize;
pub mod error;
pub mod frame;
pub mod histogram;
pub mod pipeline;
pub mod present;
pub mod source;
