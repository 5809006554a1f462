//! Frame memory: pixel format tags, borrowed frame views and owned buffers.
//!
//! - [`PixelFormat`] describes plane geometry and channel order
//! - [`FrameView`] is what a source hands over for one synchronous call
//! - [`PixelBuffer`] is reusable storage owned by the pipeline

mod buffer;
mod format;
mod view;

pub use buffer::{PixelBuffer, DEFAULT_ROW_ALIGNMENT};
pub use format::{ChannelLayout, PixelFormat, MAX_PLANES};
pub use view::{FrameView, Plane};
