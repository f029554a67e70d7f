//! Render side of the image player.
//!
//! `layout` converts bitmaps to the video layer formats, `sink` holds the
//! frame sinks (device node, PNG directory, memory), `zoom` the hardware
//! zoom channel, and `dispatcher` ties them together.

pub mod dispatcher;
pub mod error;
pub mod layout;
pub mod sink;
pub mod zoom;

pub use dispatcher::{Dispatcher, ZoomOutcome};
pub use error::RenderError;
pub use layout::{Converted, convert};
pub use sink::{DeviceSink, DirectorySink, MemorySink, RecordedFrame, SinkLog};
pub use zoom::{MemoryZoom, SysfsZoom, ZoomLog};
