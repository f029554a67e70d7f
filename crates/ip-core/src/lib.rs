//! Shared types, traits, and configuration for the image player.
//!
//! Every other crate of the workspace builds on the `Bitmap` value type,
//! the pixel-format conversion table, and the sink/decoder traits defined here.

pub mod bitmap;
pub mod config;
pub mod error;
pub mod frame;
pub mod pixel;
pub mod status;
pub mod traits;

pub use bitmap::Bitmap;
pub use config::PlayerConfig;
pub use error::{CoreError, DecodeError, SinkError};
pub use frame::{CropRect, FrameInfo, LayerFormat, SurfaceTarget};
pub use pixel::{AlphaType, PixelFormat, Rgba};
pub use status::ResultCode;
