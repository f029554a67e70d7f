//! Session boundary of the image player.
//!
//! [`Session`] holds the explicit per-image state and answers every command
//! with a [`ip_core::ResultCode`]; [`ImagePlayer`] wraps it in a mutex and
//! runs animations on a worker thread.

pub mod dump;
pub mod error;
pub mod player;
pub mod session;
pub mod worker;

pub use dump::{DumpReport, MovieReport};
pub use error::PlayerError;
pub use player::ImagePlayer;
pub use session::{MoviePlayback, Session};
pub use worker::{MovieCommand, MovieWorker};
