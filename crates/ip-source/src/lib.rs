//! Image sources for the player: URIs, descriptors, memory buffers,
//! and the `image`-backed decoder.

pub mod codec;
pub mod error;
pub mod loader;
pub mod movie;
pub mod uri;

pub use codec::ImageCodec;
pub use error::SourceError;
pub use loader::{Loaded, Loader, Probe, apply_initial};
pub use movie::Movie;
pub use uri::{DataSource, MediaKind, RemoteFetcher};
