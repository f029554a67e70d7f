//! Pure bitmap transforms for the image player.
//!
//! Leaf-first: `geometry` (scale, rotate, crops), `fit` (surface policy),
//! `step` (bounded large-factor scaling), `state` (incremental rotate,
//! scale and pan state machine).

pub mod error;
pub mod fit;
pub mod geometry;
pub mod resample;
pub mod state;
pub mod step;

pub use error::TransformError;
pub use fit::{Edges, Fitted, PanReport, Placement, fill_surface, scale_and_crop};
pub use state::{PanDirection, ScaleDirection, TransformState, Update};
pub use step::scale_step;
