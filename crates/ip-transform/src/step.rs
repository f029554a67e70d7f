use ip_core::{Bitmap, SurfaceTarget};

use crate::error::TransformError;
use crate::fit::{Fitted, Placement, scale_and_crop};

/// Largest cumulative magnification.
pub const MAX_SCALE: f32 = 16.0;

/// Magnification of a single step.
const STEP_FACTOR: f32 = 2.0;

/// Number of ×2 steps for the factors that are never done in one pass.
fn doublings(factor: f32) -> Option<u32> {
    [(4.0, 2), (8.0, 3), (16.0, 4)]
        .into_iter()
        .find(|&(f, _)| f == factor)
        .map(|(_, n)| n)
}

/// Validate a uniform scale factor against `(0, 16]`.
///
/// # Errors
/// `InvalidScale` when not finite or not positive, `ScaleOutOfRange` above 16.
pub fn check_scale(factor: f32) -> Result<(), TransformError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(TransformError::InvalidScale(factor));
    }
    if factor > MAX_SCALE {
        return Err(TransformError::ScaleOutOfRange(factor));
    }
    Ok(())
}

/// Scale `src` uniformly by `factor`, then apply the surface policy.
///
/// ×4, ×8 and ×16 run as repeated ×2 passes, each cropped to the surface,
/// each intermediate dropped as soon as the next one exists. Other factors
/// run in one pass. `placement` only applies to the last pass.
///
/// # Errors
/// See [`check_scale`]; resampling or allocation failure.
///
/// # Example
/// ```
/// use ip_core::{AlphaType, Bitmap, SurfaceTarget};
/// use ip_transform::{Placement, scale_step};
/// let src = Bitmap::from_rgba8(10, 6, AlphaType::Premul, vec![255; 240]).unwrap();
/// let out = scale_step(&src, 8.0, SurfaceTarget::default(), Placement::Center).unwrap();
/// assert_eq!(out.bitmap.dimensions(), (80, 48));
/// ```
pub fn scale_step(
    src: &Bitmap,
    factor: f32,
    surface: SurfaceTarget,
    placement: Placement,
) -> Result<Fitted, TransformError> {
    check_scale(factor)?;

    let Some(steps) = doublings(factor) else {
        if factor > STEP_FACTOR {
            log::warn!("scale_step: ×{factor} en une passe, mémoire transitoire élevée");
        }
        return scale_and_crop(src, factor, factor, surface, placement);
    };

    log::debug!(
        "scale_step: {}×{} ×{factor} en {steps} passes",
        src.width(),
        src.height()
    );
    let mut current = scale_and_crop(src, STEP_FACTOR, STEP_FACTOR, surface, Placement::Center)?.bitmap;
    for _ in 1..steps - 1 {
        current = scale_and_crop(&current, STEP_FACTOR, STEP_FACTOR, surface, Placement::Center)?.bitmap;
    }
    scale_and_crop(&current, STEP_FACTOR, STEP_FACTOR, surface, placement)
}
