use ip_core::{Bitmap, SurfaceTarget};

use crate::error::TransformError;
use crate::geometry::{crop_and_fill, pan_axis, scale, scale_to, translate_crop_fill};

/// Where the surface window sits on a bitmap larger than the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Placement {
    /// Window centered on both axes.
    #[default]
    Center,
    /// Window shifted from the center by `(tx, ty)` pixels, saturated at
    /// the bitmap edges.
    Pan {
        /// Horizontal offset, positive to the right.
        tx: i32,
        /// Vertical offset, positive downwards.
        ty: i32,
    },
}

/// Bitmap edges reached by a pan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Edges {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Edges {
    /// No edge reached.
    pub const NONE: Self = Self {
        left: false,
        right: false,
        top: false,
        bottom: false,
    };
}

/// Offset actually applied by a pan crop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanReport {
    /// Saturated `(tx, ty)`.
    pub offset: (i32, i32),
    /// Edges reached by the requested offset.
    pub edges: Edges,
}

/// Result of a scale followed by the surface policy.
#[derive(Debug)]
pub struct Fitted {
    /// Bitmap ready for display, never larger than the surface.
    pub bitmap: Bitmap,
    /// Size of the scaled bitmap before cropping.
    pub extent: (u32, u32),
    /// Set when a pan crop was applied.
    pub pan: Option<PanReport>,
}

/// Uniform factor bringing `w × h` inside `surface`, never above 1.
///
/// # Example
/// ```
/// use ip_core::SurfaceTarget;
/// use ip_transform::fit::fit_factor;
/// let s = SurfaceTarget::new(1920, 1080);
/// assert_eq!(fit_factor(3840, 1080, s), 0.5);
/// assert_eq!(fit_factor(100, 100, s), 1.0);
/// ```
#[must_use]
pub fn fit_factor(w: u32, h: u32, surface: SurfaceTarget) -> f32 {
    let sx = if w > surface.width {
        surface.width as f32 / w as f32
    } else {
        1.0
    };
    let sy = if h > surface.height {
        surface.height as f32 / h as f32
    } else {
        1.0
    };
    sx.min(sy)
}

/// Downscale `bitmap` uniformly so it fits `surface`.
///
/// Returns `None` when it already fits: no copy is made.
///
/// # Errors
/// Allocation failure.
pub fn fill_surface(
    bitmap: &Bitmap,
    surface: SurfaceTarget,
) -> Result<Option<Bitmap>, TransformError> {
    let (w, h) = bitmap.dimensions();
    let factor = fit_factor(w, h, surface);
    if factor == 1.0 {
        return Ok(None);
    }
    let dw = ((w as f32 * factor).round() as u32).clamp(1, surface.width);
    let dh = ((h as f32 * factor).round() as u32).clamp(1, surface.height);
    log::debug!("fill_surface ×{factor} : {w}×{h} → {dw}×{dh}");
    scale_to(bitmap, dw, dh).map(Some)
}

/// Center-crop `bitmap` to `surface` if it exceeds it on either axis.
///
/// # Errors
/// Allocation failure.
pub fn crop_to_surface(bitmap: Bitmap, surface: SurfaceTarget) -> Result<Bitmap, TransformError> {
    if surface.fits(bitmap.width(), bitmap.height()) {
        return Ok(bitmap);
    }
    crop_and_fill(&bitmap, surface.width, surface.height)
}

/// Scale, then crop to the surface if the result exceeds it.
///
/// # Errors
/// See [`crate::geometry::scale`].
pub fn scale_and_crop(
    src: &Bitmap,
    sx: f32,
    sy: f32,
    surface: SurfaceTarget,
    placement: Placement,
) -> Result<Fitted, TransformError> {
    let scaled = scale(src, sx, sy)?;
    place(scaled, surface, placement)
}

/// Apply the surface policy to an already scaled bitmap.
///
/// # Errors
/// Allocation failure.
pub fn place(
    scaled: Bitmap,
    surface: SurfaceTarget,
    placement: Placement,
) -> Result<Fitted, TransformError> {
    let extent = scaled.dimensions();
    if surface.fits(extent.0, extent.1) {
        return Ok(Fitted {
            bitmap: scaled,
            extent,
            pan: None,
        });
    }
    match placement {
        Placement::Center => Ok(Fitted {
            bitmap: crop_and_fill(&scaled, surface.width, surface.height)?,
            extent,
            pan: None,
        }),
        Placement::Pan { tx, ty } => {
            let bitmap = translate_crop_fill(&scaled, surface.width, surface.height, tx, ty)?;
            let x = pan_axis(extent.0, surface.width, tx);
            let y = pan_axis(extent.1, surface.height, ty);
            Ok(Fitted {
                bitmap,
                extent,
                pan: Some(PanReport {
                    offset: (x.offset, y.offset),
                    edges: Edges {
                        left: x.low_edge,
                        right: x.high_edge,
                        top: y.low_edge,
                        bottom: y.high_edge,
                    },
                }),
            })
        }
    }
}
