use ip_core::{Bitmap, SurfaceTarget};

use crate::error::TransformError;
use crate::fit::{Edges, Placement, crop_to_surface, fill_surface, scale_and_crop};
use crate::geometry::{rotate, rotate_and_scale, scale};
use crate::step::{check_scale, scale_step};

/// Scale hysteresis: decides whether the next relative scale may refine the
/// cached scaled bitmap or must restart from the unscaled source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScaleDirection {
    /// Cumulative scale is exactly 1.
    #[default]
    Normal,
    /// Last change enlarged the image.
    Up,
    /// Last change shrank the image.
    Down,
}

impl ScaleDirection {
    fn between(previous: f32, next: f32) -> Self {
        if next > previous {
            Self::Up
        } else if next < previous {
            Self::Down
        } else {
            Self::Normal
        }
    }
}

/// Direction of the last pan request, from the signs of its components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PanDirection {
    /// No pan since the last reset.
    #[default]
    None,
    Left,
    Right,
    Up,
    Down,
    LeftUp,
    LeftDown,
    RightUp,
    RightDown,
}

impl PanDirection {
    /// Classify a pan delta; `(0, 0)` is `None`.
    ///
    /// # Example
    /// ```
    /// use ip_transform::PanDirection;
    /// assert_eq!(PanDirection::classify(-3, 0), PanDirection::Left);
    /// assert_eq!(PanDirection::classify(2, 5), PanDirection::RightDown);
    /// ```
    #[must_use]
    pub fn classify(dx: i32, dy: i32) -> Self {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match (dx.cmp(&0), dy.cmp(&0)) {
            (Equal, Equal) => Self::None,
            (Less, Equal) => Self::Left,
            (Greater, Equal) => Self::Right,
            (Equal, Less) => Self::Up,
            (Equal, Greater) => Self::Down,
            (Less, Less) => Self::LeftUp,
            (Less, Greater) => Self::LeftDown,
            (Greater, Less) => Self::RightUp,
            (Greater, Greater) => Self::RightDown,
        }
    }
}

/// Accumulated pan, in pixels of the scaled bitmap, relative to the centered window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanState {
    /// Saturated `(tx, ty)`.
    pub offset: (i32, i32),
    /// Direction of the last accepted request.
    pub direction: PanDirection,
    /// Edges the window currently touches.
    pub edges: Edges,
}

/// What the caller should display after a state change.
#[derive(Debug)]
pub enum Update {
    /// The rotated cache changed: show [`TransformState::displayed`].
    Rotated,
    /// The scaled cache changed: show [`TransformState::displayed`].
    Scaled,
    /// One-shot result, not kept by the state.
    Transient(Bitmap),
    /// Request absorbed without any visible change.
    Unchanged,
}

/// Rotate/scale/pan state of one image, with its cached bitmaps.
///
/// The base image is owned by the caller and passed to every operation.
/// Each operation computes its bitmaps first and commits them only on
/// success: a failed call leaves the state untouched.
///
/// # Example
/// ```
/// use ip_core::{AlphaType, Bitmap, SurfaceTarget};
/// use ip_transform::{ScaleDirection, TransformState};
/// let base = Bitmap::from_rgba8(10, 6, AlphaType::Premul, vec![255; 240]).unwrap();
/// let mut state = TransformState::new();
/// state.apply_relative_scale(&base, 2.0, 2.0, false, SurfaceTarget::default()).unwrap();
/// assert_eq!(state.direction(), ScaleDirection::Up);
/// assert_eq!(state.displayed().unwrap().dimensions(), (20, 12));
/// ```
#[derive(Debug, Default)]
pub struct TransformState {
    degrees: f32,
    step: f32,
    direction: ScaleDirection,
    pan: PanState,
    extent: Option<(u32, u32)>,
    rotated: Option<Bitmap>,
    scaled: Option<Bitmap>,
}

impl TransformState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: 1.0,
            ..Self::default()
        }
    }

    /// Back to identity; cached bitmaps are dropped.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Forget the pan offset and edges.
    pub fn reset_pan(&mut self) {
        self.pan = PanState::default();
    }

    /// Last rotation set directly, in degrees.
    #[must_use]
    pub fn degrees(&self) -> f32 {
        self.degrees
    }

    /// Cumulative uniform scale, in `(0, 16]`.
    #[must_use]
    pub fn step(&self) -> f32 {
        self.step
    }

    #[must_use]
    pub fn direction(&self) -> ScaleDirection {
        self.direction
    }

    #[must_use]
    pub fn pan(&self) -> PanState {
        self.pan
    }

    /// Size of the last scaled bitmap before its surface crop.
    #[must_use]
    pub fn extent(&self) -> Option<(u32, u32)> {
        self.extent
    }

    #[must_use]
    pub fn rotated(&self) -> Option<&Bitmap> {
        self.rotated.as_ref()
    }

    #[must_use]
    pub fn scaled(&self) -> Option<&Bitmap> {
        self.scaled.as_ref()
    }

    /// Bitmap to show for this state: the scaled one, else the rotated one.
    #[must_use]
    pub fn displayed(&self) -> Option<&Bitmap> {
        self.scaled.as_ref().or(self.rotated.as_ref())
    }

    /// Unscaled source of the scale operations.
    fn source<'a>(&'a self, base: &'a Bitmap) -> &'a Bitmap {
        self.rotated.as_ref().unwrap_or(base)
    }

    /// Rotate `base` by `degrees`; resets scale and pan.
    ///
    /// With `auto_crop` the result is first shrunk to fit the surface; it is
    /// then center-cropped if still larger.
    ///
    /// # Errors
    /// Non-finite angle, allocation failure.
    pub fn set_rotation(
        &mut self,
        base: &Bitmap,
        degrees: f32,
        auto_crop: bool,
        surface: SurfaceTarget,
    ) -> Result<Update, TransformError> {
        let rotated = rotate(base, degrees)?;
        let rotated = crop_to_surface(shrink_if(rotated, auto_crop, surface)?, surface)?;
        log::debug!("set_rotation {degrees}° → {:?}", rotated.dimensions());

        self.reset();
        self.degrees = degrees;
        self.rotated = Some(rotated);
        Ok(Update::Rotated)
    }

    /// Rotate and scale `base` in one pass; resets state first.
    ///
    /// The plain rotation is cached too, as the source of later relative
    /// scales, and the cumulative scale becomes `sx`.
    ///
    /// # Errors
    /// Invalid factor or angle, factor above 16, allocation failure.
    pub fn set_rotation_and_scale(
        &mut self,
        base: &Bitmap,
        degrees: f32,
        sx: f32,
        sy: f32,
        auto_crop: bool,
        surface: SurfaceTarget,
    ) -> Result<Update, TransformError> {
        check_scale(sx)?;
        check_scale(sy)?;
        let scaled = shrink_if(rotate_and_scale(base, degrees, sx, sy)?, auto_crop, surface)?;
        let extent = scaled.dimensions();
        let scaled = crop_to_surface(scaled, surface)?;
        // Rotated-only pass: seeds later relative scales, never displayed.
        let rotated = crop_to_surface(rotate(base, degrees)?, surface)?;

        self.reset();
        self.degrees = degrees;
        self.rotated = Some(rotated);
        self.scaled = Some(scaled);
        self.extent = Some(extent);
        self.direction = ScaleDirection::between(1.0, sx);
        self.step = sx;
        Ok(Update::Scaled)
    }

    /// Multiply the current scale by `(sx, sy)`.
    ///
    /// Non-uniform requests are one-shot: `base` is scaled, optionally fit
    /// to the surface, and returned as [`Update::Transient`] without touching
    /// the state. Uniform requests follow the direction hysteresis: keep
    /// going the same way and the cached scaled bitmap is refined; reverse
    /// and the scale is recomputed from the unscaled source.
    ///
    /// # Errors
    /// Invalid factor, cumulative scale above 16, resampling failure.
    pub fn apply_relative_scale(
        &mut self,
        base: &Bitmap,
        sx: f32,
        sy: f32,
        auto_crop: bool,
        surface: SurfaceTarget,
    ) -> Result<Update, TransformError> {
        check_scale(sx)?;
        check_scale(sy)?;

        if sx != sy {
            log::warn!("scale non uniforme ({sx}, {sy}) : rendu ponctuel");
            let out = shrink_if(scale(base, sx, sy)?, auto_crop, surface)?;
            self.reset_pan();
            return Ok(Update::Transient(out));
        }

        let real = self.step * sx;
        check_scale(real)?;
        log::debug!(
            "relative scale ×{sx}: {:?} step {} → {real}",
            self.direction,
            self.step
        );

        let from_source = |state: &Self| scale_step(state.source(base), real, surface, Placement::Center);
        let refine = |state: &Self| match state.scaled.as_ref() {
            Some(cached) => scale_and_crop(cached, sx, sx, surface, Placement::Center),
            None => from_source(state),
        };

        let (fitted, direction) = match self.direction {
            ScaleDirection::Normal => (
                Some(from_source(self)?),
                ScaleDirection::between(self.step, real),
            ),
            ScaleDirection::Up => {
                let fitted = if real > self.step {
                    Some(refine(self)?)
                } else if real < self.step {
                    Some(from_source(self)?)
                } else {
                    None
                };
                (fitted, settle(real, ScaleDirection::Up))
            }
            ScaleDirection::Down => {
                let fitted = if real < self.step {
                    Some(refine(self)?)
                } else if real > self.step {
                    Some(from_source(self)?)
                } else {
                    None
                };
                (fitted, settle(real, ScaleDirection::Down))
            }
        };

        if let Some(f) = fitted {
            self.scaled = Some(f.bitmap);
            self.extent = Some(f.extent);
        }
        self.step = real;
        self.direction = direction;
        self.reset_pan();
        Ok(if self.scaled.is_some() {
            Update::Scaled
        } else {
            Update::Unchanged
        })
    }

    /// Pan the scaled image by `(tx, ty)` pixels.
    ///
    /// Each axis accumulates until the window touches that edge of the scaled
    /// image; a further request toward a reached edge is ignored on that axis,
    /// and when every moving axis is blocked the call is a no-op. The displayed
    /// bitmap is always recomputed from the unscaled source.
    ///
    /// # Errors
    /// `NoScaledImage` before any scale, `NoPanMargin` when every moving axis
    /// already fits the surface, non-finite offsets, resampling failure.
    pub fn apply_relative_translate(
        &mut self,
        base: &Bitmap,
        tx: f32,
        ty: f32,
        surface: SurfaceTarget,
    ) -> Result<Update, TransformError> {
        let extent = match (self.scaled.as_ref(), self.extent) {
            (Some(_), Some(extent)) => extent,
            _ => return Err(TransformError::NoScaledImage),
        };
        for v in [tx, ty] {
            if !v.is_finite() {
                return Err(TransformError::InvalidOffset(v));
            }
        }
        let (dx, dy) = (tx.round() as i32, ty.round() as i32);
        if dx == 0 && dy == 0 {
            return Ok(Update::Unchanged);
        }

        let room_x = dx != 0 && extent.0 > surface.width;
        let room_y = dy != 0 && extent.1 > surface.height;
        if !room_x && !room_y {
            return Err(TransformError::NoPanMargin);
        }

        let direction = PanDirection::classify(dx, dy);
        let edges = self.pan.edges;
        let move_x = dx != 0 && !((dx < 0 && edges.left) || (dx > 0 && edges.right));
        let move_y = dy != 0 && !((dy < 0 && edges.top) || (dy > 0 && edges.bottom));
        if !move_x && !move_y {
            log::debug!("pan {direction:?} ignoré : bord atteint");
            self.pan.direction = direction;
            return Ok(Update::Unchanged);
        }

        let mut offset = self.pan.offset;
        if move_x {
            offset.0 = offset.0.saturating_add(dx);
        }
        if move_y {
            offset.1 = offset.1.saturating_add(dy);
        }

        let fitted = scale_step(
            self.source(base),
            self.step,
            surface,
            Placement::Pan {
                tx: offset.0,
                ty: offset.1,
            },
        )?;
        let report = fitted.pan.unwrap_or_default();
        log::debug!("pan {direction:?} → {:?} {:?}", report.offset, report.edges);

        self.pan = PanState {
            offset: report.offset,
            direction,
            edges: report.edges,
        };
        self.scaled = Some(fitted.bitmap);
        self.extent = Some(fitted.extent);
        Ok(Update::Scaled)
    }
}

/// Direction after a change to `real` while moving `current`.
fn settle(real: f32, current: ScaleDirection) -> ScaleDirection {
    if real == 1.0 {
        ScaleDirection::Normal
    } else if real < 1.0 {
        ScaleDirection::Down
    } else if current == ScaleDirection::Down {
        ScaleDirection::Up
    } else {
        current
    }
}

fn shrink_if(
    bitmap: Bitmap,
    auto_crop: bool,
    surface: SurfaceTarget,
) -> Result<Bitmap, TransformError> {
    if !auto_crop {
        return Ok(bitmap);
    }
    Ok(fill_surface(&bitmap, surface)?.unwrap_or(bitmap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ip_core::AlphaType;

    fn solid(w: u32, h: u32) -> Bitmap {
        Bitmap::from_rgba8(w, h, AlphaType::Premul, vec![255; (w * h * 4) as usize]).unwrap()
    }

    fn surface() -> SurfaceTarget {
        SurfaceTarget::new(192, 108)
    }

    fn dims(state: &TransformState) -> (u32, u32) {
        state.displayed().unwrap().dimensions()
    }

    #[test]
    fn first_scale_up_from_normal() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        let up = st.apply_relative_scale(&base, 2.0, 2.0, false, surface()).unwrap();
        assert!(matches!(up, Update::Scaled));
        assert_eq!(st.direction(), ScaleDirection::Up);
        assert_eq!(st.step(), 2.0);
        assert_eq!(st.extent(), Some((200, 120)));
        assert_eq!(dims(&st), (192, 108));
    }

    #[test]
    fn continuing_up_refines_the_cache() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        st.apply_relative_scale(&base, 2.0, 2.0, false, surface()).unwrap();
        st.apply_relative_scale(&base, 1.5, 1.5, false, surface()).unwrap();
        // 192×108 (cache) × 1.5, not 100×60 × 3
        assert_eq!(st.extent(), Some((288, 162)));
        assert_eq!(st.step(), 3.0);
        assert_eq!(st.direction(), ScaleDirection::Up);
    }

    #[test]
    fn reversal_recomputes_from_source() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        st.apply_relative_scale(&base, 2.0, 2.0, false, surface()).unwrap();
        st.apply_relative_scale(&base, 0.75, 0.75, false, surface()).unwrap();
        // 100×60 × 1.5 ; raffiner le cache aurait donné 144×81
        assert_eq!(st.extent(), Some((150, 90)));
        assert_eq!(dims(&st), (150, 90));
        assert_eq!(st.direction(), ScaleDirection::Up);
    }

    #[test]
    fn crossing_one_goes_back_to_normal_then_down() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        st.apply_relative_scale(&base, 2.0, 2.0, false, surface()).unwrap();
        st.apply_relative_scale(&base, 0.5, 0.5, false, surface()).unwrap();
        assert_eq!(st.direction(), ScaleDirection::Normal);
        assert_eq!(dims(&st), (100, 60));
        st.apply_relative_scale(&base, 0.5, 0.5, false, surface()).unwrap();
        assert_eq!(st.direction(), ScaleDirection::Down);
        assert_eq!(dims(&st), (50, 30));
        // Descente continue : raffinement du cache
        st.apply_relative_scale(&base, 0.5, 0.5, false, surface()).unwrap();
        assert_eq!(dims(&st), (25, 15));
        // Inversion vers le haut : recalcul depuis la source (×0.5)
        st.apply_relative_scale(&base, 2.0, 2.0, false, surface()).unwrap();
        assert_eq!(st.direction(), ScaleDirection::Down);
        assert_eq!(dims(&st), (50, 30));
    }

    #[test]
    fn cumulative_limit_leaves_state_untouched() {
        let base = solid(10, 6);
        let mut st = TransformState::new();
        st.apply_relative_scale(&base, 8.0, 8.0, false, SurfaceTarget::default()).unwrap();
        let before = dims(&st);
        let err = st
            .apply_relative_scale(&base, 4.0, 4.0, false, SurfaceTarget::default())
            .unwrap_err();
        assert!(matches!(err, TransformError::ScaleOutOfRange(_)));
        assert_eq!(st.step(), 8.0);
        assert_eq!(dims(&st), before);
    }

    #[test]
    fn invalid_factors_are_parameter_errors() {
        let base = solid(10, 6);
        let mut st = TransformState::new();
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let err = st.apply_relative_scale(&base, bad, bad, false, surface()).unwrap_err();
            assert_eq!(err.result_code(), ip_core::ResultCode::ErrParameter, "{bad}");
        }
        assert!(matches!(
            st.apply_relative_scale(&base, 17.0, 17.0, false, surface()),
            Err(TransformError::ScaleOutOfRange(_))
        ));
    }

    #[test]
    fn non_uniform_scale_is_transient() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        let out = st.apply_relative_scale(&base, 3.0, 1.0, true, surface()).unwrap();
        match out {
            Update::Transient(b) => assert_eq!(b.dimensions(), (192, 38)),
            other => panic!("{other:?}"),
        }
        assert_eq!(st.step(), 1.0);
        assert!(st.displayed().is_none());
    }

    #[test]
    fn rotation_resets_scale_and_pan() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        st.apply_relative_scale(&base, 2.0, 2.0, false, surface()).unwrap();
        st.apply_relative_translate(&base, 3.0, 0.0, surface()).unwrap();
        st.set_rotation(&base, 90.0, false, surface()).unwrap();
        assert_eq!(st.step(), 1.0);
        assert_eq!(st.direction(), ScaleDirection::Normal);
        assert_eq!(st.pan(), PanState::default());
        assert!(st.scaled().is_none());
        assert_eq!(dims(&st), (60, 100));
        // La mise à l'échelle suivante repart de l'image tournée
        st.apply_relative_scale(&base, 2.0, 2.0, false, surface()).unwrap();
        assert_eq!(st.extent(), Some((120, 200)));
        assert_eq!(st.direction(), ScaleDirection::Up);
    }

    #[test]
    fn rotation_auto_crop_fits_surface() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        st.set_rotation(&base, 90.0, true, surface()).unwrap();
        // 60×100 ramené à 108 de haut : déjà dedans
        assert_eq!(dims(&st), (60, 100));
        let tall = solid(60, 300);
        st.set_rotation(&tall, 0.0, true, surface()).unwrap();
        assert_eq!(dims(&st), (22, 108));
    }

    #[test]
    fn rotate_and_scale_sets_step() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        st.set_rotation_and_scale(&base, 90.0, 0.5, 0.5, false, surface()).unwrap();
        assert_eq!(st.step(), 0.5);
        assert_eq!(st.direction(), ScaleDirection::Down);
        assert_eq!(dims(&st), (30, 50));
        assert_eq!(st.rotated().unwrap().dimensions(), (60, 100));
    }

    #[test]
    fn translate_requires_a_scaled_image() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        assert!(matches!(
            st.apply_relative_translate(&base, 5.0, 0.0, surface()),
            Err(TransformError::NoScaledImage)
        ));
    }

    #[test]
    fn pan_clamps_at_edge_then_ignores() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        st.apply_relative_scale(&base, 2.0, 2.0, false, surface()).unwrap();
        // 200 - 192 = 8 de marge : centre 4, droite jusqu'à +4
        st.apply_relative_translate(&base, 3.0, 0.0, surface()).unwrap();
        assert_eq!(st.pan().offset, (3, 0));
        assert!(!st.pan().edges.right);
        st.apply_relative_translate(&base, 3.0, 0.0, surface()).unwrap();
        assert_eq!(st.pan().offset, (4, 0));
        assert!(st.pan().edges.right);
        let again = st.apply_relative_translate(&base, 3.0, 0.0, surface()).unwrap();
        assert!(matches!(again, Update::Unchanged));
        assert_eq!(st.pan().offset, (4, 0));
        // Direction opposée : libère le bord
        st.apply_relative_translate(&base, -2.0, 0.0, surface()).unwrap();
        assert_eq!(st.pan().offset, (2, 0));
        assert!(!st.pan().edges.right);
    }

    #[test]
    fn diagonal_moves_only_the_free_axis() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        st.apply_relative_scale(&base, 2.0, 2.0, false, surface()).unwrap();
        st.apply_relative_translate(&base, -10.0, 0.0, surface()).unwrap();
        assert!(st.pan().edges.left);
        st.apply_relative_translate(&base, -1.0, -2.0, surface()).unwrap();
        assert_eq!(st.pan().offset, (-4, -2));
        assert_eq!(st.pan().direction, PanDirection::LeftUp);
        assert!(st.pan().edges.left && !st.pan().edges.top);
    }

    #[test]
    fn pan_needs_margin_on_a_moving_axis() {
        let base = solid(100, 60);
        let wide = SurfaceTarget::new(200, 108);
        let mut st = TransformState::new();
        st.apply_relative_scale(&base, 2.0, 2.0, false, wide).unwrap();
        assert!(matches!(
            st.apply_relative_translate(&base, 5.0, 0.0, wide),
            Err(TransformError::NoPanMargin)
        ));
        st.apply_relative_translate(&base, 0.0, 5.0, wide).unwrap();
        assert_eq!(st.pan().offset, (0, 5));
    }

    #[test]
    fn zero_translate_is_a_no_op() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        st.apply_relative_scale(&base, 2.0, 2.0, false, surface()).unwrap();
        assert!(matches!(
            st.apply_relative_translate(&base, 0.2, -0.4, surface()).unwrap(),
            Update::Unchanged
        ));
    }

    #[test]
    fn scale_resets_pan() {
        let base = solid(100, 60);
        let mut st = TransformState::new();
        st.apply_relative_scale(&base, 2.0, 2.0, false, surface()).unwrap();
        st.apply_relative_translate(&base, 2.0, 2.0, surface()).unwrap();
        st.apply_relative_scale(&base, 1.0, 1.0, false, surface()).unwrap();
        assert_eq!(st.pan(), PanState::default());
    }
}
