use ip_core::pixel::PixelFormat;
use ip_core::{AlphaType, Bitmap, CropRect};
use rayon::prelude::*;

use crate::error::TransformError;
use crate::resample::{Resizer, finish, finish_as, to_working};

/// Trig values below this are treated as exact zeros.
const TRIG_EPSILON: f64 = 1e-9;

/// Scale `src` by `(sx, sy)`.
///
/// Destination is `round(w × sx) × round(h × sy)`, in the promoted format
/// of `src` with the same alpha type.
///
/// # Errors
/// `InvalidScale` for non-finite or non-positive factors, `EmptyResult`
/// when a side rounds to zero.
///
/// # Example
/// ```
/// use ip_core::{AlphaType, Bitmap};
/// use ip_transform::geometry::scale;
/// let src = Bitmap::from_rgba8(10, 6, AlphaType::Premul, vec![255; 240]).unwrap();
/// assert_eq!(scale(&src, 2.0, 0.5).unwrap().dimensions(), (20, 3));
/// ```
pub fn scale(src: &Bitmap, sx: f32, sy: f32) -> Result<Bitmap, TransformError> {
    check_factor(sx)?;
    check_factor(sy)?;
    let (w, h) = scaled_size(src.width(), src.height(), sx, sy)?;
    scale_to(src, w, h)
}

/// Resample `src` to exactly `width × height`.
///
/// # Errors
/// `EmptyResult` for a zero side, or allocation failure.
pub fn scale_to(src: &Bitmap, width: u32, height: u32) -> Result<Bitmap, TransformError> {
    if width == 0 || height == 0 {
        return Err(TransformError::EmptyResult {
            width: i64::from(width),
            height: i64::from(height),
        });
    }
    log::debug!("scale {}×{} → {width}×{height}", src.width(), src.height());
    let work = to_working(src)?;
    let out = Resizer::new().resize(&work, width, height)?;
    finish(out, src)
}

/// Rotate `src` by `degrees` (clockwise) about its center.
///
/// The destination is the rotated bounding box,
/// `w·|cos θ| + h·|sin θ|` by `h·|cos θ| + w·|sin θ|`, rounded.
///
/// # Errors
/// Non-finite angle or allocation failure.
///
/// # Example
/// ```
/// use ip_core::{AlphaType, Bitmap};
/// use ip_transform::geometry::rotate;
/// let src = Bitmap::from_rgba8(10, 6, AlphaType::Premul, vec![255; 240]).unwrap();
/// assert_eq!(rotate(&src, 90.0).unwrap().dimensions(), (6, 10));
/// ```
pub fn rotate(src: &Bitmap, degrees: f32) -> Result<Bitmap, TransformError> {
    rotate_and_scale(src, degrees, 1.0, 1.0)
}

/// Rotate then scale in a single resampling pass.
///
/// # Errors
/// See [`scale`] and [`rotate`].
pub fn rotate_and_scale(
    src: &Bitmap,
    degrees: f32,
    sx: f32,
    sy: f32,
) -> Result<Bitmap, TransformError> {
    check_factor(sx)?;
    check_factor(sy)?;
    if !degrees.is_finite() {
        return Err(TransformError::InvalidAngle(degrees));
    }
    let (cos, sin) = snapped_trig(degrees);
    let (rw, rh) = rotated_size(src.width(), src.height(), cos, sin);
    let (w, h) = scaled_size(rw, rh, sx, sy)?;
    log::debug!(
        "rotate {degrees}° ×({sx}, {sy}) : {}×{} → {w}×{h}",
        src.width(),
        src.height()
    );

    let work = to_working(src)?;
    let map = InverseMap::rotate_scale(src.width(), src.height(), rw, rh, cos, sin, sx, sy);
    let supersample = supersample_factor(sx.min(sy));
    let out = resample_affine(&work, w, h, &map, supersample)?;
    finish(out, src)
}

/// Copy the sub-rectangle `rect` of `src`.
///
/// # Errors
/// `InvalidCrop` unless the rectangle lies fully inside `src`.
pub fn crop_rect(src: &Bitmap, rect: CropRect) -> Result<Bitmap, TransformError> {
    if !rect.is_inside(src.width(), src.height()) {
        return Err(TransformError::InvalidCrop(rect));
    }
    Ok(src.extract_subset(rect.x, rect.y, rect.width, rect.height)?)
}

/// Center `src` in a transparent `dst_w × dst_h` canvas.
///
/// Each axis is independent: overflow is cropped around the center,
/// underflow is padded around the center.
///
/// # Errors
/// Zero-sized canvas or allocation failure.
pub fn crop_and_fill(src: &Bitmap, dst_w: u32, dst_h: u32) -> Result<Bitmap, TransformError> {
    translate_crop_fill(src, dst_w, dst_h, 0, 0)
}

/// As [`crop_and_fill`], with the read window shifted by `(tx, ty)`.
///
/// The shift saturates so the window never leaves `src` (see [`pan_axis`]).
///
/// # Errors
/// Zero-sized canvas or allocation failure.
pub fn translate_crop_fill(
    src: &Bitmap,
    dst_w: u32,
    dst_h: u32,
    tx: i32,
    ty: i32,
) -> Result<Bitmap, TransformError> {
    let x = pan_axis(src.width(), dst_w, tx);
    let y = pan_axis(src.height(), dst_h, ty);
    let window = Window {
        src_x: x.origin,
        src_y: y.origin,
        dst_x: (dst_w - x.len) / 2,
        dst_y: (dst_h - y.len) / 2,
        width: x.len,
        height: y.len,
    };
    blit_into_canvas(src, dst_w, dst_h, &window)
}

/// Read window of one axis of a crop, after pan saturation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanAxis {
    /// First source pixel read.
    pub origin: u32,
    /// Pixels copied on this axis, `min(src, dst)`.
    pub len: u32,
    /// Offset actually applied, relative to the centered origin.
    pub offset: i32,
    /// The requested offset reached or passed the low (left/top) edge.
    pub low_edge: bool,
    /// The requested offset reached or passed the high (right/bottom) edge.
    pub high_edge: bool,
}

/// Saturate a pan offset `t` on an axis of `src_len` pixels shown through
/// `dst_len` pixels.
///
/// The centered origin is `(src_len - m) / 2` with `m = min(src_len, dst_len)`;
/// the shifted origin is clamped to `[0, src_len - m]`.
///
/// # Example
/// ```
/// use ip_transform::geometry::pan_axis;
/// let a = pan_axis(2000, 1920, 25);
/// assert_eq!((a.origin, a.offset, a.high_edge), (65, 25, false));
/// let b = pan_axis(2000, 1920, 500);
/// assert_eq!((b.origin, b.offset, b.high_edge), (80, 40, true));
/// ```
#[must_use]
pub fn pan_axis(src_len: u32, dst_len: u32, t: i32) -> PanAxis {
    let len = src_len.min(dst_len);
    let max_origin = i64::from(src_len - len);
    let center = max_origin / 2;
    let wanted = center + i64::from(t);
    let origin = wanted.clamp(0, max_origin);
    PanAxis {
        origin: origin as u32,
        len,
        offset: (origin - center) as i32,
        low_edge: t < 0 && wanted <= 0,
        high_edge: t > 0 && wanted >= max_origin,
    }
}

/// Rotated bounding box, rounded.
#[must_use]
pub fn rotated_size(w: u32, h: u32, cos: f64, sin: f64) -> (u32, u32) {
    let (w, h) = (f64::from(w), f64::from(h));
    let rw = (w * cos.abs() + h * sin.abs()).round().max(1.0);
    let rh = (h * cos.abs() + w * sin.abs()).round().max(1.0);
    (rw as u32, rh as u32)
}

/// `(cos θ, sin θ)` with near-zero values snapped to zero.
#[must_use]
pub fn snapped_trig(degrees: f32) -> (f64, f64) {
    let rad = f64::from(degrees).to_radians();
    let snap = |v: f64| if v.abs() < TRIG_EPSILON { 0.0 } else { v };
    (snap(rad.cos()), snap(rad.sin()))
}

/// `round(w × sx) × round(h × sy)`.
///
/// # Errors
/// `EmptyResult` if a side is not positive or overflows.
pub fn scaled_size(w: u32, h: u32, sx: f32, sy: f32) -> Result<(u32, u32), TransformError> {
    let dw = (f64::from(w) * f64::from(sx)).round();
    let dh = (f64::from(h) * f64::from(sy)).round();
    if dw < 1.0 || dh < 1.0 || dw > f64::from(u32::MAX) || dh > f64::from(u32::MAX) {
        return Err(TransformError::EmptyResult {
            width: dw as i64,
            height: dh as i64,
        });
    }
    Ok((dw as u32, dh as u32))
}

fn check_factor(s: f32) -> Result<(), TransformError> {
    if s.is_finite() && s > 0.0 {
        Ok(())
    } else {
        Err(TransformError::InvalidScale(s))
    }
}

/// Samples per axis when minifying: one per source pixel covered, at most 4.
fn supersample_factor(scale: f32) -> u32 {
    if scale >= 1.0 {
        1
    } else {
        ((1.0 / scale).ceil() as u32).clamp(1, 4)
    }
}

// --- Canvas blit ---

struct Window {
    src_x: u32,
    src_y: u32,
    dst_x: u32,
    dst_y: u32,
    width: u32,
    height: u32,
}

/// Copy `window` of `src` into a transparent canvas.
///
/// Formats that pass through unchanged are copied byte for byte; promoted
/// formats and palettes go through the RGBA working format so the fill is
/// really transparent.
fn blit_into_canvas(
    src: &Bitmap,
    dst_w: u32,
    dst_h: u32,
    window: &Window,
) -> Result<Bitmap, TransformError> {
    let format = src.format().promoted();
    let raw_copy = format == src.format() && format != PixelFormat::Index8;

    if raw_copy {
        let mut out = Bitmap::new(dst_w, dst_h, format, src.alpha_type())?;
        copy_window(src, &mut out, window);
        return Ok(out);
    }

    let work = to_working(src)?;
    let mut canvas = Bitmap::new(dst_w, dst_h, PixelFormat::Rgba8888, AlphaType::Unpremul)?;
    copy_window(&work, &mut canvas, window);
    finish_as(canvas, format, src.alpha_type(), src.palette())
}

fn copy_window(src: &Bitmap, dst: &mut Bitmap, window: &Window) {
    let bpp = src.format().bytes_per_pixel();
    let len = window.width as usize * bpp;
    let sx = window.src_x as usize * bpp;
    let dx = window.dst_x as usize * bpp;
    for row in 0..window.height {
        let s = src.row(window.src_y + row);
        let d = dst.row_mut(window.dst_y + row);
        d[dx..dx + len].copy_from_slice(&s[sx..sx + len]);
    }
}

// --- Affine resampling ---

/// Destination → source mapping, `u = a·x + b·y + c`, `v = d·x + e·y + f`.
#[derive(Clone, Copy, Debug)]
struct InverseMap {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl InverseMap {
    /// Inverse of: rotate about the source center, recenter into the
    /// `rw × rh` box, then scale by `(sx, sy)`.
    #[allow(clippy::too_many_arguments)]
    fn rotate_scale(
        w: u32,
        h: u32,
        rw: u32,
        rh: u32,
        cos: f64,
        sin: f64,
        sx: f32,
        sy: f32,
    ) -> Self {
        let (cx, cy) = (f64::from(w) / 2.0, f64::from(h) / 2.0);
        let (hw, hh) = (f64::from(rw) / 2.0, f64::from(rh) / 2.0);
        let (sx, sy) = (f64::from(sx), f64::from(sy));
        Self {
            a: (cos / sx) as f32,
            b: (sin / sy) as f32,
            c: (cx - cos * hw - sin * hh) as f32,
            d: (-sin / sx) as f32,
            e: (cos / sy) as f32,
            f: (cy + sin * hw - cos * hh) as f32,
        }
    }

    #[inline(always)]
    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.b * y + self.c,
            self.d * x + self.e * y + self.f,
        )
    }
}

/// Inverse-mapped bilinear sampling, rows in parallel.
///
/// `work` is unpremultiplied RGBA8888; samples are blended premultiplied and
/// pixels outside the source count as transparent, which anti-aliases the
/// rotated edges.
fn resample_affine(
    work: &Bitmap,
    dst_w: u32,
    dst_h: u32,
    map: &InverseMap,
    supersample: u32,
) -> Result<Bitmap, TransformError> {
    let mut out = Bitmap::new(dst_w, dst_h, PixelFormat::Rgba8888, AlphaType::Unpremul)?;
    let out_stride = out.stride();
    let src = Sampler {
        data: work.data(),
        stride: work.stride(),
        width: work.width() as i32,
        height: work.height() as i32,
    };
    let n = supersample.max(1);
    let step = 1.0 / n as f32;
    let count = (n * n) as f32;

    out.data_mut()
        .par_chunks_exact_mut(out_stride)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..dst_w as usize {
                let mut acc = [0.0f32; 4];
                for j in 0..n {
                    let py = y as f32 + (j as f32 + 0.5) * step;
                    for i in 0..n {
                        let px = x as f32 + (i as f32 + 0.5) * step;
                        let (u, v) = map.apply(px, py);
                        let s = src.bilinear_premul(u - 0.5, v - 0.5);
                        for (a, v) in acc.iter_mut().zip(s) {
                            *a += v;
                        }
                    }
                }
                let px = &mut row[x * 4..x * 4 + 4];
                let alpha = acc[3];
                if alpha <= 0.0 {
                    px.fill(0);
                    continue;
                }
                for (d, c) in px.iter_mut().zip(&acc[..3]) {
                    *d = (c / alpha * 255.0).round().clamp(0.0, 255.0) as u8;
                }
                px[3] = (alpha / count).round().clamp(0.0, 255.0) as u8;
            }
        });
    Ok(out)
}

struct Sampler<'a> {
    data: &'a [u8],
    stride: usize,
    width: i32,
    height: i32,
}

impl Sampler<'_> {
    /// Premultiplied sample at `(u, v)` in pixel-center coordinates.
    #[inline(always)]
    fn bilinear_premul(&self, u: f32, v: f32) -> [f32; 4] {
        let (x0, y0) = (u.floor(), v.floor());
        let (fx, fy) = (u - x0, v - y0);
        let (x0, y0) = (x0 as i32, y0 as i32);
        let taps = [
            (x0, y0, (1.0 - fx) * (1.0 - fy)),
            (x0 + 1, y0, fx * (1.0 - fy)),
            (x0, y0 + 1, (1.0 - fx) * fy),
            (x0 + 1, y0 + 1, fx * fy),
        ];
        let mut acc = [0.0f32; 4];
        for (px, py, w) in taps {
            if w <= 0.0 || px < 0 || py < 0 || px >= self.width || py >= self.height {
                continue;
            }
            let i = py as usize * self.stride + px as usize * 4;
            let a = f32::from(self.data[i + 3]);
            let k = w * a / 255.0;
            acc[0] += f32::from(self.data[i]) * k;
            acc[1] += f32::from(self.data[i + 1]) * k;
            acc[2] += f32::from(self.data[i + 2]) * k;
            acc[3] += a * w;
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bitmap where each pixel encodes its coordinates.
    fn coords(w: u32, h: u32) -> Bitmap {
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[x as u8, y as u8, 0, 255]);
            }
        }
        Bitmap::from_rgba8(w, h, AlphaType::Premul, data).unwrap()
    }

    #[test]
    fn scale_sizes_round() {
        let src = coords(10, 7);
        assert_eq!(scale(&src, 1.5, 1.5).unwrap().dimensions(), (15, 11));
        assert_eq!(scale(&src, 0.25, 0.25).unwrap().dimensions(), (3, 2));
    }

    #[test]
    fn scale_rejects_bad_factors() {
        let src = coords(10, 7);
        assert!(matches!(scale(&src, 0.0, 1.0), Err(TransformError::InvalidScale(_))));
        assert!(matches!(scale(&src, f32::NAN, 1.0), Err(TransformError::InvalidScale(_))));
        assert!(matches!(scale(&src, 0.01, 1.0), Err(TransformError::EmptyResult { .. })));
    }

    #[test]
    fn scale_then_inverse_is_within_a_pixel() {
        for (w, h) in [(10, 7), (33, 20), (64, 48)] {
            let src = coords(w, h);
            for k in [1.5_f32, 2.0, 3.0, 7.3, 16.0] {
                let up = scale(&src, k, k).unwrap();
                let back = scale(&up, 1.0 / k, 1.0 / k).unwrap();
                let (bw, bh) = back.dimensions();
                assert!(bw.abs_diff(w) <= 1, "{w}×{h} ×{k}: largeur {bw}");
                assert!(bh.abs_diff(h) <= 1, "{w}×{h} ×{k}: hauteur {bh}");
            }
        }
    }

    #[test]
    fn rotate_90_swaps_and_maps_pixels() {
        let src = coords(8, 5);
        let out = rotate(&src, 90.0).unwrap();
        assert_eq!(out.dimensions(), (5, 8));
        // Rotation horaire : (x, y) source → (h-1-y, x) destination
        assert_eq!(out.pixel_rgba(4, 0), [0, 0, 0, 255]);
        assert_eq!(out.pixel_rgba(0, 7), [7, 4, 0, 255]);
        assert_eq!(out.pixel_rgba(2, 3), [3, 2, 0, 255]);
    }

    #[test]
    fn rotate_180_and_360() {
        let src = coords(6, 4);
        let half = rotate(&src, 180.0).unwrap();
        assert_eq!(half.dimensions(), (6, 4));
        assert_eq!(half.pixel_rgba(0, 0), [5, 3, 0, 255]);
        let full = rotate(&src, 360.0).unwrap();
        assert_eq!(full.pixel_rgba(2, 1), [2, 1, 0, 255]);
    }

    #[test]
    fn rotate_45_bounding_box_and_transparent_corners() {
        let src = Bitmap::from_rgba8(100, 100, AlphaType::Premul, vec![255; 40_000]).unwrap();
        let out = rotate(&src, 45.0).unwrap();
        assert_eq!(out.dimensions(), (141, 141));
        assert_eq!(out.pixel_rgba(0, 0)[3], 0);
        assert_eq!(out.pixel_rgba(70, 70)[3], 255);
    }

    #[test]
    fn rotate_promotes_alpha8() {
        let src = Bitmap::new(4, 2, PixelFormat::Alpha8, AlphaType::Premul).unwrap();
        let out = rotate(&src, 90.0).unwrap();
        assert_eq!(out.format(), PixelFormat::Rgba8888);
        assert_eq!(out.alpha_type(), AlphaType::Premul);
    }

    #[test]
    fn rotate_and_scale_size() {
        let src = coords(10, 6);
        let out = rotate_and_scale(&src, 90.0, 2.0, 3.0).unwrap();
        assert_eq!(out.dimensions(), (12, 30));
    }

    #[test]
    fn crop_rect_validates() {
        let src = coords(10, 6);
        let out = crop_rect(&src, CropRect::new(2, 1, 3, 3)).unwrap();
        assert_eq!(out.pixel_rgba(0, 0), [2, 1, 0, 255]);
        assert!(matches!(
            crop_rect(&src, CropRect::new(8, 0, 3, 3)),
            Err(TransformError::InvalidCrop(_))
        ));
    }

    #[test]
    fn crop_and_fill_centers_both_ways() {
        // Largeur débordante, hauteur insuffisante
        let src = coords(10, 4);
        let out = crop_and_fill(&src, 6, 8).unwrap();
        assert_eq!(out.dimensions(), (6, 8));
        // srcx = 2, dsty = 2
        assert_eq!(out.pixel_rgba(0, 2), [2, 0, 0, 255]);
        assert_eq!(out.pixel_rgba(5, 5), [7, 3, 0, 255]);
        assert_eq!(out.pixel_rgba(0, 0)[3], 0);
        assert_eq!(out.pixel_rgba(0, 7)[3], 0);
    }

    #[test]
    fn translate_crop_saturates() {
        let src = coords(20, 4);
        let right = translate_crop_fill(&src, 10, 4, 100, 0).unwrap();
        assert_eq!(right.pixel_rgba(0, 0), [10, 0, 0, 255]);
        let left = translate_crop_fill(&src, 10, 4, -3, 0).unwrap();
        assert_eq!(left.pixel_rgba(0, 0), [2, 0, 0, 255]);
    }

    #[test]
    fn pan_axis_without_margin() {
        let a = pan_axis(800, 1920, 50);
        assert_eq!((a.origin, a.len, a.offset), (0, 800, 0));
        assert!(a.high_edge);
        let b = pan_axis(800, 1920, 0);
        assert!(!b.high_edge && !b.low_edge);
    }

    #[test]
    fn index8_fill_uses_nearest_transparent_entry() {
        let data = vec![1u8; 4];
        let src = Bitmap::from_raw(2, 2, PixelFormat::Index8, AlphaType::Premul, 2, data)
            .unwrap()
            .with_palette(vec![[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 0, 0]]);
        let out = crop_and_fill(&src, 4, 2).unwrap();
        assert_eq!(out.format(), PixelFormat::Index8);
        assert_eq!(out.row(0), &[2, 1, 1, 2]);
    }
}
