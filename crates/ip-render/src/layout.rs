use ip_core::bitmap::alloc_zeroed;
use ip_core::{AlphaType, Bitmap, CoreError, FrameInfo, LayerFormat, PixelFormat, Rgba};
use rayon::prelude::*;

/// Frame converted to a device layout, owned until it is handed to a sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Converted {
    /// Pixel bytes, `stride × height`.
    pub data: Vec<u8>,
    /// Layout of `data`.
    pub format: LayerFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row.
    pub stride: usize,
}

impl Converted {
    /// Borrowed descriptor for [`ip_core::traits::FrameSink::render`].
    #[must_use]
    pub fn frame_info(&self) -> FrameInfo<'_> {
        FrameInfo {
            data: &self.data,
            format: self.format,
            width: self.width,
            height: self.height,
            stride: self.stride,
            rotate: 0,
        }
    }
}

/// Row stride of a frame in `format`.
///
/// YUYV rows are padded to a multiple of 16 pixels.
#[must_use]
pub fn layer_stride(width: u32, format: LayerFormat) -> usize {
    let w = width as usize;
    match format {
        LayerFormat::Yuyv => w.div_ceil(16) * 16 * 2,
        other => w * other.bytes_per_pixel(),
    }
}

/// Convertit un bitmap vers la disposition attendue par le plan vidéo.
///
/// Les pixels sont d'abord décodés en RGBA non prémultiplié. `Argb` n'est
/// pas rendu : `None`.
///
/// # Errors
/// Allocation failure.
///
/// # Example
/// ```
/// use ip_core::{AlphaType, Bitmap, LayerFormat};
/// use ip_render::layout::convert;
/// let bmp = Bitmap::from_rgba8(2, 1, AlphaType::Opaque, vec![1, 2, 3, 255, 4, 5, 6, 255]).unwrap();
/// let rgb = convert(&bmp, LayerFormat::Rgb).unwrap().unwrap();
/// assert_eq!(rgb.data, [1, 2, 3, 4, 5, 6]);
/// ```
pub fn convert(bitmap: &Bitmap, format: LayerFormat) -> Result<Option<Converted>, CoreError> {
    if format == LayerFormat::Argb {
        return Ok(None);
    }
    let (width, height) = bitmap.dimensions();
    let stride = layer_stride(width, format);
    let mut data = alloc_zeroed(stride * height as usize)?;

    let direct = bitmap.format() == PixelFormat::Rgba8888 && bitmap.alpha_type() != AlphaType::Premul;
    data.par_chunks_exact_mut(stride)
        .enumerate()
        .for_each_init(
            || vec![[0u8; 4]; width as usize],
            |row, (y, dst)| {
                let y = y as u32;
                if direct && format == LayerFormat::Rgba {
                    dst.copy_from_slice(bitmap.row(y));
                    if bitmap.alpha_type() == AlphaType::Opaque {
                        dst.chunks_exact_mut(4).for_each(|p| p[3] = 255);
                    }
                    return;
                }
                bitmap.read_row_rgba(y, row);
                match format {
                    LayerFormat::Rgba => rgba_row(row, dst),
                    LayerFormat::Rgb => rgb_row(row, dst),
                    LayerFormat::Yuyv => yuyv_row(row, dst),
                    LayerFormat::Argb => {}
                }
            },
        );

    Ok(Some(Converted {
        data,
        format,
        width,
        height,
        stride,
    }))
}

fn rgba_row(src: &[Rgba], dst: &mut [u8]) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src) {
        d.copy_from_slice(s);
    }
}

fn rgb_row(src: &[Rgba], dst: &mut [u8]) {
    for (d, s) in dst.chunks_exact_mut(3).zip(src) {
        d.copy_from_slice(&s[..3]);
    }
}

/// BT.601 studio-range luma.
#[inline]
#[must_use]
pub fn rgb_to_y(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    ((66 * r + 129 * g + 25 * b + 0x1080) >> 8) as u8
}

#[inline]
#[must_use]
pub fn rgb_to_u(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    ((112 * b - 74 * g - 38 * r + 0x8080) >> 8) as u8
}

#[inline]
#[must_use]
pub fn rgb_to_v(r: u8, g: u8, b: u8) -> u8 {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    ((112 * r - 94 * g - 18 * b + 0x8080) >> 8) as u8
}

/// Pack a row as `[Y0 U Y1 V]`, chroma from the pair average.
///
/// An odd last pixel gets its own chroma and a zero second luma.
fn yuyv_row(src: &[Rgba], dst: &mut [u8]) {
    let mut out = dst.chunks_exact_mut(4);
    let mut pairs = src.chunks_exact(2);
    for (pair, d) in pairs.by_ref().zip(out.by_ref()) {
        let (p, q) = (pair[0], pair[1]);
        let avg = |i: usize| ((u16::from(p[i]) + u16::from(q[i])) >> 1) as u8;
        let (r, g, b) = (avg(0), avg(1), avg(2));
        d[0] = rgb_to_y(p[0], p[1], p[2]);
        d[1] = rgb_to_u(r, g, b);
        d[2] = rgb_to_y(q[0], q[1], q[2]);
        d[3] = rgb_to_v(r, g, b);
    }
    if let ([p], Some(d)) = (pairs.remainder(), out.next()) {
        d[0] = rgb_to_y(p[0], p[1], p[2]);
        d[1] = rgb_to_u(p[0], p[1], p[2]);
        d[2] = 0;
        d[3] = rgb_to_v(p[0], p[1], p[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bmp(w: u32, h: u32, alpha: AlphaType, px: [u8; 4]) -> Bitmap {
        Bitmap::from_rgba8(w, h, alpha, px.repeat((w * h) as usize)).unwrap()
    }

    #[test]
    fn argb_is_never_rendered() {
        let b = bmp(2, 2, AlphaType::Opaque, [1, 2, 3, 4]);
        assert!(convert(&b, LayerFormat::Argb).unwrap().is_none());
    }

    #[test]
    fn rgba_unpremultiplies() {
        let b = bmp(1, 1, AlphaType::Premul, [64, 32, 0, 128]);
        let out = convert(&b, LayerFormat::Rgba).unwrap().unwrap();
        assert_eq!(out.data, [128, 64, 0, 128]);
    }

    #[test]
    fn opaque_alpha_is_forced() {
        let b = bmp(2, 1, AlphaType::Opaque, [10, 20, 30, 7]);
        let out = convert(&b, LayerFormat::Rgba).unwrap().unwrap();
        assert_eq!(out.data, [10, 20, 30, 255, 10, 20, 30, 255]);
    }

    #[test]
    fn rgb565_source_converts() {
        let b = Bitmap::new(3, 2, PixelFormat::Rgb565, AlphaType::Opaque).unwrap();
        let out = convert(&b, LayerFormat::Rgb).unwrap().unwrap();
        assert_eq!(out.stride, 9);
        assert_eq!(out.data.len(), 18);
        assert!(out.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn yuyv_reference_values() {
        // Blanc et noir : Y 235 / 16, chroma neutre 128
        assert_eq!(rgb_to_y(255, 255, 255), 235);
        assert_eq!(rgb_to_y(0, 0, 0), 16);
        assert_eq!(rgb_to_u(0, 0, 0), 128);
        assert_eq!(rgb_to_v(255, 255, 255), 128);
        let b = bmp(2, 1, AlphaType::Opaque, [255, 255, 255, 255]);
        let out = convert(&b, LayerFormat::Yuyv).unwrap().unwrap();
        assert_eq!(out.stride, 64);
        assert_eq!(&out.data[..4], &[235, 128, 235, 128]);
    }

    #[test]
    fn yuyv_odd_width_pads_last_luma() {
        let b = bmp(3, 1, AlphaType::Opaque, [0, 0, 0, 255]);
        let out = convert(&b, LayerFormat::Yuyv).unwrap().unwrap();
        assert_eq!(&out.data[..8], &[16, 128, 16, 128, 16, 128, 0, 128]);
    }

    #[test]
    fn strides() {
        assert_eq!(layer_stride(17, LayerFormat::Yuyv), 64);
        assert_eq!(layer_stride(17, LayerFormat::Rgb), 51);
        assert_eq!(layer_stride(17, LayerFormat::Rgba), 68);
    }
}
