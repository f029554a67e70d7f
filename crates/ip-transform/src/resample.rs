use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer as FirResizer};
use ip_core::{AlphaType, Bitmap, PixelFormat, Rgba};

use crate::error::TransformError;

/// Resizer wrapping fast_image_resize.
///
/// Works on unpremultiplied RGBA8888; the library premultiplies alpha
/// internally so transparent borders do not bleed.
///
/// # Example
/// ```
/// use ip_core::{AlphaType, Bitmap};
/// use ip_transform::resample::Resizer;
/// let src = Bitmap::from_rgba8(4, 4, AlphaType::Unpremul, vec![255; 64]).unwrap();
/// let out = Resizer::new().resize(&src, 8, 2).unwrap();
/// assert_eq!(out.dimensions(), (8, 2));
/// ```
pub struct Resizer {
    inner: FirResizer,
    options: ResizeOptions,
}

impl Resizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: FirResizer::new(),
            options: ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::CatmullRom)),
        }
    }

    /// Resize a working bitmap (RGBA8888, unpremultiplied) to `width × height`.
    ///
    /// # Errors
    /// Allocation failure or buffer rejected by the resampler.
    pub fn resize(
        &mut self,
        src: &Bitmap,
        width: u32,
        height: u32,
    ) -> Result<Bitmap, TransformError> {
        if src.dimensions() == (width, height) {
            return Ok(src.clone());
        }
        // from_vec_u8 veut un buffer possédé, au stride minimal
        let src_image = Image::from_vec_u8(
            src.width(),
            src.height(),
            src.data()[..src.byte_size()].to_vec(),
            PixelType::U8x4,
        )
        .map_err(|e| TransformError::Resample(e.to_string()))?;

        let mut dst = Bitmap::new(width, height, PixelFormat::Rgba8888, AlphaType::Unpremul)?;
        let mut dst_image =
            Image::from_slice_u8(width, height, dst.data_mut(), PixelType::U8x4)
                .map_err(|e| TransformError::Resample(e.to_string()))?;

        self.inner
            .resize(&src_image, &mut dst_image, Some(&self.options))
            .map_err(|e| TransformError::Resample(e.to_string()))?;

        Ok(dst)
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tight unpremultiplied RGBA8888 copy of `src`, the working format.
///
/// # Errors
/// Allocation failure.
pub fn to_working(src: &Bitmap) -> Result<Bitmap, TransformError> {
    Ok(src.to_rgba8888()?)
}

/// Encode a working bitmap into the output format of a transform of `like`.
///
/// The output keeps `like`'s alpha type and palette; its format is
/// `like.format().promoted()`.
///
/// # Errors
/// Allocation failure.
pub fn finish(work: Bitmap, like: &Bitmap) -> Result<Bitmap, TransformError> {
    finish_as(work, like.format().promoted(), like.alpha_type(), like.palette())
}

/// Encode a working bitmap into `format`/`alpha`.
///
/// # Errors
/// Allocation failure.
pub fn finish_as(
    work: Bitmap,
    format: PixelFormat,
    alpha: AlphaType,
    palette: &[Rgba],
) -> Result<Bitmap, TransformError> {
    if format == PixelFormat::Rgba8888 && alpha == AlphaType::Unpremul {
        return Ok(work);
    }
    Ok(Bitmap::encode_from_rgba(&work, format, alpha, palette)?)
}
