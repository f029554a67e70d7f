use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageError, ImageFormat, ImageReader};
use ip_core::traits::ImageDecoder;
use ip_core::{AlphaType, Bitmap, DecodeError};

/// Décodeur basé sur la crate `image`.
///
/// Produit des bitmaps RGBA8888 non prémultipliés ; `Opaque` quand le
/// flux n'a pas de canal alpha.
///
/// # Example
/// ```
/// use ip_core::traits::ImageDecoder;
/// use ip_source::ImageCodec;
/// let codec = ImageCodec::new(8000);
/// assert!(codec.probe(b"not an image").is_err());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ImageCodec {
    max_dimension: u32,
}

impl ImageCodec {
    /// Codec refusing images wider or taller than `max_dimension`.
    #[must_use]
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    #[must_use]
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Sniff the container format from the first bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, DecodeError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError::Corrupt(e.to_string()))?;
        if reader.format().is_none() {
            return Err(DecodeError::Unsupported("signature inconnue".into()));
        }
        Ok(reader)
    }

    fn check_size(&self, width: u32, height: u32) -> Result<(), DecodeError> {
        if width > self.max_dimension || height > self.max_dimension {
            return Err(DecodeError::TooLarge {
                width,
                height,
                max: self.max_dimension,
            });
        }
        Ok(())
    }
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new(8000)
    }
}

impl ImageDecoder for ImageCodec {
    fn probe(&self, bytes: &[u8]) -> Result<(u32, u32), DecodeError> {
        Self::reader(bytes)?.into_dimensions().map_err(map_image_error)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Bitmap, DecodeError> {
        let (w, h) = self.probe(bytes)?;
        self.check_size(w, h)?;
        let img = Self::reader(bytes)?.decode().map_err(map_image_error)?;
        log::debug!("{} : {w}×{h} {:?}", self.name(), img.color());
        to_bitmap(&img)
    }

    fn decode_frames(&self, bytes: &[u8]) -> Result<Vec<Bitmap>, DecodeError> {
        if Self::sniff(bytes) != Some(ImageFormat::Gif) {
            return Ok(vec![self.decode(bytes)?]);
        }
        let (w, h) = self.probe(bytes)?;
        self.check_size(w, h)?;

        let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(map_image_error)?;
        // Frames arrive composited on the full logical screen
        let frames = decoder
            .into_frames()
            .collect_frames()
            .map_err(map_image_error)?;
        log::debug!("{} : gif {w}×{h}, {} frames", self.name(), frames.len());

        let mut out = Vec::with_capacity(frames.len());
        for frame in frames {
            let buf = frame.into_buffer();
            let (fw, fh) = buf.dimensions();
            out.push(Bitmap::from_rgba8(fw, fh, AlphaType::Unpremul, buf.into_raw())?);
        }
        if out.is_empty() {
            return Err(DecodeError::Corrupt("gif sans frame".into()));
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "image"
    }
}

fn to_bitmap(img: &DynamicImage) -> Result<Bitmap, DecodeError> {
    let alpha = if img.color().has_alpha() {
        AlphaType::Unpremul
    } else {
        AlphaType::Opaque
    };
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    Ok(Bitmap::from_rgba8(w, h, alpha, rgba.into_raw())?)
}

fn map_image_error(e: ImageError) -> DecodeError {
    match e {
        ImageError::Unsupported(u) => DecodeError::Unsupported(u.to_string()),
        other => DecodeError::Corrupt(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Encode a `w × h` RGBA image in `format`.
    pub(crate) fn encoded(w: u32, h: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([x as u8, y as u8, 90, 255])
        }));
        // L'encodeur JPEG refuse l'alpha
        let img = if format == ImageFormat::Jpeg {
            DynamicImage::ImageRgb8(img.to_rgb8())
        } else {
            img
        };
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    /// Two-frame animated GIF.
    pub(crate) fn animated_gif(w: u32, h: u32) -> Vec<u8> {
        use image::codecs::gif::{GifEncoder, Repeat};
        use image::{Delay, Frame};
        let mut out = Vec::new();
        {
            let mut enc = GifEncoder::new(&mut out);
            enc.set_repeat(Repeat::Infinite).unwrap();
            for shade in [0u8, 255] {
                let buf = RgbaImage::from_pixel(w, h, Rgba([shade, 0, 0, 255]));
                enc.encode_frame(Frame::from_parts(buf, 0, 0, Delay::from_numer_denom_ms(100, 1)))
                    .unwrap();
            }
        }
        out
    }

    #[test]
    fn probe_reads_dimensions_only() {
        let png = encoded(7, 3, ImageFormat::Png);
        assert_eq!(ImageCodec::default().probe(&png).unwrap(), (7, 3));
    }

    #[test]
    fn decode_png_and_bmp() {
        let codec = ImageCodec::default();
        let png = codec.decode(&encoded(5, 4, ImageFormat::Png)).unwrap();
        assert_eq!(png.dimensions(), (5, 4));
        assert_eq!(png.pixel_rgba(3, 2), [3, 2, 90, 255]);
        let bmp = codec.decode(&encoded(5, 4, ImageFormat::Bmp)).unwrap();
        assert_eq!(bmp.dimensions(), (5, 4));
    }

    #[test]
    fn jpeg_without_alpha_is_opaque() {
        let jpg = ImageCodec::default()
            .decode(&encoded(16, 8, ImageFormat::Jpeg))
            .unwrap();
        assert_eq!(jpg.alpha_type(), AlphaType::Opaque);
    }

    #[test]
    fn ceiling_is_enforced_before_decoding() {
        let png = encoded(20, 5, ImageFormat::Png);
        let err = ImageCodec::new(10).decode(&png).unwrap_err();
        assert!(matches!(err, DecodeError::TooLarge { width: 20, height: 5, max: 10 }));
    }

    #[test]
    fn garbage_is_unsupported() {
        let err = ImageCodec::default().decode(b"\x00\x01garbage").unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported(_)));
    }

    #[test]
    fn truncated_stream_is_corrupt() {
        let mut png = encoded(32, 32, ImageFormat::Png);
        png.truncate(png.len() / 2);
        let err = ImageCodec::default().decode(&png).unwrap_err();
        assert!(matches!(err, DecodeError::Corrupt(_)));
    }

    #[test]
    fn gif_frames_are_all_decoded() {
        let gif = animated_gif(6, 4);
        let frames = ImageCodec::default().decode_frames(&gif).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].dimensions(), (6, 4));
        assert!(frames[1].pixel_rgba(0, 0)[0] > 200);
    }

    #[test]
    fn still_image_has_one_frame() {
        let png = encoded(3, 3, ImageFormat::Png);
        assert_eq!(ImageCodec::default().decode_frames(&png).unwrap().len(), 1);
    }
}
