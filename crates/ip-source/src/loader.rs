use std::sync::Arc;

use ip_core::config::InitialParams;
use ip_core::traits::ImageDecoder;
use ip_core::{Bitmap, DecodeError};
use ip_transform::geometry::{crop_rect, rotate_and_scale};

use crate::codec::ImageCodec;
use crate::error::SourceError;
use crate::movie::Movie;
use crate::uri::{DataSource, MediaKind, RemoteFetcher};

/// Result of probing a source without decoding its pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Probe {
    /// Largeur annoncée ; 0 pour un TIFF non sondable.
    pub width: u32,
    /// Hauteur annoncée.
    pub height: u32,
    /// Kind decided from the name or, failing that, the stream signature.
    pub kind: MediaKind,
}

/// A decoded source.
#[derive(Debug)]
pub enum Loaded {
    /// One bitmap.
    Still(Bitmap),
    /// At least two frames.
    Movie(Movie),
}

impl Loaded {
    /// Dimensions of the image, or of the animation's logical screen.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Still(b) => b.dimensions(),
            Self::Movie(m) => m.dimensions(),
        }
    }
}

/// Opens data sources and decodes them.
///
/// # Example
/// ```
/// use ip_source::{DataSource, Loader};
/// let loader = Loader::default();
/// let src = DataSource::from_memory(Some("x.png".into()), b"junk".to_vec());
/// assert!(loader.probe(&src).is_err());
/// ```
#[derive(Clone, Default)]
pub struct Loader {
    codec: ImageCodec,
    fetcher: Option<Arc<dyn RemoteFetcher>>,
    initial: InitialParams,
}

impl Loader {
    #[must_use]
    pub fn new(codec: ImageCodec) -> Self {
        Self {
            codec,
            fetcher: None,
            initial: InitialParams::default(),
        }
    }

    /// Client used for `http(s)://` sources.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Transform applied to every decoded still image.
    #[must_use]
    pub fn with_initial(mut self, initial: InitialParams) -> Self {
        self.initial = initial;
        self
    }

    #[must_use]
    pub fn codec(&self) -> &ImageCodec {
        &self.codec
    }

    /// Read the whole encoded stream.
    ///
    /// # Errors
    /// See [`DataSource::read`].
    pub fn read(&self, source: &DataSource) -> Result<Arc<[u8]>, SourceError> {
        source.read(self.fetcher.as_deref())
    }

    /// Check that `source` can be decoded and read its dimensions.
    ///
    /// TIFF sources are accepted on their extension even when the
    /// stream cannot be probed; their size is then reported as 0×0.
    ///
    /// # Errors
    /// `Unsupported` for an unknown extension or stream, plus read errors.
    pub fn probe(&self, source: &DataSource) -> Result<Probe, SourceError> {
        let named = source.kind();
        if named.is_none() && source.name().is_some() {
            return Err(SourceError::Unsupported(source.to_string()));
        }
        let bytes = self.read(source)?;
        let kind = match named {
            Some(k) => k,
            None => ImageCodec::sniff(&bytes)
                .and_then(MediaKind::from_format)
                .ok_or_else(|| SourceError::Unsupported(source.to_string()))?,
        };

        match self.codec.probe(&bytes) {
            Ok((width, height)) => Ok(Probe {
                width,
                height,
                kind,
            }),
            Err(e) if kind == MediaKind::Tiff => {
                log::warn!("probe {source} : {e}, accepté sur l'extension");
                Ok(Probe {
                    width: 0,
                    height: 0,
                    kind,
                })
            }
            Err(e) => {
                log::error!("probe {source} : {e}");
                Err(SourceError::Unsupported(e.to_string()))
            }
        }
    }

    /// Decode `source`.
    ///
    /// Animated sources with more than one frame become [`Loaded::Movie`];
    /// a single-frame GIF is a still image.
    ///
    /// # Errors
    /// Read failure, decoder failure, image above the size ceiling.
    pub fn load(&self, source: &DataSource) -> Result<Loaded, SourceError> {
        let bytes = self.read(source)?;
        let kind = source
            .kind()
            .or_else(|| ImageCodec::sniff(&bytes).and_then(MediaKind::from_format))
            .unwrap_or(MediaKind::Still);

        if kind == MediaKind::Movie {
            let mut frames = self.codec.decode_frames(&bytes)?;
            if frames.len() > 1 {
                log::info!("{source} : animation de {} frames", frames.len());
                return Movie::new(frames)
                    .map(Loaded::Movie)
                    .ok_or_else(|| DecodeError::Corrupt("animation vide".into()).into());
            }
            let first = frames
                .pop()
                .ok_or_else(|| DecodeError::Corrupt("aucune frame".into()))?;
            return Ok(Loaded::Still(self.apply_initial(first)));
        }

        let bitmap = self.codec.decode(&bytes)?;
        log::info!("{source} : {}×{}", bitmap.width(), bitmap.height());
        Ok(Loaded::Still(self.apply_initial(bitmap)))
    }

    /// Rotate+scale then crop a freshly decoded bitmap.
    ///
    /// A failing stage keeps the previous stage's bitmap.
    #[must_use]
    pub fn apply_initial(&self, bitmap: Bitmap) -> Bitmap {
        apply_initial(bitmap, &self.initial)
    }
}

/// See [`Loader::apply_initial`].
#[must_use]
pub fn apply_initial(bitmap: Bitmap, params: &InitialParams) -> Bitmap {
    let mut bitmap = bitmap;
    if !params.is_identity() && params.scale_x > 0.0 && params.scale_y > 0.0 {
        match rotate_and_scale(&bitmap, params.degrees, params.scale_x, params.scale_y) {
            Ok(out) => bitmap = out,
            Err(e) => log::warn!("paramètres initiaux ignorés : {e}"),
        }
    }
    if let Some(rect) = params.crop {
        match crop_rect(&bitmap, rect) {
            Ok(out) => bitmap = out,
            Err(e) => log::warn!("recadrage initial ignoré : {e}"),
        }
    }
    bitmap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{animated_gif, encoded};
    use image::ImageFormat;
    use ip_core::CropRect;

    fn mem(name: &str, bytes: Vec<u8>) -> DataSource {
        DataSource::from_memory(Some(name.into()), bytes)
    }

    #[test]
    fn probe_known_extension() {
        let p = Loader::default()
            .probe(&mem("a.png", encoded(9, 4, ImageFormat::Png)))
            .unwrap();
        assert_eq!(p, Probe { width: 9, height: 4, kind: MediaKind::Still });
    }

    #[test]
    fn probe_rejects_unknown_extension() {
        let err = Loader::default()
            .probe(&mem("a.txt", encoded(9, 4, ImageFormat::Png)))
            .unwrap_err();
        assert!(matches!(err, SourceError::Unsupported(_)));
    }

    #[test]
    fn probe_unnamed_source_sniffs_the_stream() {
        let src = DataSource::from_memory(None, encoded(2, 2, ImageFormat::Bmp));
        assert_eq!(Loader::default().probe(&src).unwrap().kind, MediaKind::Still);
    }

    #[test]
    fn tiff_is_accepted_on_extension() {
        let p = Loader::default().probe(&mem("scan.tif", b"II*\0broken".to_vec())).unwrap();
        assert_eq!((p.width, p.height, p.kind), (0, 0, MediaKind::Tiff));
    }

    #[test]
    fn corrupt_photo_is_unsupported() {
        let err = Loader::default().probe(&mem("a.jpg", b"nope".to_vec())).unwrap_err();
        assert_eq!(err.result_code(), ip_core::ResultCode::ErrInvalidOperation);
    }

    #[test]
    fn animated_gif_loads_as_movie() {
        match Loader::default().load(&mem("a.gif", animated_gif(4, 4))).unwrap() {
            Loaded::Movie(m) => assert_eq!(m.frame_count(), 2),
            Loaded::Still(_) => panic!("expected a movie"),
        }
    }

    #[test]
    fn single_frame_gif_is_still() {
        let gif = encoded(4, 3, ImageFormat::Gif);
        match Loader::default().load(&mem("a.gif", gif)).unwrap() {
            Loaded::Still(b) => assert_eq!(b.dimensions(), (4, 3)),
            Loaded::Movie(_) => panic!("expected a still"),
        }
    }

    #[test]
    fn size_ceiling_maps_to_no_memory() {
        let loader = Loader::new(ImageCodec::new(8));
        let err = loader.load(&mem("a.png", encoded(9, 4, ImageFormat::Png))).unwrap_err();
        assert_eq!(err.result_code(), ip_core::ResultCode::ErrNoMemory);
    }

    #[test]
    fn initial_params_rotate_scale_then_crop() {
        let params = InitialParams {
            degrees: 90.0,
            scale_x: 2.0,
            scale_y: 2.0,
            crop: Some(CropRect::new(0, 0, 4, 6)),
        };
        let loader = Loader::default().with_initial(params);
        let Loaded::Still(b) = loader.load(&mem("a.png", encoded(5, 3, ImageFormat::Png))).unwrap()
        else {
            panic!("expected a still");
        };
        // 5×3 → 3×5 → 6×10 → crop 4×6
        assert_eq!(b.dimensions(), (4, 6));
    }

    #[test]
    fn failing_initial_crop_keeps_the_scaled_bitmap() {
        let params = InitialParams {
            degrees: 0.0,
            scale_x: 2.0,
            scale_y: 2.0,
            crop: Some(CropRect::new(50, 50, 10, 10)),
        };
        let src = Bitmap::from_rgba8(3, 2, ip_core::AlphaType::Opaque, vec![9; 24]).unwrap();
        assert_eq!(apply_initial(src, &params).dimensions(), (6, 4));
    }
}
