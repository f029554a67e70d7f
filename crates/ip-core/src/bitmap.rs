use crate::error::CoreError;
use crate::pixel::{AlphaType, PixelFormat, Rgba, from_color_proc, to_color_proc};

/// Allocate a zeroed pixel buffer, reporting failure instead of aborting.
///
/// # Errors
/// `CoreError::OutOfMemory` when the allocator refuses the request.
pub fn alloc_zeroed(len: usize) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| CoreError::OutOfMemory { bytes: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Image raster owned by exactly one holder.
///
/// Invariants: `width > 0`, `height > 0`, `stride >= width × bpp`,
/// `data.len() >= stride × height`. Copies are explicit (`clone`).
///
/// # Example
/// ```
/// use ip_core::{AlphaType, Bitmap, PixelFormat};
/// let bmp = Bitmap::new(4, 2, PixelFormat::Rgba8888, AlphaType::Premul).unwrap();
/// assert_eq!(bmp.stride(), 16);
/// assert_eq!(bmp.data().len(), 32);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    format: PixelFormat,
    alpha: AlphaType,
    stride: usize,
    data: Vec<u8>,
    palette: Vec<Rgba>,
}

impl Bitmap {
    /// Bitmap zéro (transparent) au stride minimal.
    ///
    /// # Errors
    /// Dimensions nulles, format `Unknown`, ou allocation refusée.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        alpha: AlphaType,
    ) -> Result<Self, CoreError> {
        let stride = min_stride(width, format)?;
        Self::with_stride(width, height, format, alpha, stride)
    }

    /// Bitmap zéro avec un stride explicite.
    ///
    /// # Errors
    /// See [`Bitmap::new`]; also `StrideTooSmall`.
    pub fn with_stride(
        width: u32,
        height: u32,
        format: PixelFormat,
        alpha: AlphaType,
        stride: usize,
    ) -> Result<Self, CoreError> {
        let len = checked_len(width, height, format, stride)?;
        let data = alloc_zeroed(len)?;
        Ok(Self {
            width,
            height,
            format,
            alpha,
            stride,
            data,
            palette: Vec::new(),
        })
    }

    /// Wrap an existing pixel buffer after validating its geometry.
    ///
    /// # Errors
    /// `InvalidDimensions`, `StrideTooSmall` or `BufferTooSmall`.
    pub fn from_raw(
        width: u32,
        height: u32,
        format: PixelFormat,
        alpha: AlphaType,
        stride: usize,
        data: Vec<u8>,
    ) -> Result<Self, CoreError> {
        let required = checked_len(width, height, format, stride)?;
        if data.len() < required {
            return Err(CoreError::BufferTooSmall {
                len: data.len(),
                required,
            });
        }
        Ok(Self {
            width,
            height,
            format,
            alpha,
            stride,
            data,
            palette: Vec::new(),
        })
    }

    /// Tight RGBA8888 buffer, as produced by the decoders.
    ///
    /// # Errors
    /// See [`Bitmap::from_raw`].
    pub fn from_rgba8(
        width: u32,
        height: u32,
        alpha: AlphaType,
        data: Vec<u8>,
    ) -> Result<Self, CoreError> {
        Self::from_raw(width, height, PixelFormat::Rgba8888, alpha, width as usize * 4, data)
    }

    /// Attach a color table (read by `Index8`).
    #[must_use]
    pub fn with_palette(mut self, palette: Vec<Rgba>) -> Self {
        self.palette = palette;
        self
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[must_use]
    pub fn alpha_type(&self) -> AlphaType {
        self.alpha
    }

    /// Bytes between the starts of consecutive rows.
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the bitmap and return its pixel buffer.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    #[must_use]
    pub fn palette(&self) -> &[Rgba] {
        &self.palette
    }

    /// Total pixel payload in bytes (`stride × height`).
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.stride * self.height as usize
    }

    /// Pixels of row `y`, without the stride padding.
    #[must_use]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.row_bytes()]
    }

    /// Mutable pixels of row `y`, without the stride padding.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.row_bytes();
        &mut self.data[start..start + len]
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Décode la ligne `y` en RGBA non prémultiplié.
    ///
    /// `out` doit contenir `width` pixels. Un format sans table de conversion
    /// produit des pixels transparents.
    pub fn read_row_rgba(&self, y: u32, out: &mut [Rgba]) {
        match to_color_proc(self.format, self.alpha) {
            Some(proc) => proc(self.row(y), out, &self.palette),
            None => out.fill([0, 0, 0, 0]),
        }
    }

    /// Pixel `(x, y)` in unpremultiplied RGBA.
    ///
    /// # Example
    /// ```
    /// use ip_core::{AlphaType, Bitmap};
    /// let bmp = Bitmap::from_rgba8(1, 1, AlphaType::Unpremul, vec![9, 8, 7, 6]).unwrap();
    /// assert_eq!(bmp.pixel_rgba(0, 0), [9, 8, 7, 6]);
    /// ```
    #[must_use]
    pub fn pixel_rgba(&self, x: u32, y: u32) -> Rgba {
        let bpp = self.format.bytes_per_pixel();
        let Some(proc) = to_color_proc(self.format, self.alpha) else {
            return [0, 0, 0, 0];
        };
        let start = y as usize * self.stride + x as usize * bpp;
        let mut out = [[0u8; 4]; 1];
        proc(&self.data[start..start + bpp], &mut out, &self.palette);
        out[0]
    }

    /// Copie convertie en RGBA8888 non prémultiplié, stride minimal.
    ///
    /// This is the working representation of every resampling pass.
    ///
    /// # Errors
    /// Allocation failure.
    pub fn to_rgba8888(&self) -> Result<Self, CoreError> {
        let mut out = Self::new(
            self.width,
            self.height,
            PixelFormat::Rgba8888,
            AlphaType::Unpremul,
        )?;
        let mut row = vec![[0u8; 4]; self.width as usize];
        for y in 0..self.height {
            self.read_row_rgba(y, &mut row);
            for (d, s) in out.row_mut(y).chunks_exact_mut(4).zip(&row) {
                d.copy_from_slice(s);
            }
        }
        Ok(out)
    }

    /// Encode an unpremultiplied RGBA8888 bitmap into `format`/`alpha`.
    ///
    /// `palette` is attached to the result and used for `Index8`.
    ///
    /// # Errors
    /// `UnsupportedFormat` for `Unknown`, or allocation failure.
    pub fn encode_from_rgba(
        src: &Self,
        format: PixelFormat,
        alpha: AlphaType,
        palette: &[Rgba],
    ) -> Result<Self, CoreError> {
        let proc = from_color_proc(format, alpha).ok_or_else(|| CoreError::UnsupportedFormat {
            format: format!("{format:?}"),
        })?;
        let mut out = Self::new(src.width, src.height, format, alpha)?.with_palette(palette.to_vec());
        let mut row = vec![[0u8; 4]; src.width as usize];
        for y in 0..src.height {
            src.read_row_rgba(y, &mut row);
            proc(&row, out.row_mut(y), y, palette);
        }
        Ok(out)
    }

    /// Copy of the sub-rectangle `(x, y, w, h)`, same format and alpha type.
    ///
    /// # Errors
    /// `SubsetOutOfBounds` unless the rectangle lies fully inside the bitmap
    /// and has a positive area.
    pub fn extract_subset(&self, x: i32, y: i32, w: i32, h: i32) -> Result<Self, CoreError> {
        let inside = x >= 0
            && y >= 0
            && w > 0
            && h > 0
            && i64::from(x) + i64::from(w) <= i64::from(self.width)
            && i64::from(y) + i64::from(h) <= i64::from(self.height);
        if !inside {
            return Err(CoreError::SubsetOutOfBounds {
                x,
                y,
                width: w,
                height: h,
            });
        }
        let bpp = self.format.bytes_per_pixel();
        let mut out = Self::new(w as u32, h as u32, self.format, self.alpha)?
            .with_palette(self.palette.clone());
        let x0 = x as usize * bpp;
        let len = w as usize * bpp;
        for row in 0..h as u32 {
            let src_start = (y as u32 + row) as usize * self.stride + x0;
            out.row_mut(row)
                .copy_from_slice(&self.data[src_start..src_start + len]);
        }
        Ok(out)
    }
}

fn min_stride(width: u32, format: PixelFormat) -> Result<usize, CoreError> {
    if format == PixelFormat::Unknown {
        return Err(CoreError::UnsupportedFormat {
            format: "Unknown".into(),
        });
    }
    (width as usize)
        .checked_mul(format.bytes_per_pixel())
        .ok_or(CoreError::OutOfMemory { bytes: usize::MAX })
}

fn checked_len(
    width: u32,
    height: u32,
    format: PixelFormat,
    stride: usize,
) -> Result<usize, CoreError> {
    if width == 0 || height == 0 {
        return Err(CoreError::InvalidDimensions { width, height });
    }
    let min = min_stride(width, format)?;
    if stride < min {
        return Err(CoreError::StrideTooSmall { stride, min });
    }
    stride
        .checked_mul(height as usize)
        .ok_or(CoreError::OutOfMemory { bytes: usize::MAX })
}
