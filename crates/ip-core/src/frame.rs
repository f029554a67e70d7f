use serde::{Deserialize, Serialize};

/// Pixel layout of a frame handed to the display device.
///
/// Discriminants are the codes written in the frame header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerFormat {
    /// 3 bytes per pixel, `[r, g, b]`.
    Rgb = 0,
    /// 4 bytes per pixel, `[r, g, b, a]`.
    #[default]
    Rgba = 1,
    /// Accepted but never rendered.
    Argb = 2,
    /// Packed 4:2:2 luma/chroma, `[y0, u, y1, v]`.
    Yuyv = 3,
}

impl LayerFormat {
    /// Octets par pixel dans le tampon de destination.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgba | Self::Argb => 4,
            Self::Yuyv => 2,
        }
    }

    /// Code numérique du format.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }
}

/// Frame descriptor handed to a [`crate::traits::FrameSink`].
///
/// `data` is tightly packed in `format`, row stride given by `stride`.
#[derive(Clone, Copy, Debug)]
pub struct FrameInfo<'a> {
    /// Converted pixel bytes.
    pub data: &'a [u8],
    /// Layout of `data`.
    pub format: LayerFormat,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per row of `data`.
    pub stride: usize,
    /// Rotation hint for the display, always 0 here.
    pub rotate: u32,
}

/// Largeur maximale de la surface d'affichage.
pub const SURFACE_MAX_WIDTH: u32 = 3840;
/// Hauteur maximale de la surface d'affichage.
pub const SURFACE_MAX_HEIGHT: u32 = 2160;

/// Dimensions of the display surface.
///
/// # Example
/// ```
/// use ip_core::SurfaceTarget;
/// let s = SurfaceTarget::new(8000, 100);
/// assert_eq!((s.width, s.height), (3840, 100));
/// assert!(s.fits(3840, 100));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SurfaceTarget {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SurfaceTarget {
    /// Surface clamped to `[1, 3840] × [1, 2160]`.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.clamp(1, SURFACE_MAX_WIDTH),
            height: height.clamp(1, SURFACE_MAX_HEIGHT),
        }
    }

    /// True when a `w × h` image needs no cropping or downscaling.
    #[must_use]
    pub fn fits(&self, w: u32, h: u32) -> bool {
        w <= self.width && h <= self.height
    }
}

impl Default for SurfaceTarget {
    fn default() -> Self {
        Self::new(SURFACE_MAX_WIDTH, SURFACE_MAX_HEIGHT)
    }
}

/// Integer rectangle in bitmap pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CropRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl CropRect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the rectangle has a positive area and lies inside `w × h`.
    ///
    /// # Example
    /// ```
    /// use ip_core::frame::CropRect;
    /// assert!(CropRect::new(0, 0, 10, 10).is_inside(10, 10));
    /// assert!(!CropRect::new(5, 0, 10, 10).is_inside(10, 10));
    /// ```
    #[must_use]
    pub fn is_inside(&self, w: u32, h: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width > 0
            && self.height > 0
            && i64::from(self.x) + i64::from(self.width) <= i64::from(w)
            && i64::from(self.y) + i64::from(self.height) <= i64::from(h)
    }
}
