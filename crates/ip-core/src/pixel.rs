use serde::{Deserialize, Serialize};

/// Unpremultiplied color, bytes in `[r, g, b, a]` order.
pub type Rgba = [u8; 4];

/// In-memory pixel encoding of a [`crate::Bitmap`].
///
/// Byte layouts (little-endian where packed):
/// - `Rgba8888` : `[r, g, b, a]`
/// - `Rgb565`   : `u16`, red in bits 11..16, green 5..11, blue 0..5
/// - `Argb4444` : `u16`, nibbles r, g, b, a from high to low
/// - `Alpha8`   : one alpha byte
/// - `Index8`   : one palette index
/// - `RgbaF16`  : four IEEE half floats `[r, g, b, a]`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum PixelFormat {
    /// No pixel layout. Transform outputs promote it to `Rgba8888`.
    #[default]
    Unknown,
    /// Alpha-only coverage.
    Alpha8,
    /// 16-bit opaque color.
    Rgb565,
    /// 16-bit color with 4-bit alpha.
    Argb4444,
    /// 32-bit color, the native working format.
    Rgba8888,
    /// 8-bit palette index.
    Index8,
    /// 64-bit half-float color.
    RgbaF16,
}

impl PixelFormat {
    /// Taille d'un pixel en octets (0 pour `Unknown`).
    ///
    /// # Example
    /// ```
    /// use ip_core::PixelFormat;
    /// assert_eq!(PixelFormat::Rgb565.bytes_per_pixel(), 2);
    /// assert_eq!(PixelFormat::RgbaF16.bytes_per_pixel(), 8);
    /// ```
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::Alpha8 | Self::Index8 => 1,
            Self::Rgb565 | Self::Argb4444 => 2,
            Self::Rgba8888 => 4,
            Self::RgbaF16 => 8,
        }
    }

    /// Format of a bitmap produced by a scale or rotate of `self`.
    ///
    /// `Unknown` and `Alpha8` have no usable color channels and are promoted
    /// to the native 32-bit format; every other format is kept.
    ///
    /// # Example
    /// ```
    /// use ip_core::PixelFormat;
    /// assert_eq!(PixelFormat::Alpha8.promoted(), PixelFormat::Rgba8888);
    /// assert_eq!(PixelFormat::Rgb565.promoted(), PixelFormat::Rgb565);
    /// ```
    #[must_use]
    pub const fn promoted(self) -> Self {
        match self {
            Self::Unknown | Self::Alpha8 => Self::Rgba8888,
            other => other,
        }
    }

    /// True for formats that cannot carry transparency.
    #[must_use]
    pub const fn is_always_opaque(self) -> bool {
        matches!(self, Self::Rgb565)
    }
}

/// How the alpha channel relates to the color channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum AlphaType {
    /// Alpha is ignored; every pixel is fully opaque.
    Opaque,
    /// Color channels are premultiplied by alpha.
    #[default]
    Premul,
    /// Color channels are independent of alpha.
    Unpremul,
}

/// Decodes one row of source pixels into unpremultiplied RGBA.
///
/// `src` holds exactly `dst.len()` pixels. `palette` is only read by `Index8`.
pub type ToColorProc = fn(src: &[u8], dst: &mut [Rgba], palette: &[Rgba]);

/// Encodes one row of unpremultiplied RGBA into the target format.
///
/// `y` is the row index, used by the ordered dither of the 16-bit formats.
pub type FromColorProc = fn(src: &[Rgba], dst: &mut [u8], y: u32, palette: &[Rgba]);

/// Table de conversion vers RGBA non prémultiplié, par couple (format, alpha).
///
/// Retourne `None` pour `Unknown`, qui n'a pas de disposition de pixels.
///
/// # Example
/// ```
/// use ip_core::pixel::{to_color_proc, AlphaType, PixelFormat};
/// let proc = to_color_proc(PixelFormat::Rgba8888, AlphaType::Premul).unwrap();
/// let mut out = [[0u8; 4]; 1];
/// proc(&[64, 32, 0, 128], &mut out, &[]);
/// assert_eq!(out[0], [128, 64, 0, 128]);
/// ```
#[must_use]
pub fn to_color_proc(format: PixelFormat, alpha: AlphaType) -> Option<ToColorProc> {
    let proc: ToColorProc = match (format, alpha) {
        (PixelFormat::Unknown, _) => return None,
        (PixelFormat::Rgba8888, AlphaType::Opaque) => rgba8888_opaque,
        (PixelFormat::Rgba8888, AlphaType::Premul) => rgba8888_premul,
        (PixelFormat::Rgba8888, AlphaType::Unpremul) => rgba8888_raw,
        (PixelFormat::Argb4444, AlphaType::Opaque) => argb4444_opaque,
        (PixelFormat::Argb4444, AlphaType::Premul) => argb4444_premul,
        (PixelFormat::Argb4444, AlphaType::Unpremul) => argb4444_raw,
        (PixelFormat::Rgb565, _) => rgb565,
        (PixelFormat::Alpha8, _) => alpha8,
        (PixelFormat::Index8, AlphaType::Opaque) => index8_opaque,
        (PixelFormat::Index8, _) => index8,
        (PixelFormat::RgbaF16, AlphaType::Premul) => f16_premul,
        (PixelFormat::RgbaF16, _) => f16_raw,
    };
    Some(proc)
}

/// Table inverse : encode du RGBA non prémultiplié vers (format, alpha).
///
/// Les formats 16 bits sont tramés (Bayer 4×4).
#[must_use]
pub fn from_color_proc(format: PixelFormat, alpha: AlphaType) -> Option<FromColorProc> {
    let proc: FromColorProc = match (format, alpha) {
        (PixelFormat::Unknown, _) => return None,
        (PixelFormat::Rgba8888, AlphaType::Opaque) => encode_rgba8888_opaque,
        (PixelFormat::Rgba8888, AlphaType::Premul) => encode_rgba8888_premul,
        (PixelFormat::Rgba8888, AlphaType::Unpremul) => encode_rgba8888_raw,
        (PixelFormat::Argb4444, AlphaType::Premul) => encode_argb4444_premul,
        (PixelFormat::Argb4444, _) => encode_argb4444_raw,
        (PixelFormat::Rgb565, _) => encode_rgb565,
        (PixelFormat::Alpha8, _) => encode_alpha8,
        (PixelFormat::Index8, _) => encode_index8,
        (PixelFormat::RgbaF16, AlphaType::Premul) => encode_f16_premul,
        (PixelFormat::RgbaF16, _) => encode_f16_raw,
    };
    Some(proc)
}

// --- Premultiplication ---

/// `c × a / 255`, rounded.
#[inline(always)]
#[must_use]
pub fn premultiply(c: u8, a: u8) -> u8 {
    ((u32::from(c) * u32::from(a) + 127) / 255) as u8
}

/// Inverse of [`premultiply`]; a zero alpha yields zero.
#[inline(always)]
#[must_use]
pub fn unpremultiply(c: u8, a: u8) -> u8 {
    if a == 0 {
        return 0;
    }
    ((u32::from(c) * 255 + u32::from(a) / 2) / u32::from(a)).min(255) as u8
}

// --- Decoders ---

fn rgba8888_opaque(src: &[u8], dst: &mut [Rgba], _palette: &[Rgba]) {
    for (d, s) in dst.iter_mut().zip(src.chunks_exact(4)) {
        *d = [s[0], s[1], s[2], 255];
    }
}

fn rgba8888_premul(src: &[u8], dst: &mut [Rgba], _palette: &[Rgba]) {
    for (d, s) in dst.iter_mut().zip(src.chunks_exact(4)) {
        let a = s[3];
        *d = [
            unpremultiply(s[0], a),
            unpremultiply(s[1], a),
            unpremultiply(s[2], a),
            a,
        ];
    }
}

fn rgba8888_raw(src: &[u8], dst: &mut [Rgba], _palette: &[Rgba]) {
    for (d, s) in dst.iter_mut().zip(src.chunks_exact(4)) {
        *d = [s[0], s[1], s[2], s[3]];
    }
}

#[inline(always)]
fn unpack_4444(s: &[u8]) -> Rgba {
    let v = u16::from_le_bytes([s[0], s[1]]);
    let n = |shift: u16| (((v >> shift) & 0xF) as u8) * 17;
    [n(12), n(8), n(4), n(0)]
}

fn argb4444_opaque(src: &[u8], dst: &mut [Rgba], _palette: &[Rgba]) {
    for (d, s) in dst.iter_mut().zip(src.chunks_exact(2)) {
        let [r, g, b, _] = unpack_4444(s);
        *d = [r, g, b, 255];
    }
}

fn argb4444_premul(src: &[u8], dst: &mut [Rgba], _palette: &[Rgba]) {
    for (d, s) in dst.iter_mut().zip(src.chunks_exact(2)) {
        let [r, g, b, a] = unpack_4444(s);
        *d = [
            unpremultiply(r, a),
            unpremultiply(g, a),
            unpremultiply(b, a),
            a,
        ];
    }
}

fn argb4444_raw(src: &[u8], dst: &mut [Rgba], _palette: &[Rgba]) {
    for (d, s) in dst.iter_mut().zip(src.chunks_exact(2)) {
        *d = unpack_4444(s);
    }
}

fn rgb565(src: &[u8], dst: &mut [Rgba], _palette: &[Rgba]) {
    for (d, s) in dst.iter_mut().zip(src.chunks_exact(2)) {
        let v = u16::from_le_bytes([s[0], s[1]]);
        let r = ((v >> 11) & 0x1F) as u8;
        let g = ((v >> 5) & 0x3F) as u8;
        let b = (v & 0x1F) as u8;
        *d = [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 255];
    }
}

fn alpha8(src: &[u8], dst: &mut [Rgba], _palette: &[Rgba]) {
    for (d, &a) in dst.iter_mut().zip(src) {
        *d = [0, 0, 0, a];
    }
}

fn index8(src: &[u8], dst: &mut [Rgba], palette: &[Rgba]) {
    for (d, &i) in dst.iter_mut().zip(src) {
        *d = palette.get(usize::from(i)).copied().unwrap_or([0, 0, 0, 0]);
    }
}

fn index8_opaque(src: &[u8], dst: &mut [Rgba], palette: &[Rgba]) {
    for (d, &i) in dst.iter_mut().zip(src) {
        let [r, g, b, _] = palette.get(usize::from(i)).copied().unwrap_or([0, 0, 0, 0]);
        *d = [r, g, b, 255];
    }
}

#[inline(always)]
fn unpack_f16(s: &[u8]) -> [f32; 4] {
    let h = |i: usize| half_to_f32(u16::from_le_bytes([s[i], s[i + 1]]));
    [h(0), h(2), h(4), h(6)]
}

#[inline(always)]
fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn f16_premul(src: &[u8], dst: &mut [Rgba], _palette: &[Rgba]) {
    for (d, s) in dst.iter_mut().zip(src.chunks_exact(8)) {
        let [r, g, b, a] = unpack_f16(s);
        *d = if a <= 0.0 {
            [0, 0, 0, 0]
        } else {
            [unit_to_u8(r / a), unit_to_u8(g / a), unit_to_u8(b / a), unit_to_u8(a)]
        };
    }
}

fn f16_raw(src: &[u8], dst: &mut [Rgba], _palette: &[Rgba]) {
    for (d, s) in dst.iter_mut().zip(src.chunks_exact(8)) {
        let [r, g, b, a] = unpack_f16(s);
        *d = [unit_to_u8(r), unit_to_u8(g), unit_to_u8(b), unit_to_u8(a)];
    }
}

// --- Encoders ---

/// Matrice de Bayer 4×4 (seuils 0..16).
const BAYER_4X4: [[u32; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Quantifie `v` sur `bits` bits avec tramage ordonné.
#[inline(always)]
fn dither(v: u8, bits: u32, x: usize, y: u32) -> u16 {
    let levels = (1u32 << bits) - 1;
    let threshold = BAYER_4X4[(y & 3) as usize][x & 3];
    let q = (u32::from(v) * levels * 16 + threshold * 255) / (255 * 16);
    q.min(levels) as u16
}

fn encode_rgba8888_opaque(src: &[Rgba], dst: &mut [u8], _y: u32, _palette: &[Rgba]) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src) {
        d.copy_from_slice(&[s[0], s[1], s[2], 255]);
    }
}

fn encode_rgba8888_premul(src: &[Rgba], dst: &mut [u8], _y: u32, _palette: &[Rgba]) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src) {
        let a = s[3];
        d.copy_from_slice(&[
            premultiply(s[0], a),
            premultiply(s[1], a),
            premultiply(s[2], a),
            a,
        ]);
    }
}

fn encode_rgba8888_raw(src: &[Rgba], dst: &mut [u8], _y: u32, _palette: &[Rgba]) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src) {
        d.copy_from_slice(s);
    }
}

#[inline(always)]
fn pack_4444(c: Rgba, x: usize, y: u32) -> [u8; 2] {
    let v = (dither(c[0], 4, x, y) << 12)
        | (dither(c[1], 4, x, y) << 8)
        | (dither(c[2], 4, x, y) << 4)
        | dither(c[3], 4, x, y);
    v.to_le_bytes()
}

fn encode_argb4444_premul(src: &[Rgba], dst: &mut [u8], y: u32, _palette: &[Rgba]) {
    for (x, (d, s)) in dst.chunks_exact_mut(2).zip(src).enumerate() {
        let a = s[3];
        let c = [premultiply(s[0], a), premultiply(s[1], a), premultiply(s[2], a), a];
        d.copy_from_slice(&pack_4444(c, x, y));
    }
}

fn encode_argb4444_raw(src: &[Rgba], dst: &mut [u8], y: u32, _palette: &[Rgba]) {
    for (x, (d, s)) in dst.chunks_exact_mut(2).zip(src).enumerate() {
        d.copy_from_slice(&pack_4444(*s, x, y));
    }
}

fn encode_rgb565(src: &[Rgba], dst: &mut [u8], y: u32, _palette: &[Rgba]) {
    for (x, (d, s)) in dst.chunks_exact_mut(2).zip(src).enumerate() {
        let v = (dither(s[0], 5, x, y) << 11) | (dither(s[1], 6, x, y) << 5) | dither(s[2], 5, x, y);
        d.copy_from_slice(&v.to_le_bytes());
    }
}

fn encode_alpha8(src: &[Rgba], dst: &mut [u8], _y: u32, _palette: &[Rgba]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = s[3];
    }
}

fn encode_index8(src: &[Rgba], dst: &mut [u8], _y: u32, palette: &[Rgba]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = nearest_palette_index(palette, *s);
    }
}

/// Index of the palette entry closest to `c` (squared RGBA distance).
#[must_use]
pub fn nearest_palette_index(palette: &[Rgba], c: Rgba) -> u8 {
    let dist = |p: &Rgba| -> u32 {
        p.iter()
            .zip(c.iter())
            .map(|(&a, &b)| {
                let d = i32::from(a) - i32::from(b);
                (d * d) as u32
            })
            .sum()
    };
    palette
        .iter()
        .take(256)
        .enumerate()
        .min_by_key(|(_, p)| dist(p))
        .map_or(0, |(i, _)| i as u8)
}

fn encode_f16_premul(src: &[Rgba], dst: &mut [u8], _y: u32, _palette: &[Rgba]) {
    for (d, s) in dst.chunks_exact_mut(8).zip(src) {
        let a = f32::from(s[3]) / 255.0;
        let ch = [
            f32::from(s[0]) / 255.0 * a,
            f32::from(s[1]) / 255.0 * a,
            f32::from(s[2]) / 255.0 * a,
            a,
        ];
        for (i, v) in ch.into_iter().enumerate() {
            d[i * 2..i * 2 + 2].copy_from_slice(&f32_to_half(v).to_le_bytes());
        }
    }
}

fn encode_f16_raw(src: &[Rgba], dst: &mut [u8], _y: u32, _palette: &[Rgba]) {
    for (d, s) in dst.chunks_exact_mut(8).zip(src) {
        for (i, &c) in s.iter().enumerate() {
            let v = f32::from(c) / 255.0;
            d[i * 2..i * 2 + 2].copy_from_slice(&f32_to_half(v).to_le_bytes());
        }
    }
}

// --- Half floats ---

/// IEEE 754 binary16 → f32.
#[must_use]
pub fn half_to_f32(h: u16) -> f32 {
    let sign = u32::from(h >> 15) << 31;
    let exp = u32::from((h >> 10) & 0x1F);
    let mant = u32::from(h & 0x3FF);
    let bits = match exp {
        0 if mant == 0 => sign,
        0 => {
            // Sous-normal : mant × 2⁻²⁴
            let v = mant as f32 / 16_777_216.0;
            return if sign == 0 { v } else { -v };
        }
        0x1F => sign | 0x7F80_0000 | (mant << 13),
        _ => sign | ((exp + 112) << 23) | (mant << 13),
    };
    f32::from_bits(bits)
}

/// f32 → IEEE 754 binary16, round-to-nearest.
#[must_use]
pub fn f32_to_half(v: f32) -> u16 {
    let bits = v.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xFF) as i32;
    let mant = bits & 0x7F_FFFF;

    if exp == 0xFF {
        return sign | 0x7C00 | if mant == 0 { 0 } else { 0x200 };
    }
    let e = exp - 127 + 15;
    if e >= 0x1F {
        return sign | 0x7C00;
    }
    if e <= 0 {
        if e < -10 {
            return sign;
        }
        let m = mant | 0x80_0000;
        let shift = (14 - e) as u32;
        let half = m >> shift;
        let round = (m >> (shift - 1)) & 1;
        return sign | (half + round) as u16;
    }
    let half = sign | ((e as u16) << 10) | (mant >> 13) as u16;
    if mant & 0x1000 == 0 { half } else { half + 1 }
}
